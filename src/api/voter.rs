use std::{collections::HashSet, time::Duration};

use chrono::Utc;
use log::{debug, info, warn};
use mongodb::{bson::doc, Client};
use rocket::{futures::TryStreamExt, serde::json::Json, tokio::time::sleep, Route, State};

use crate::{
    error::{Error, Result},
    logging::RequestId,
    model::{
        api::{
            auth::AuthToken,
            ballot::BallotSpec,
            election::{BallotForm, ElectionList},
        },
        common::{
            ballot::{ballot_votes, check_can_vote, validate_selections, BallotError},
            election::{today, ElectionId},
            eligibility::partition_elections,
        },
        db::{
            candidate::Candidate,
            election::Election,
            election_candidate::ElectionCandidate,
            vote::NewVote,
            voted_user::{NewVotedUser, VotedUser},
            voter::Voter,
        },
        mongodb::{
            id_array, is_duplicate_key_error, is_write_conflict_error, u32_id_filter, Coll, Id,
        },
    },
};

use super::common::{
    election_by_id, has_voted, standing_candidates, voter_by_token, ALREADY_VOTED, NOT_AUTHORIZED,
};

pub fn routes() -> Vec<Route> {
    routes![
        elections,
        elections_unauthorized,
        ballot_form,
        ballot_form_not_found,
        ballot_form_unauthorized,
        cast_ballot,
        cast_ballot_not_found,
        cast_ballot_unauthorized,
    ]
}

#[get("/elections", rank = 1)]
async fn elections(
    req_id: &RequestId,
    token: AuthToken<Voter>,
    voters: Coll<Voter>,
    elections: Coll<Election>,
    voted_users: Coll<VotedUser>,
) -> Result<Json<ElectionList>> {
    let voter = voter_by_token(&token, &voters).await?;

    // Only fetch elections the voter could possibly see.
    let permitted = doc! {
        "allowed_groups": { "$in": id_array(&voter.groups) },
    };
    let visible: Vec<Election> = elections.find(permitted, None).await?.try_collect().await?;

    let voted_in: HashSet<ElectionId> = voted_users
        .find(doc! { "voter_id": voter.id }, None)
        .await?
        .map_ok(|voted| voted.voted.election_id)
        .try_collect()
        .await?;

    let partition = partition_elections(visible, &voter.groups, &voted_in, today());
    info!("{req_id} election list accessed by voter: {}", voter.email);
    Ok(Json(partition.into()))
}

#[get("/elections", rank = 2)]
fn elections_unauthorized(req_id: &RequestId) -> Error {
    unauthorized(req_id)
}

#[get("/elections/<election_id>", rank = 1)]
#[allow(clippy::too_many_arguments)]
async fn ballot_form(
    req_id: &RequestId,
    token: AuthToken<Voter>,
    election_id: ElectionId,
    voters: Coll<Voter>,
    elections: Coll<Election>,
    voted_users: Coll<VotedUser>,
    links: Coll<ElectionCandidate>,
    candidates: Coll<Candidate>,
) -> Result<Json<BallotForm>> {
    let voter = voter_by_token(&token, &voters).await?;
    let election = election_by_id(election_id, &elections).await?;

    if !election.permits_any(&voter.groups) {
        warn!("{req_id} voter {} is not eligible for election {election_id}", voter.id);
        return Err(BallotError::NotEligible.into());
    }
    if has_voted(voter.id, election_id, &voted_users).await? {
        warn!("{req_id} voter {} reopened election {election_id} after voting", voter.id);
        return Err(Error::conflict(ALREADY_VOTED));
    }

    let standing = standing_candidates(election_id, &links, &candidates).await?;
    Ok(Json(BallotForm {
        election: election.into(),
        candidates: standing.into_iter().map(Into::into).collect(),
    }))
}

/// A voter asking for something that is not an election ID.
#[get("/elections/<election_id>", rank = 2)]
fn ballot_form_not_found(_token: AuthToken<Voter>, election_id: &str) -> Error {
    Error::not_found(format!("Election with ID '{election_id}'"))
}

#[get("/elections/<_election_id>", rank = 3)]
fn ballot_form_unauthorized(req_id: &RequestId, _election_id: &str) -> Error {
    unauthorized(req_id)
}

/// Attempts at recording one ballot before a write conflict is reported.
const MAX_BALLOT_ATTEMPTS: u64 = 5;

/// Shown when concurrent changes to the election keep a ballot from being recorded.
const ELECTION_BUSY: &str = "The election is being changed. Please try again.";

/// Record a ballot: one vote per selected candidate plus the marker that the
/// voter has voted, all or nothing.
#[post(
    "/elections/<election_id>/vote",
    data = "<ballot>",
    format = "json",
    rank = 1
)]
#[allow(clippy::too_many_arguments)]
async fn cast_ballot(
    req_id: &RequestId,
    token: AuthToken<Voter>,
    election_id: ElectionId,
    ballot: Json<BallotSpec>,
    voters: Coll<Voter>,
    elections: Coll<Election>,
    voted_users: Coll<VotedUser>,
    links: Coll<ElectionCandidate>,
    new_voted_users: Coll<NewVotedUser>,
    new_votes: Coll<NewVote>,
    db_client: &State<Client>,
) -> Result<()> {
    let voter = voter_by_token(&token, &voters).await?;

    // Early rejection; the unique index is what actually guards.
    if has_voted(voter.id, election_id, &voted_users).await? {
        warn!("{req_id} voter {} tried to vote again in election {election_id}", voter.id);
        return Err(Error::conflict(ALREADY_VOTED));
    }

    let sources = BallotSources {
        elections,
        links,
        new_voted_users,
        new_votes,
    };
    let selections = ballot.selections();
    let mut attempt = 1;
    loop {
        let recorded =
            record_ballot(req_id, db_client, &sources, &voter, election_id, &selections).await;
        match recorded {
            Ok(()) => {
                info!("{req_id} ballot recorded in election {election_id} for voter {}", voter.id);
                return Ok(());
            }
            Err(Error::Db(err)) if is_duplicate_key_error(&err) => {
                warn!("{req_id} voter {} tried to vote again in election {election_id}", voter.id);
                return Err(Error::conflict(ALREADY_VOTED));
            }
            Err(Error::Db(err)) if is_write_conflict_error(&err) => {
                if attempt == MAX_BALLOT_ATTEMPTS {
                    warn!("{req_id} gave up recording ballot in election {election_id} after {attempt} write conflicts");
                    return Err(Error::conflict(ELECTION_BUSY));
                }
                debug!("{req_id} write conflict recording ballot in election {election_id}, attempt {attempt}");
                sleep(Duration::from_millis(20 * attempt)).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Collections a ballot is read from and written to.
struct BallotSources {
    elections: Coll<Election>,
    links: Coll<ElectionCandidate>,
    new_voted_users: Coll<NewVotedUser>,
    new_votes: Coll<NewVote>,
}

/// Check and store one ballot in a single transaction.
///
/// The election document is bumped first, so a ballot and a concurrent
/// modification of the same election cannot both commit. The election and
/// its candidates are then read inside the transaction, and the ballot is
/// checked against exactly what it commits alongside.
async fn record_ballot(
    req_id: &RequestId,
    db_client: &Client,
    sources: &BallotSources,
    voter: &Voter,
    election_id: ElectionId,
    selections: &[Id],
) -> Result<()> {
    // Dropping the session without committing aborts the transaction.
    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    let bump = doc! {
        "$inc": { "ballots_cast": 1 }
    };
    let election = sources
        .elections
        .find_one_and_update_with_session(u32_id_filter(election_id), bump, None, &mut session)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election with ID '{election_id}'")))?;

    check_can_vote(&election, &voter.groups, today()).map_err(|err| {
        warn!("{req_id} ballot refused in election {election_id}: {err}");
        err
    })?;

    let mut standing = HashSet::new();
    let mut cursor = sources
        .links
        .find_with_session(doc! { "election_id": election_id }, None, &mut session)
        .await?;
    while let Some(link) = cursor.next(&mut session).await {
        standing.insert(link?.link.candidate_id);
    }
    validate_selections(selections, election.max_votes, &standing).map_err(|err| {
        warn!("{req_id} ballot refused in election {election_id}: {err}");
        err
    })?;

    let marker = NewVotedUser {
        voter_id: voter.id,
        election_id,
    };
    sources
        .new_voted_users
        .insert_one_with_session(marker, None, &mut session)
        .await?;
    // A blank ballot records no votes, and `insert_many` rejects an empty batch.
    let votes = ballot_votes(election_id, selections, Utc::now());
    if !votes.is_empty() {
        sources
            .new_votes
            .insert_many_with_session(votes, None, &mut session)
            .await?;
    }

    session.commit_transaction().await?;
    Ok(())
}

#[post("/elections/<election_id>/vote", rank = 2)]
fn cast_ballot_not_found(_token: AuthToken<Voter>, election_id: &str) -> Error {
    if election_id.parse::<ElectionId>().is_ok() {
        Error::bad_request("A ballot must be submitted as JSON.")
    } else {
        Error::not_found(format!("Election with ID '{election_id}'"))
    }
}

#[post("/elections/<_election_id>/vote", rank = 3)]
fn cast_ballot_unauthorized(req_id: &RequestId, _election_id: &str) -> Error {
    unauthorized(req_id)
}

fn unauthorized(req_id: &RequestId) -> Error {
    warn!("{req_id} unauthorized access attempt to a voter page");
    Error::forbidden(NOT_AUTHORIZED)
}
