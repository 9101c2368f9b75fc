use std::collections::HashMap;

use log::{info, warn};
use mongodb::bson::doc;
use rocket::{futures::TryStreamExt, Route};

use crate::{
    error::{Error, Result},
    logging::RequestId,
    model::{
        api::{
            auth::AuthToken,
            report::{ElectionReport, ReportFormat, ReportResponse},
        },
        common::{
            election::{today, ElectionId},
            tally::tally_votes,
        },
        db::{
            admin::Admin, candidate::Candidate, election::Election,
            election_candidate::ElectionCandidate, vote::Vote, voted_user::VotedUser,
            voter::Voter,
        },
        mongodb::{id_array, Coll},
    },
};

use super::common::{election_by_id, standing_candidates, voter_by_token};

pub fn routes() -> Vec<Route> {
    routes![report_admin, report_voter, report_unauthorized]
}

/// The collections a report draws on.
struct ReportSources {
    links: Coll<ElectionCandidate>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
    voters: Coll<Voter>,
    voted_users: Coll<VotedUser>,
}

#[get("/elections/<election_id>/report?<format>", rank = 1)]
#[allow(clippy::too_many_arguments)]
async fn report_admin(
    req_id: &RequestId,
    _token: AuthToken<Admin>,
    election_id: ElectionId,
    format: Option<ReportFormat>,
    elections: Coll<Election>,
    links: Coll<ElectionCandidate>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
    voters: Coll<Voter>,
    voted_users: Coll<VotedUser>,
) -> Result<ReportResponse> {
    let election = election_by_id(election_id, &elections).await?;
    let sources = ReportSources {
        links,
        candidates,
        votes,
        voters,
        voted_users,
    };
    let report = build_report(election, &sources).await?;
    info!("{req_id} report for election {election_id} generated for an admin");
    report.into_response(format.unwrap_or_default())
}

/// Voters may only see reports for ended elections they were eligible for.
/// Anything else is reported as not found, so as not to reveal it exists.
#[get("/elections/<election_id>/report?<format>", rank = 2)]
#[allow(clippy::too_many_arguments)]
async fn report_voter(
    req_id: &RequestId,
    token: AuthToken<Voter>,
    election_id: ElectionId,
    format: Option<ReportFormat>,
    elections: Coll<Election>,
    links: Coll<ElectionCandidate>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
    voters: Coll<Voter>,
    voted_users: Coll<VotedUser>,
) -> Result<ReportResponse> {
    let voter = voter_by_token(&token, &voters).await?;
    let election = election_by_id(election_id, &elections).await?;
    if !(election.has_ended(today()) && election.permits_any(&voter.groups)) {
        warn!(
            "{req_id} voter {} requested a report for election {election_id} they cannot see",
            voter.id
        );
        return Err(Error::not_found(format!("Ended election with ID '{election_id}'")));
    }

    let sources = ReportSources {
        links,
        candidates,
        votes,
        voters,
        voted_users,
    };
    let report = build_report(election, &sources).await?;
    info!("{req_id} report for election {election_id} accessed by voter: {}", voter.email);
    report.into_response(format.unwrap_or_default())
}

#[get("/elections/<_election_id>/report", rank = 3)]
fn report_unauthorized(req_id: &RequestId, _election_id: &str) -> Error {
    warn!("{req_id} unauthorized report request");
    Error::forbidden(super::common::NOT_AUTHORIZED)
}

/// Tally the votes and measure turnout for an election.
async fn build_report(election: Election, sources: &ReportSources) -> Result<ElectionReport> {
    let standing = standing_candidates(election.id, &sources.links, &sources.candidates).await?;
    let names: HashMap<_, _> = standing
        .iter()
        .map(|candidate| (candidate.id, candidate.full_name()))
        .collect();

    let cast: Vec<_> = sources
        .votes
        .find(doc! { "election_id": election.id }, None)
        .await?
        .map_ok(|vote| vote.vote.candidate_id)
        .try_collect()
        .await?;
    let candidate_votes = tally_votes(cast, &names);

    let eligible = doc! {
        "groups": { "$in": id_array(&election.allowed_groups) },
    };
    let eligible_voters_count = sources.voters.count_documents(eligible, None).await?;
    let voted_users_count = sources
        .voted_users
        .count_documents(doc! { "election_id": election.id }, None)
        .await?;

    Ok(ElectionReport::new(
        election.into(),
        candidate_votes,
        eligible_voters_count,
        voted_users_count,
        today(),
    ))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use mongodb::Database;
    use rocket::{
        http::Status,
        local::asynchronous::Client,
        serde::json::serde_json,
    };

    use crate::model::{
        api::report::CSV_REPORT_FILENAME,
        db::{
            candidate::NewCandidate,
            election::ElectionMetadata,
            election_candidate::NewElectionCandidate,
            vote::NewVote,
            voted_user::NewVotedUser,
            voter::NewVoter,
        },
        mongodb::Id,
    };
    use crate::Config;

    use super::*;

    #[backend_test(admin)]
    async fn admin_report(client: Client, db: Database) {
        let group = Id::new();
        let election = insert_past_election(&db, group).await;
        let (a, b) = insert_two_candidates(&db, election.id).await;
        insert_votes(&db, election.id, &[a, a, a, b, b, b, b, b]).await;
        insert_voters(&db, group, 10, election.id, 4).await;

        let response = client
            .get(report_uri(election.id))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let report: ElectionReport =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();

        assert_eq!(report.total_votes, 8);
        assert_eq!(report.candidate_votes["Anna Nowak"], 3);
        assert_eq!(report.candidate_votes["Jan Kowalski"], 5);
        assert_eq!(report.eligible_voters_count, 10);
        assert_eq!(report.voted_users_count, 4);
        assert_eq!(report.voting_percentage, 40.0);
        assert_eq!(report.date, today());
    }

    #[backend_test(admin)]
    async fn csv_report(client: Client, db: Database) {
        let group = Id::new();
        let election = insert_past_election(&db, group).await;
        let (a, _) = insert_two_candidates(&db, election.id).await;
        insert_votes(&db, election.id, &[a]).await;

        let response = client
            .get(format!("{}?format=csv", report_uri(election.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(
            response.headers().get_one("Content-Disposition"),
            Some(format!("attachment; filename=\"{CSV_REPORT_FILENAME}\"").as_str())
        );
        let content_type = response.content_type().unwrap();
        assert_eq!(content_type.top().as_str(), "text");
        assert_eq!(content_type.sub().as_str(), "csv");
        let body = response.into_string().await.unwrap();
        assert!(body.starts_with("section,name,value"));
        assert!(body.contains("candidate_votes,Anna Nowak,1"));
    }

    #[backend_test(admin)]
    async fn admin_report_unknown_election(client: Client) {
        let response = client
            .get(report_uri(42))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(voter)]
    async fn voter_report_visibility(client: Client, db: Database) {
        let group = Id::new();
        Coll::<Voter>::from_db(&db)
            .update_many(doc! {}, doc! { "$set": { "groups": [group] } }, None)
            .await
            .unwrap();

        // Ended and eligible: visible.
        let ended = insert_past_election(&db, group).await;
        let response = client
            .get(report_uri(ended.id))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        // Still running: hidden.
        let running = Election {
            id: 2,
            metadata: ElectionMetadata::current_example(&[group]),
        };
        Coll::<Election>::from_db(&db)
            .insert_one(&running, None)
            .await
            .unwrap();
        let response = client
            .get(report_uri(running.id))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());

        // Ended but for another group: hidden.
        let other = Election {
            id: 3,
            metadata: ElectionMetadata::past_example(&[Id::new()]),
        };
        Coll::<Election>::from_db(&db)
            .insert_one(&other, None)
            .await
            .unwrap();
        let response = client
            .get(report_uri(other.id))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test]
    async fn anonymous_report(client: Client, db: Database) {
        let election = insert_past_election(&db, Id::new()).await;
        let response = client
            .get(report_uri(election.id))
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());
    }

    fn report_uri(election_id: ElectionId) -> String {
        format!("/elections/{election_id}/report")
    }

    async fn insert_past_election(db: &Database, group: Id) -> Election {
        let election = Election {
            id: 1,
            metadata: ElectionMetadata::past_example(&[group]),
        };
        Coll::<Election>::from_db(db)
            .insert_one(&election, None)
            .await
            .unwrap();
        election
    }

    async fn insert_two_candidates(db: &Database, election_id: ElectionId) -> (Id, Id) {
        let mut ids = Vec::new();
        for candidate in [NewCandidate::example1(), NewCandidate::example2()] {
            let id: Id = Coll::<NewCandidate>::from_db(db)
                .insert_one(candidate, None)
                .await
                .unwrap()
                .inserted_id
                .as_object_id()
                .unwrap()
                .into();
            Coll::<NewElectionCandidate>::from_db(db)
                .insert_one(
                    NewElectionCandidate {
                        election_id,
                        candidate_id: id,
                    },
                    None,
                )
                .await
                .unwrap();
            ids.push(id);
        }
        (ids[0], ids[1])
    }

    async fn insert_votes(db: &Database, election_id: ElectionId, candidates: &[Id]) {
        let votes: Vec<_> = candidates
            .iter()
            .map(|candidate_id| NewVote {
                candidate_id: *candidate_id,
                election_id,
                date: Utc::now(),
            })
            .collect();
        Coll::<NewVote>::from_db(db)
            .insert_many(votes, None)
            .await
            .unwrap();
    }

    /// Insert `count` voters in `group`, the first `voted` of whom have voted.
    async fn insert_voters(
        db: &Database,
        group: Id,
        count: usize,
        election_id: ElectionId,
        voted: usize,
    ) {
        let config = Config::example();
        for i in 0..count {
            let mut voter = NewVoter::example_in_groups(&config, &[group]);
            voter.email = format!("voter{i}@example.com");
            let id: Id = Coll::<NewVoter>::from_db(db)
                .insert_one(voter, None)
                .await
                .unwrap()
                .inserted_id
                .as_object_id()
                .unwrap()
                .into();
            if i < voted {
                Coll::<NewVotedUser>::from_db(db)
                    .insert_one(
                        NewVotedUser {
                            voter_id: id,
                            election_id,
                        },
                        None,
                    )
                    .await
                    .unwrap();
            }
        }
    }
}
