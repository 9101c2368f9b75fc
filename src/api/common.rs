use mongodb::bson::doc;
use rocket::futures::TryStreamExt;

use crate::error::{Error, Result};
use crate::model::{
    api::auth::AuthToken,
    common::election::ElectionId,
    db::{
        candidate::Candidate, election::Election, election_candidate::ElectionCandidate,
        voted_user::VotedUser, voter::Voter,
    },
    mongodb::{id_array, u32_id_filter, Coll, Id},
};

/// Shown to anyone without a voter account who reaches a voter page.
pub const NOT_AUTHORIZED: &str = "You are not authorized to access this page.";

/// Shown when a voter tries to open or submit a second ballot.
pub const ALREADY_VOTED: &str = "You have already voted in this election.";

/// Return the voter the token was issued to. A token whose voter has since
/// been deleted no longer grants anything.
pub async fn voter_by_token(token: &AuthToken<Voter>, voters: &Coll<Voter>) -> Result<Voter> {
    voters
        .find_one(token.id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::forbidden(NOT_AUTHORIZED))
}

pub async fn election_by_id(election_id: ElectionId, elections: &Coll<Election>) -> Result<Election> {
    elections
        .find_one(u32_id_filter(election_id), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election with ID '{election_id}'")))
}

/// IDs of the candidates standing in an election.
pub async fn standing_candidate_ids(
    election_id: ElectionId,
    links: &Coll<ElectionCandidate>,
) -> Result<Vec<Id>> {
    let filter = doc! {
        "election_id": election_id,
    };
    let ids = links
        .find(filter, None)
        .await?
        .map_ok(|link| link.link.candidate_id)
        .try_collect()
        .await?;
    Ok(ids)
}

/// The candidates standing in an election, ordered by surname then name.
pub async fn standing_candidates(
    election_id: ElectionId,
    links: &Coll<ElectionCandidate>,
    candidates: &Coll<Candidate>,
) -> Result<Vec<Candidate>> {
    let ids = standing_candidate_ids(election_id, links).await?;
    let filter = doc! {
        "_id": { "$in": id_array(&ids) },
    };
    let mut standing: Vec<Candidate> = candidates.find(filter, None).await?.try_collect().await?;
    standing.sort_by(|a, b| (&a.surname, &a.name).cmp(&(&b.surname, &b.name)));
    Ok(standing)
}

/// Has the voter already cast a ballot in this election?
pub async fn has_voted(
    voter_id: Id,
    election_id: ElectionId,
    voted_users: &Coll<VotedUser>,
) -> Result<bool> {
    let filter = doc! {
        "voter_id": voter_id,
        "election_id": election_id,
    };
    Ok(voted_users.find_one(filter, None).await?.is_some())
}

#[cfg(test)]
mod tests {
    use mongodb::Database;
    use rocket::{http::Status, local::asynchronous::Client};

    use crate::{
        model::{api::voter::VoterRegistration, db::voter::VoterCore},
        Config,
    };

    use super::*;

    #[backend_test]
    async fn deleted_voter_is_not_authorized(db: Database) {
        let voter = Voter {
            id: Id::new(),
            voter: VoterCore::example(&Config::example()),
        };
        let token = AuthToken::new(&voter);

        let err = voter_by_token(&token, &Coll::from_db(&db)).await.unwrap_err();
        assert_eq!(err.status(), Status::Forbidden);
        assert_eq!(err.to_string(), NOT_AUTHORIZED);
    }

    #[backend_test(voter)]
    async fn voter_deleted_after_login(client: Client, db: Database) {
        Coll::<Voter>::from_db(&db)
            .delete_one(doc! { "email": VoterRegistration::example().email }, None)
            .await
            .unwrap();

        let response = client.get("/elections").dispatch().await;
        assert_eq!(Status::Forbidden, response.status());
    }
}
