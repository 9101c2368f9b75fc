use serde::{Deserialize, Serialize};

use crate::model::{common::election::ElectionId, mongodb::Id};

/// Marks that a voter has cast their ballot in an election.
///
/// A unique index on (voter, election) makes this the guard against double
/// voting: inserting it is the step that can fail with a conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotedUserCore {
    pub voter_id: Id,
    pub election_id: ElectionId,
}

/// A marker without an ID.
pub type NewVotedUser = VotedUserCore;

/// A marker from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VotedUser {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub voted: VotedUserCore,
}
