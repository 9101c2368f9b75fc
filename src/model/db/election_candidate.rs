use serde::{Deserialize, Serialize};

use crate::model::{common::election::ElectionId, mongodb::Id};

/// Records that a candidate stands in an election.
/// Unique per (election, candidate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionCandidateCore {
    pub election_id: ElectionId,
    pub candidate_id: Id,
}

/// A link without an ID.
pub type NewElectionCandidate = ElectionCandidateCore;

/// A link from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionCandidate {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub link: ElectionCandidateCore,
}
