use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    db::candidate::{Candidate, NewCandidate},
};

/// A request to create a candidate.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CandidateSpec {
    pub name: String,
    pub surname: String,
    #[serde(default)]
    pub description: String,
}

impl From<CandidateSpec> for NewCandidate {
    fn from(spec: CandidateSpec) -> Self {
        Self {
            name: spec.name,
            surname: spec.surname,
            description: spec.description,
        }
    }
}

/// API-friendly candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDescription {
    pub id: ApiId,
    pub name: String,
    pub surname: String,
    pub description: String,
}

impl From<Candidate> for CandidateDescription {
    fn from(candidate: Candidate) -> Self {
        Self {
            id: candidate.id.into(),
            name: candidate.candidate.name,
            surname: candidate.candidate.surname,
            description: candidate.candidate.description,
        }
    }
}
