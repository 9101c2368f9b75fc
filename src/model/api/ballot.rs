use serde::{Deserialize, Serialize};

use crate::model::{api::id::ApiId, mongodb::Id};

/// A submitted ballot: the candidates the voter selected.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BallotSpec {
    pub candidates: Vec<ApiId>,
}

impl BallotSpec {
    pub fn selections(&self) -> Vec<Id> {
        self.candidates.iter().map(|id| **id).collect()
    }
}
