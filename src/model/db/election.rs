use std::collections::HashSet;
use std::ops::{Deref, DerefMut};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{common::election::ElectionId, mongodb::Id};

/// Election configuration, everything except the ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionMetadata {
    /// The kind of election, shown as its title.
    pub label: String,
    /// The admin who created the election.
    pub creator: Id,
    /// A ballot may select at most this many candidates.
    pub max_votes: u32,
    pub start_date: NaiveDate,
    /// Last day on which ballots are accepted.
    pub end_date: NaiveDate,
    /// Only members of at least one of these groups may see or vote in the election.
    pub allowed_groups: HashSet<Id>,
}

impl ElectionMetadata {
    /// Is at least one of the given groups permitted?
    /// An election without any permitted groups admits nobody.
    pub fn permits_any(&self, groups: &HashSet<Id>) -> bool {
        !self.allowed_groups.is_disjoint(groups)
    }

    /// Has the election ended as of `today`? The end date itself still counts
    /// as part of the election.
    pub fn has_ended(&self, today: NaiveDate) -> bool {
        self.end_date < today
    }

    /// Has the election started as of `today`?
    pub fn has_started(&self, today: NaiveDate) -> bool {
        self.start_date <= today
    }
}

/// An election from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    #[serde(rename = "_id")]
    pub id: ElectionId,
    #[serde(flatten)]
    pub metadata: ElectionMetadata,
}

impl Deref for Election {
    type Target = ElectionMetadata;

    fn deref(&self) -> &Self::Target {
        &self.metadata
    }
}

impl DerefMut for Election {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.metadata
    }
}
