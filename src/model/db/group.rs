use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// An authorization group. Voters belong to groups, and elections are only
/// visible to members of their permitted groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCore {
    pub name: String,
}

/// A group without an ID.
pub type NewGroup = GroupCore;

/// A group from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub group: GroupCore,
}

impl Deref for Group {
    type Target = GroupCore;

    fn deref(&self) -> &Self::Target {
        &self.group
    }
}
