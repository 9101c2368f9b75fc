use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    db::group::{Group, NewGroup},
};

/// A request to create a group.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GroupSpec {
    pub name: String,
}

impl From<GroupSpec> for NewGroup {
    fn from(spec: GroupSpec) -> Self {
        Self {
            name: spec.name.trim().to_string(),
        }
    }
}

/// API-friendly group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDescription {
    pub id: ApiId,
    pub name: String,
}

impl From<Group> for GroupDescription {
    fn from(group: Group) -> Self {
        Self {
            id: group.id.into(),
            name: group.group.name,
        }
    }
}
