use std::{
    fmt::{Display, Formatter},
    ops::Deref,
    str::FromStr,
};

use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use rocket::{
    form::{self, prelude::ErrorKind, FromFormField, ValueField},
    http::{
        impl_from_uri_param_identity,
        uri::fmt::{Path, UriDisplay},
    },
    request::FromParam,
};
use serde::{Deserialize, Serialize};

/// A MongoDB object ID, usable directly as a route parameter or form field.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id(ObjectId);

impl Id {
    /// Generate a fresh ID.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(ObjectId::new())
    }

    /// A filter document matching exactly this ID.
    pub fn as_doc(&self) -> Document {
        doc! { "_id": self.0 }
    }
}

impl Deref for Id {
    type Target = ObjectId;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Id {
    type Err = mongodb::bson::oid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse::<ObjectId>()?))
    }
}

impl From<ObjectId> for Id {
    fn from(id: ObjectId) -> Self {
        Self(id)
    }
}

impl From<Id> for Bson {
    fn from(id: Id) -> Self {
        Bson::ObjectId(id.0)
    }
}

impl<'a> FromParam<'a> for Id {
    type Error = mongodb::bson::oid::Error;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        param.parse::<Id>()
    }
}

#[rocket::async_trait]
impl<'r> FromFormField<'r> for Id {
    fn from_value(field: ValueField<'r>) -> form::Result<'r, Self> {
        field
            .value
            .parse::<Id>()
            .map_err(|err| ErrorKind::Custom(Box::new(err)).into())
    }
}

impl UriDisplay<Path> for Id {
    fn fmt(&self, formatter: &mut rocket::http::uri::fmt::Formatter<'_, Path>) -> std::fmt::Result {
        formatter.write_value(self.to_string())
    }
}

impl_from_uri_param_identity!([Path] Id);

/// Convert a collection of IDs into a BSON array, e.g. for use with `$in`.
pub fn id_array<'a>(ids: impl IntoIterator<Item = &'a Id>) -> Bson {
    Bson::Array(ids.into_iter().map(|id| Bson::from(*id)).collect())
}

/// A filter matching the document with the given integer `_id`.
pub fn u32_id_filter(id: u32) -> Document {
    doc! { "_id": id }
}

/// A case-insensitive substring match on a single field. The term is matched
/// literally, never as a pattern.
pub fn contains_filter(field: &str, term: &str) -> Document {
    let mut filter = Document::new();
    filter.insert(
        field,
        doc! {
            "$regex": regex::escape(term),
            "$options": "i",
        },
    );
    filter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_parses_from_hex() {
        let id = Id::new();
        let parsed: Id = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-an-id".parse::<Id>().is_err());
    }

    #[test]
    fn contains_filter_matches_literally() {
        let filter = contains_filter("email", "a.b+c");
        let condition = filter.get_document("email").unwrap();
        assert_eq!(condition.get_str("$regex").unwrap(), "a\\.b\\+c");
        assert_eq!(condition.get_str("$options").unwrap(), "i");
    }
}
