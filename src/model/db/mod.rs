//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in an DB-friendly way, e.g.:
//!
//! - IDs and datetimes are serialised in MongoDB's own format.
//!
//! Each entity comes in two flavours: a `*Core` (aliased as `New*`) without
//! an ID, for insertion, and the full type carrying its `_id`.

pub mod admin;
pub mod candidate;
pub mod election;
pub mod election_candidate;
pub mod group;
pub mod vote;
pub mod voted_user;
pub mod voter;
