//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - IDs are serialised as hex strings.
//! - Dates are serialised as `YYYY-MM-DD`.

pub mod admin;
pub mod auth;
pub mod ballot;
pub mod candidate;
pub mod election;
pub mod group;
pub mod id;
pub mod pagination;
pub mod report;
pub mod voter;
