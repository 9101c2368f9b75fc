//! Domain types and decision rules shared between the API and DB layers.

pub mod ballot;
pub mod election;
pub mod eligibility;
pub mod password;
pub mod tally;
