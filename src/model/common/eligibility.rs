use std::collections::HashSet;

use chrono::NaiveDate;

use crate::model::{common::election::ElectionId, db::election::Election, mongodb::Id};

/// The elections visible to one voter, split by whether they can still vote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElectionPartition {
    /// Not yet ended, and the voter has not voted in them.
    pub ongoing: Vec<Election>,
    /// Ended, regardless of whether the voter took part.
    pub ended: Vec<Election>,
}

/// Partition `elections` for a voter in `voter_groups` who has already voted
/// in `voted`, as of `today`.
///
/// Elections that do not permit any of the voter's groups are dropped
/// entirely. Each list is ordered by end date, then ID.
pub fn partition_elections(
    elections: impl IntoIterator<Item = Election>,
    voter_groups: &HashSet<Id>,
    voted: &HashSet<ElectionId>,
    today: NaiveDate,
) -> ElectionPartition {
    let mut partition = ElectionPartition::default();
    for election in elections {
        if !election.permits_any(voter_groups) {
            continue;
        }
        if election.has_ended(today) {
            partition.ended.push(election);
        } else if !voted.contains(&election.id) {
            partition.ongoing.push(election);
        }
    }
    partition.ongoing.sort_by_key(|e| (e.end_date, e.id));
    partition.ended.sort_by_key(|e| (e.end_date, e.id));
    partition
}
