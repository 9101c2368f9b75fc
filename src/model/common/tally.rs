use std::collections::{BTreeMap, HashMap};

use crate::model::mongodb::Id;

/// Number of votes per candidate, keyed by full name.
pub type CandidateVotes = BTreeMap<String, u64>;

/// Count votes by candidate full name. `votes` yields the candidate ID of
/// each vote row; `names` maps candidate IDs to full names. Candidates with
/// no votes do not appear.
pub fn tally_votes(
    votes: impl IntoIterator<Item = Id>,
    names: &HashMap<Id, String>,
) -> CandidateVotes {
    let mut tally = CandidateVotes::new();
    for candidate_id in votes {
        let name = names
            .get(&candidate_id)
            .cloned()
            .unwrap_or_else(|| format!("Unknown candidate {candidate_id}"));
        *tally.entry(name).or_insert(0) += 1;
    }
    tally
}

/// Percentage of eligible voters who have voted; zero if nobody is eligible.
pub fn voting_percentage(voted_users: u64, eligible_voters: u64) -> f64 {
    if eligible_voters == 0 {
        0.0
    } else {
        100.0 * voted_users as f64 / eligible_voters as f64
    }
}
