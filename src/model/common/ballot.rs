use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::{
    error::Error,
    model::{
        common::election::ElectionId,
        db::{election::Election, vote::NewVote},
        mongodb::Id,
    },
};

/// Reasons a ballot is refused before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BallotError {
    #[error("You are not eligible to vote in this election.")]
    NotEligible,
    #[error("Voting in this election has not started yet.")]
    NotStarted,
    #[error("Voting in this election has closed.")]
    Closed,
    #[error("Please select maximally {0} candidates.")]
    TooManySelections(u32),
    #[error("Candidate {0} was selected more than once.")]
    DuplicateSelection(Id),
    #[error("Candidate {0} does not stand in this election.")]
    UnknownCandidate(Id),
}

impl From<BallotError> for Error {
    fn from(err: BallotError) -> Self {
        let message = err.to_string();
        match err {
            BallotError::NotEligible => Error::forbidden(message),
            BallotError::NotStarted | BallotError::Closed => Error::bad_request(message),
            BallotError::TooManySelections(_) => Error::unprocessable(message),
            BallotError::DuplicateSelection(_) => Error::bad_request(message),
            BallotError::UnknownCandidate(_) => {
                Error::Status(rocket::http::Status::NotFound, message)
            }
        }
    }
}

/// Check that a voter in `voter_groups` may cast a ballot in `election` today.
pub fn check_can_vote(
    election: &Election,
    voter_groups: &HashSet<Id>,
    today: NaiveDate,
) -> Result<(), BallotError> {
    if !election.permits_any(voter_groups) {
        return Err(BallotError::NotEligible);
    }
    if !election.has_started(today) {
        return Err(BallotError::NotStarted);
    }
    if election.has_ended(today) {
        return Err(BallotError::Closed);
    }
    Ok(())
}

/// Validate a ballot's selections against the election's limit and its
/// candidate set. Selecting nobody is a valid (blank) ballot.
pub fn validate_selections(
    selections: &[Id],
    max_votes: u32,
    candidates: &HashSet<Id>,
) -> Result<(), BallotError> {
    if selections.len() > max_votes as usize {
        return Err(BallotError::TooManySelections(max_votes));
    }
    let mut seen = HashSet::with_capacity(selections.len());
    for candidate in selections {
        if !seen.insert(*candidate) {
            return Err(BallotError::DuplicateSelection(*candidate));
        }
        if !candidates.contains(candidate) {
            return Err(BallotError::UnknownCandidate(*candidate));
        }
    }
    Ok(())
}

/// The vote rows for a validated ballot, one per selected candidate.
pub fn ballot_votes(election_id: ElectionId, selections: &[Id], at: DateTime<Utc>) -> Vec<NewVote> {
    selections
        .iter()
        .map(|candidate_id| NewVote {
            candidate_id: *candidate_id,
            election_id,
            date: at,
        })
        .collect()
}
