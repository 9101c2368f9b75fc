use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{
    api::{candidate::CandidateDescription, id::ApiId},
    common::{election::ElectionId, eligibility::ElectionPartition},
    db::election::{Election, ElectionMetadata},
    mongodb::Id,
};

/// An election specification, as submitted by an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionSpec {
    /// The kind of election, shown as its title.
    pub label: String,
    pub max_votes: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Groups whose members may vote.
    pub allowed_groups: Vec<ApiId>,
    /// Candidates standing in the election.
    pub candidates: Vec<ApiId>,
}

impl ElectionSpec {
    /// Check the spec is self-consistent. Existence of the referenced groups
    /// and candidates is checked against the database separately.
    pub fn validate(&self) -> Result<(), String> {
        if self.label.trim().is_empty() {
            return Err("Election label must not be empty".to_string());
        }
        if self.max_votes == 0 {
            return Err("An election must allow at least one selection".to_string());
        }
        if self.start_date > self.end_date {
            return Err("Election cannot end before it starts".to_string());
        }
        let unique: HashSet<_> = self.candidates.iter().collect();
        if unique.len() != self.candidates.len() {
            return Err("A candidate is listed more than once".to_string());
        }
        Ok(())
    }

    pub fn group_ids(&self) -> HashSet<Id> {
        self.allowed_groups.iter().map(|id| **id).collect()
    }

    pub fn candidate_ids(&self) -> Vec<Id> {
        self.candidates.iter().map(|id| **id).collect()
    }

    /// The stored form of this election, created by `creator`.
    pub fn to_metadata(&self, creator: Id) -> ElectionMetadata {
        ElectionMetadata {
            label: self.label.trim().to_string(),
            creator,
            max_votes: self.max_votes,
            start_date: self.start_date,
            end_date: self.end_date,
            allowed_groups: self.group_ids(),
        }
    }
}

/// Top-level election information, as shown in listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionSummary {
    pub id: ElectionId,
    pub label: String,
    pub max_votes: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl From<Election> for ElectionSummary {
    fn from(election: Election) -> Self {
        Self {
            id: election.id,
            label: election.metadata.label,
            max_votes: election.metadata.max_votes,
            start_date: election.metadata.start_date,
            end_date: election.metadata.end_date,
        }
    }
}

/// Full election information for admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionDescription {
    #[serde(flatten)]
    pub summary: ElectionSummary,
    pub creator: ApiId,
    pub allowed_groups: Vec<ApiId>,
    pub candidates: Vec<CandidateDescription>,
}

impl ElectionDescription {
    pub fn new(election: Election, candidates: Vec<CandidateDescription>) -> Self {
        let mut allowed_groups: Vec<ApiId> = election
            .allowed_groups
            .iter()
            .copied()
            .map(ApiId::from)
            .collect();
        allowed_groups.sort();
        Self {
            creator: election.creator.into(),
            allowed_groups,
            summary: election.into(),
            candidates,
        }
    }
}

/// The elections a voter can see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionList {
    /// Elections the voter can still vote in.
    pub ongoing: Vec<ElectionSummary>,
    /// Elections that have ended, whose reports the voter may view.
    pub ended: Vec<ElectionSummary>,
}

impl From<ElectionPartition> for ElectionList {
    fn from(partition: ElectionPartition) -> Self {
        Self {
            ongoing: partition.ongoing.into_iter().map(Into::into).collect(),
            ended: partition.ended.into_iter().map(Into::into).collect(),
        }
    }
}

/// What a voter needs to fill in a ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotForm {
    pub election: ElectionSummary,
    pub candidates: Vec<CandidateDescription>,
}
