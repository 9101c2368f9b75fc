use chrono::NaiveDate;
use rocket::{form::FromFormField, http::Header, serde::json::Json, Responder};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    api::election::ElectionSummary,
    common::tally::{voting_percentage, CandidateVotes},
};

/// File name offered to the browser for downloaded reports.
pub const CSV_REPORT_FILENAME: &str = "election_report.csv";

/// Turnout and tally for one election.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectionReport {
    pub election: ElectionSummary,
    /// Sum of all per-candidate counts.
    pub total_votes: u64,
    pub candidate_votes: CandidateVotes,
    pub eligible_voters_count: u64,
    pub voted_users_count: u64,
    pub voting_percentage: f64,
    /// When the report was generated.
    pub date: NaiveDate,
}

impl ElectionReport {
    pub fn new(
        election: ElectionSummary,
        candidate_votes: CandidateVotes,
        eligible_voters_count: u64,
        voted_users_count: u64,
        date: NaiveDate,
    ) -> Self {
        Self {
            election,
            total_votes: candidate_votes.values().sum(),
            candidate_votes,
            eligible_voters_count,
            voted_users_count,
            voting_percentage: voting_percentage(voted_users_count, eligible_voters_count),
            date,
        }
    }

    /// Render as `section,name,value` rows.
    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["section", "name", "value"])?;

        let election = &self.election;
        let election_rows = [
            ("id", election.id.to_string()),
            ("label", election.label.clone()),
            ("max_votes", election.max_votes.to_string()),
            ("start_date", election.start_date.to_string()),
            ("end_date", election.end_date.to_string()),
        ];
        for (name, value) in election_rows {
            writer.write_record(["election", name, value.as_str()])?;
        }

        let summary_rows = [
            ("total_votes", self.total_votes.to_string()),
            ("eligible_voters_count", self.eligible_voters_count.to_string()),
            ("voted_users_count", self.voted_users_count.to_string()),
            ("voting_percentage", format!("{:.2}", self.voting_percentage)),
            ("date", self.date.to_string()),
        ];
        for (name, value) in summary_rows {
            writer.write_record(["summary", name, value.as_str()])?;
        }

        for (candidate, votes) in &self.candidate_votes {
            let votes = votes.to_string();
            writer.write_record(["candidate_votes", candidate.as_str(), votes.as_str()])?;
        }

        writer
            .into_inner()
            .map_err(|err| csv::Error::from(err.into_error()).into())
    }
}

/// How a report should be delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromFormField)]
pub enum ReportFormat {
    #[default]
    Json,
    Csv,
}

/// A CSV file the browser should download rather than display.
#[derive(Responder)]
#[response(content_type = "text/csv")]
pub struct CsvAttachment {
    body: Vec<u8>,
    disposition: Header<'static>,
}

impl CsvAttachment {
    pub fn new(body: Vec<u8>, filename: &str) -> Self {
        Self {
            body,
            disposition: Header::new(
                "Content-Disposition",
                format!("attachment; filename=\"{filename}\""),
            ),
        }
    }
}

#[derive(Responder)]
pub enum ReportResponse {
    Json(Json<ElectionReport>),
    Csv(CsvAttachment),
}

impl ElectionReport {
    /// Package the report in the requested format.
    pub fn into_response(self, format: ReportFormat) -> Result<ReportResponse> {
        Ok(match format {
            ReportFormat::Json => ReportResponse::Json(Json(self)),
            ReportFormat::Csv => {
                ReportResponse::Csv(CsvAttachment::new(self.to_csv()?, CSV_REPORT_FILENAME))
            }
        })
    }
}
