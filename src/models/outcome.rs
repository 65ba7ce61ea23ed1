use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ExecutionState;

/// How a single report job ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OutcomeStatus {
    Materialized,
    SubmissionFailed,
    PollingFailed,
    QueryFailed,
    QueryCancelled,
    TimedOut,
    CopyFailed,
}

impl OutcomeStatus {
    pub fn is_success(self) -> bool {
        self == OutcomeStatus::Materialized
    }
}

/// A query result copied to its stable reporting key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportArtifact {
    pub bucket: String,
    pub source_key: String,
    pub destination_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobOutcome {
    pub report_name: String,
    pub execution_id: Option<String>,
    pub status: OutcomeStatus,
    /// Last state observed from the query service, if any status read succeeded.
    pub final_state: Option<ExecutionState>,
    pub artifact: Option<ReportArtifact>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Per-job results of one batch, in report declaration order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub report_date: NaiveDate,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<JobOutcome>,
}

impl BatchReport {
    pub fn succeeded_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status.is_success())
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.succeeded_count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed_count() == 0
    }

    pub fn outcome(&self, report_name: &str) -> Option<&JobOutcome> {
        self.outcomes.iter().find(|o| o.report_name == report_name)
    }

    /// One-line human summary, e.g. "16 of 17 reports saved (1 failed)".
    pub fn summary(&self) -> String {
        let total = self.outcomes.len();
        let ok = self.succeeded_count();
        if ok == total {
            format!("All {} reports saved", total)
        } else {
            format!("{} of {} reports saved ({} failed)", ok, total, total - ok)
        }
    }
}
