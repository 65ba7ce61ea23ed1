use thiserror::Error;

use crate::models::OutcomeStatus;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Submission error: {0}")]
    Submission(String),

    #[error("Polling error: {0}")]
    Polling(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Query cancelled: {0}")]
    QueryCancelled(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Copy error: {0}")]
    Copy(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl ReportError {
    /// Outcome recorded for a job that ended with this error.
    ///
    /// Config, validation and storage errors never originate inside a job;
    /// they fall back to `CopyFailed` only if a store surfaces them during
    /// materialization.
    pub fn outcome_status(&self) -> OutcomeStatus {
        match self {
            ReportError::Submission(_) => OutcomeStatus::SubmissionFailed,
            ReportError::Polling(_) => OutcomeStatus::PollingFailed,
            ReportError::QueryFailed(_) => OutcomeStatus::QueryFailed,
            ReportError::QueryCancelled(_) => OutcomeStatus::QueryCancelled,
            ReportError::Timeout(_) => OutcomeStatus::TimedOut,
            ReportError::Copy(_)
            | ReportError::Config(_)
            | ReportError::Validation(_)
            | ReportError::Storage(_) => OutcomeStatus::CopyFailed,
        }
    }
}

impl From<std::io::Error> for ReportError {
    fn from(err: std::io::Error) -> Self {
        ReportError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for ReportError {
    fn from(err: serde_json::Error) -> Self {
        ReportError::Config(err.to_string())
    }
}
