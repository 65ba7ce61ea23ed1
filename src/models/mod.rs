pub mod config;
pub mod execution;
pub mod outcome;
pub mod report;

pub use config::RunnerConfig;
pub use execution::{ExecutionState, ExecutionStatus, QueryExecution};
pub use outcome::{BatchReport, JobOutcome, OutcomeStatus, ReportArtifact};
pub use report::ReportJob;
