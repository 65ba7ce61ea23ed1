// Batch runner: submit every report query, wait for each, copy results.

pub mod clock;
pub mod poller;

use std::sync::Arc;

use chrono::NaiveDate;
use futures_util::stream::{self, StreamExt};
use uuid::Uuid;

use crate::errors::ReportError;
use crate::models::{
    BatchReport, ExecutionState, ExecutionStatus, JobOutcome, OutcomeStatus, QueryExecution,
    ReportArtifact, ReportJob, RunnerConfig,
};
use crate::query::QueryService;
use crate::runner::clock::{Clock, SystemClock};
use crate::runner::poller::{wait_for_completion, PollPolicy};
use crate::storage::{ObjectStore, StorageLocation};

/// Stable key a report is materialized at: `{prefix}{name}_{YYYY-MM-DD}.csv`.
pub fn destination_key(reports_prefix: &str, report_name: &str, report_date: NaiveDate) -> String {
    format!(
        "{}{}_{}.csv",
        reports_prefix,
        report_name,
        report_date.format("%Y-%m-%d")
    )
}

/// Key of the result object for a finished execution.
///
/// A location reported by the service wins; otherwise the result is assumed
/// to be `{output prefix}{execution_id}.csv`. Either way it must live in
/// `bucket`, since materialization is a same-bucket copy.
pub fn result_source_key(
    output: &StorageLocation,
    bucket: &str,
    execution_id: &str,
    status: &ExecutionStatus,
) -> Result<String, ReportError> {
    match status.output_location {
        Some(ref reported) => {
            let (reported_bucket, key) = StorageLocation::parse_object(reported)
                .map_err(|e| ReportError::Copy(e.to_string()))?;
            if reported_bucket != bucket {
                return Err(ReportError::Copy(format!(
                    "result {} is outside bucket '{}'",
                    reported, bucket
                )));
            }
            Ok(key)
        }
        None => Ok(output.key_for(&format!("{}.csv", execution_id))),
    }
}

/// Drives every configured ReportJob through submit, poll and copy.
///
/// Jobs are independent: up to `concurrency_limit()` of them are in flight
/// at once on a single task, and no job's failure affects another.
pub struct BatchRunner {
    config: Arc<RunnerConfig>,
    output: StorageLocation,
    policy: PollPolicy,
    query_service: Arc<dyn QueryService>,
    object_store: Arc<dyn ObjectStore>,
    clock: Arc<dyn Clock>,
}

impl BatchRunner {
    /// Create a runner. Fails if the configuration is invalid.
    pub fn new(
        config: Arc<RunnerConfig>,
        query_service: Arc<dyn QueryService>,
        object_store: Arc<dyn ObjectStore>,
    ) -> Result<Self, ReportError> {
        config.validate()?;
        let output = config.output_location()?;
        let policy = config.poll_policy();
        Ok(Self {
            config,
            output,
            policy,
            query_service,
            object_store,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the clock used for report dates and timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run every report once and return one outcome per report, in
    /// declaration order. Never fails: job errors are recorded, not raised.
    pub async fn run_batch(&self) -> BatchReport {
        let batch_id = Uuid::now_v7();
        let started_at = self.clock.now();
        let report_date = started_at.date_naive();
        let limit = self.config.concurrency_limit();

        tracing::info!(
            %batch_id,
            %report_date,
            reports = self.config.reports.len(),
            concurrency = limit,
            "Starting report batch"
        );

        // Futures are built up front so the stream holds no higher-ranked
        // closure; otherwise the batch future is not Send.
        let jobs: Vec<_> = self
            .config
            .reports
            .iter()
            .map(|job| self.run_job(job, report_date))
            .collect();
        let outcomes: Vec<JobOutcome> = stream::iter(jobs).buffered(limit).collect().await;

        let report = BatchReport {
            batch_id,
            report_date,
            started_at,
            finished_at: self.clock.now(),
            outcomes,
        };

        if report.all_succeeded() {
            tracing::info!(%batch_id, "{}", report.summary());
        } else {
            tracing::warn!(%batch_id, "{}", report.summary());
        }
        report
    }

    async fn run_job(&self, job: &ReportJob, report_date: NaiveDate) -> JobOutcome {
        let started_at = self.clock.now();
        let mut execution: Option<QueryExecution> = None;

        let result = self.execute(job, report_date, &mut execution).await;

        let execution_id = execution.as_ref().map(|e| e.execution_id.clone());
        let final_state = execution.as_ref().map(|e| e.state);
        let finished_at = self.clock.now();

        match result {
            Ok(artifact) => {
                tracing::info!(
                    report = %job.name,
                    execution_id = execution_id.as_deref().unwrap_or_default(),
                    destination = %artifact.destination_key,
                    "Report saved"
                );
                JobOutcome {
                    report_name: job.name.clone(),
                    execution_id,
                    status: OutcomeStatus::Materialized,
                    final_state,
                    artifact: Some(artifact),
                    error: None,
                    started_at,
                    finished_at,
                }
            }
            Err(e) => {
                let status = e.outcome_status();
                tracing::error!(
                    report = %job.name,
                    execution_id = execution_id.as_deref().unwrap_or_default(),
                    outcome = ?status,
                    "Report not saved: {}",
                    e
                );
                JobOutcome {
                    report_name: job.name.clone(),
                    execution_id,
                    status,
                    final_state,
                    artifact: None,
                    error: Some(e.to_string()),
                    started_at,
                    finished_at,
                }
            }
        }
    }

    async fn execute(
        &self,
        job: &ReportJob,
        report_date: NaiveDate,
        execution: &mut Option<QueryExecution>,
    ) -> Result<ReportArtifact, ReportError> {
        tracing::info!(report = %job.name, "Submitting query");

        let execution_id = self
            .query_service
            .submit(&job.query, &self.config.database, &self.config.output_location)
            .await
            .map_err(|e| ReportError::Submission(format!("{:#}", e)))?;

        tracing::debug!(report = %job.name, %execution_id, "Query submitted");

        let execution = execution.insert(QueryExecution {
            execution_id,
            state: ExecutionState::Queued,
        });

        let status = wait_for_completion(&*self.query_service, execution, &self.policy).await?;

        match status.state {
            ExecutionState::Succeeded => {
                self.materialize(job, report_date, &execution.execution_id, &status)
                    .await
            }
            ExecutionState::Failed => Err(ReportError::QueryFailed(
                status
                    .state_reason
                    .unwrap_or_else(|| format!("execution {} FAILED", execution.execution_id)),
            )),
            ExecutionState::Cancelled => Err(ReportError::QueryCancelled(
                status
                    .state_reason
                    .unwrap_or_else(|| format!("execution {} CANCELLED", execution.execution_id)),
            )),
            other => Err(ReportError::Polling(format!(
                "execution {} stopped polling in non-terminal state {}",
                execution.execution_id, other
            ))),
        }
    }

    async fn materialize(
        &self,
        job: &ReportJob,
        report_date: NaiveDate,
        execution_id: &str,
        status: &ExecutionStatus,
    ) -> Result<ReportArtifact, ReportError> {
        let bucket = &self.config.bucket;
        let source_key = result_source_key(&self.output, bucket, execution_id, status)?;
        let destination_key = destination_key(&self.config.reports_prefix, &job.name, report_date);

        tracing::info!(
            report = %job.name,
            %source_key,
            %destination_key,
            "Copying query result"
        );

        self.object_store
            .copy_object(bucket, &source_key, &destination_key)
            .await
            .map_err(|e| ReportError::Copy(format!("{:#}", e)))?;

        Ok(ReportArtifact {
            bucket: bucket.clone(),
            source_key,
            destination_key,
        })
    }
}
