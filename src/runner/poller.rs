use std::time::Duration;

use crate::errors::ReportError;
use crate::models::{ExecutionStatus, QueryExecution};
use crate::query::QueryService;

/// How one execution is polled until it reaches a terminal state.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Delay before the first status read.
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub backoff_factor: f64,
    /// Upper bound on the whole wait, status calls included.
    pub max_wait: Duration,
    /// Give up after this many status reads fail in a row.
    pub max_consecutive_errors: u32,
}

impl PollPolicy {
    pub fn next_interval(&self, current: Duration) -> Duration {
        let next = current.as_secs_f64() * self.backoff_factor;
        if !next.is_finite() || next >= self.max_interval.as_secs_f64() {
            self.max_interval
        } else {
            Duration::from_secs_f64(next)
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(3),
            max_interval: Duration::from_secs(30),
            backoff_factor: 2.0,
            max_wait: Duration::from_secs(300),
            max_consecutive_errors: 3,
        }
    }
}

/// Poll `execution` until the service reports a terminal state, enforcing
/// `policy.max_wait`. `execution.state` tracks the last state read, so it is
/// still meaningful after a timeout.
pub async fn wait_for_completion(
    service: &dyn QueryService,
    execution: &mut QueryExecution,
    policy: &PollPolicy,
) -> Result<ExecutionStatus, ReportError> {
    let polled = tokio::time::timeout(
        policy.max_wait,
        poll_until_terminal(service, execution, policy),
    )
    .await;

    match polled {
        Ok(result) => result,
        Err(_) => Err(ReportError::Timeout(format!(
            "execution {} still {} after {}s",
            execution.execution_id,
            execution.state,
            policy.max_wait.as_secs()
        ))),
    }
}

async fn poll_until_terminal(
    service: &dyn QueryService,
    execution: &mut QueryExecution,
    policy: &PollPolicy,
) -> Result<ExecutionStatus, ReportError> {
    let max_errors = policy.max_consecutive_errors.max(1);
    let mut interval = policy.initial_interval;
    let mut consecutive_errors = 0u32;

    loop {
        tokio::time::sleep(interval).await;

        match service.status(&execution.execution_id).await {
            Ok(status) => {
                consecutive_errors = 0;
                if status.state != execution.state {
                    tracing::debug!(
                        execution_id = %execution.execution_id,
                        from = %execution.state,
                        to = %status.state,
                        "Execution state changed"
                    );
                    execution.state = status.state;
                }
                if status.state.is_terminal() {
                    return Ok(status);
                }
            }
            Err(e) => {
                consecutive_errors += 1;
                tracing::warn!(
                    execution_id = %execution.execution_id,
                    attempt = consecutive_errors,
                    "Status read failed: {:#}",
                    e
                );
                if consecutive_errors >= max_errors {
                    return Err(ReportError::Polling(format!(
                        "status of execution {} unavailable after {} attempts: {:#}",
                        execution.execution_id, consecutive_errors, e
                    )));
                }
            }
        }

        interval = policy.next_interval(interval);
    }
}
