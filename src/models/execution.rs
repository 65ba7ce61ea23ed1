use serde::{Deserialize, Serialize};

/// Lifecycle state of one query execution as reported by the query service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl ExecutionState {
    /// Polling stops once an execution reaches a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionState::Succeeded | ExecutionState::Failed | ExecutionState::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionState::Queued => "QUEUED",
            ExecutionState::Running => "RUNNING",
            ExecutionState::Succeeded => "SUCCEEDED",
            ExecutionState::Failed => "FAILED",
            ExecutionState::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One status read of an execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionStatus {
    pub state: ExecutionState,
    /// Service-provided explanation, usually only set for FAILED/CANCELLED.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_reason: Option<String>,
    /// Where the service actually wrote the result object, if it says so.
    /// Takes precedence over the `{output_prefix}{execution_id}.csv` convention.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_location: Option<String>,
}

impl ExecutionStatus {
    pub fn new(state: ExecutionState) -> Self {
        Self {
            state,
            state_reason: None,
            output_location: None,
        }
    }
}

/// An execution handle owned by exactly one job task.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryExecution {
    pub execution_id: String,
    pub state: ExecutionState,
}
