pub mod http;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::ExecutionStatus;

pub use http::HttpQueryService;

/// The managed query execution service.
#[async_trait]
pub trait QueryService: Send + Sync {
    /// Start executing `query` against `database`, writing results under
    /// `output_location`. Returns the service's execution id.
    async fn submit(&self, query: &str, database: &str, output_location: &str) -> Result<String>;

    /// Read the current status of an execution.
    async fn status(&self, execution_id: &str) -> Result<ExecutionStatus>;
}
