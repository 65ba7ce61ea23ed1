use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize};

use crate::models::ExecutionStatus;
use crate::query::QueryService;

/// Per-request timeout for gateway calls. Polling deadlines are enforced
/// separately by the runner.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    query: &'a str,
    database: &'a str,
    output_location: &'a str,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    execution_id: String,
}

/// QueryService client for a JSON/HTTP query gateway.
///
/// - `POST {endpoint}/executions` `{query, database, output_location}` -> `{execution_id}`
/// - `GET {endpoint}/executions/{id}` -> `{state, state_reason?, output_location?}`
pub struct HttpQueryService {
    client: Client,
    endpoint: String,
    api_token: Option<String>,
}

impl HttpQueryService {
    pub fn new(endpoint: &str, api_token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_token,
        })
    }

    /// `{endpoint}/{segments...}`, each segment percent-encoded.
    fn url_for(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.endpoint)
            .with_context(|| format!("Invalid query endpoint {}", self.endpoint))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Invalid query endpoint {}", self.endpoint))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.api_token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// Turn a non-2xx response into an error carrying status and body.
async fn check_status(resp: Response, action: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(anyhow::anyhow!(
        "{} failed with HTTP {}: {}",
        action,
        status.as_u16(),
        body.trim()
    ))
}

#[async_trait]
impl QueryService for HttpQueryService {
    async fn submit(&self, query: &str, database: &str, output_location: &str) -> Result<String> {
        let url = self.url_for(&["executions"])?;
        let request = self.client.post(url.clone()).json(&SubmitRequest {
            query,
            database,
            output_location,
        });

        let resp = self
            .authorize(request)
            .send()
            .await
            .with_context(|| format!("Failed to reach query service at {}", url))?;
        let resp = check_status(resp, "Query submission").await?;

        let body: SubmitResponse = resp
            .json()
            .await
            .context("Invalid submission response from query service")?;
        if body.execution_id.is_empty() {
            return Err(anyhow::anyhow!("Query service returned an empty execution id"));
        }
        Ok(body.execution_id)
    }

    async fn status(&self, execution_id: &str) -> Result<ExecutionStatus> {
        let url = self.url_for(&["executions", execution_id])?;
        let resp = self
            .authorize(self.client.get(url.clone()))
            .send()
            .await
            .with_context(|| format!("Failed to reach query service at {}", url))?;
        let resp = check_status(resp, "Status request").await?;

        resp.json::<ExecutionStatus>()
            .await
            .context("Invalid status response from query service")
    }
}
