use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::errors::ReportError;
use crate::models::report::validate_reports;
use crate::models::ReportJob;
use crate::runner::poller::PollPolicy;
use crate::storage::StorageLocation;

/// Env var naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "REPORT_RUNNER_CONFIG";

/// Env var overriding `query_api_token`.
pub const TOKEN_ENV_VAR: &str = "REPORT_RUNNER_QUERY_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Logical database every query is scoped to.
    #[serde(default = "default_database")]
    pub database: String,
    /// Where the query service writes results, e.g. `s3://bucket/results/`.
    #[serde(default = "default_output_location")]
    pub output_location: String,
    /// Bucket holding both query results and reports.
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_reports_prefix")]
    pub reports_prefix: String,
    #[serde(default = "default_query_endpoint")]
    pub query_endpoint: String,
    #[serde(default, skip_serializing)]
    pub query_api_token: Option<String>,
    /// Root directory of the filesystem object store; one subdirectory per bucket.
    #[serde(default = "default_storage_root")]
    pub storage_root: PathBuf,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_poll_interval_ms")]
    pub max_poll_interval_ms: u64,
    #[serde(default = "default_poll_backoff_factor")]
    pub poll_backoff_factor: f64,
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
    #[serde(default = "default_max_poll_errors")]
    pub max_poll_errors: u32,
    /// Jobs in flight at once. `None` runs every job concurrently.
    #[serde(default)]
    pub max_concurrency: Option<usize>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub reports: Vec<ReportJob>,
}

fn default_database() -> String {
    "default".to_string()
}

fn default_output_location() -> String {
    "s3://reports-bucket/query-results/".to_string()
}

fn default_bucket() -> String {
    "reports-bucket".to_string()
}

fn default_reports_prefix() -> String {
    "reports/".to_string()
}

fn default_query_endpoint() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./data")
}

fn default_poll_interval_ms() -> u64 {
    3_000
}

fn default_max_poll_interval_ms() -> u64 {
    30_000
}

fn default_poll_backoff_factor() -> f64 {
    2.0
}

fn default_max_wait_secs() -> u64 {
    300
}

fn default_max_poll_errors() -> u32 {
    3
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8390
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            output_location: default_output_location(),
            bucket: default_bucket(),
            reports_prefix: default_reports_prefix(),
            query_endpoint: default_query_endpoint(),
            query_api_token: None,
            storage_root: default_storage_root(),
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_interval_ms: default_max_poll_interval_ms(),
            poll_backoff_factor: default_poll_backoff_factor(),
            max_wait_secs: default_max_wait_secs(),
            max_poll_errors: default_max_poll_errors(),
            max_concurrency: None,
            host: default_host(),
            port: default_port(),
            reports: Vec::new(),
        }
    }
}

impl RunnerConfig {
    /// Check everything the batch runner relies on before any job starts.
    pub fn validate(&self) -> Result<(), ReportError> {
        validate_reports(&self.reports)?;

        if self.database.trim().is_empty() {
            return Err(ReportError::Validation(
                "database cannot be empty".to_string(),
            ));
        }

        let location = self.output_location()?;
        if location.bucket != self.bucket {
            return Err(ReportError::Validation(format!(
                "output_location bucket '{}' does not match bucket '{}'",
                location.bucket, self.bucket
            )));
        }

        if self.poll_interval_ms == 0 {
            return Err(ReportError::Validation(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.max_poll_interval_ms < self.poll_interval_ms {
            return Err(ReportError::Validation(
                "max_poll_interval_ms must be at least poll_interval_ms".to_string(),
            ));
        }
        if self.poll_backoff_factor.is_nan() || self.poll_backoff_factor < 1.0 {
            return Err(ReportError::Validation(format!(
                "poll_backoff_factor must be >= 1.0, got {}",
                self.poll_backoff_factor
            )));
        }
        if self.max_wait_secs == 0 {
            return Err(ReportError::Validation(
                "max_wait_secs must be greater than 0".to_string(),
            ));
        }
        // The first status read happens after one poll interval.
        if self.max_wait_secs.saturating_mul(1_000) <= self.poll_interval_ms {
            return Err(ReportError::Validation(format!(
                "max_wait_secs ({}s) must be longer than poll_interval_ms ({}ms)",
                self.max_wait_secs, self.poll_interval_ms
            )));
        }
        if self.max_concurrency == Some(0) {
            return Err(ReportError::Validation(
                "max_concurrency must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn output_location(&self) -> Result<StorageLocation, ReportError> {
        StorageLocation::parse(&self.output_location)
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            initial_interval: Duration::from_millis(self.poll_interval_ms),
            max_interval: Duration::from_millis(self.max_poll_interval_ms),
            backoff_factor: self.poll_backoff_factor,
            max_wait: Duration::from_secs(self.max_wait_secs),
            max_consecutive_errors: self.max_poll_errors,
        }
    }

    /// Effective in-flight limit, never zero.
    pub fn concurrency_limit(&self) -> usize {
        self.max_concurrency
            .unwrap_or(self.reports.len())
            .max(1)
    }
}

fn read_config_file(path: &Path) -> Result<RunnerConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: RunnerConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    tracing::info!("Loaded config from: {}", path.display());
    Ok(config)
}

/// Load the RunnerConfig using this resolution order:
///   1. explicit path (the `--config` flag)
///   2. the REPORT_RUNNER_CONFIG environment variable
///   3. `{platform config dir}/report-runner/config.json`
///   4. `./config.json`
///   5. `RunnerConfig::default()`
///
/// The token env var overrides any token from the file. The result is
/// validated before it is returned.
pub fn load_config(config_path: Option<&Path>) -> Result<RunnerConfig> {
    let mut config = resolve_config(config_path)?;

    if let Ok(token) = std::env::var(TOKEN_ENV_VAR) {
        if !token.is_empty() {
            config.query_api_token = Some(token);
        }
    }

    config.validate()?;
    Ok(config)
}

fn resolve_config(config_path: Option<&Path>) -> Result<RunnerConfig> {
    if let Some(path) = config_path {
        if path.exists() {
            return read_config_file(path);
        }
        return Err(anyhow::anyhow!("Config file not found: {}", path.display()));
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return read_config_file(&path);
        }
        return Err(anyhow::anyhow!(
            "Config file from {} not found: {}",
            CONFIG_ENV_VAR,
            path.display()
        ));
    }

    if let Some(config_dir) = dirs::config_dir() {
        let path = config_dir.join("report-runner").join("config.json");
        if path.exists() {
            return read_config_file(&path);
        }
    }

    let local = PathBuf::from("config.json");
    if local.exists() {
        return read_config_file(&local);
    }

    tracing::info!("No config file found, using defaults");
    Ok(RunnerConfig::default())
}
