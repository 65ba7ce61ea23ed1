// CLI commands: run, serve, list

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::models::config::load_config;
use crate::models::{BatchReport, RunnerConfig};
use crate::query::HttpQueryService;
use crate::runner::BatchRunner;
use crate::server::{self, AppState};
use crate::storage::FsObjectStore;

/// Wire the configured query gateway and object store into a runner.
pub async fn build_runner(config: RunnerConfig) -> Result<BatchRunner> {
    let query_service =
        HttpQueryService::new(&config.query_endpoint, config.query_api_token.clone())?;
    let object_store = FsObjectStore::new(config.storage_root.clone())
        .await
        .context("Failed to open object store")?;

    let runner = BatchRunner::new(
        Arc::new(config),
        Arc::new(query_service),
        Arc::new(object_store),
    )?;
    Ok(runner)
}

/// Render a batch as an aligned table, one row per report.
pub fn format_outcome_table(report: &BatchReport) -> String {
    let width = report
        .outcomes
        .iter()
        .map(|o| o.report_name.len())
        .max()
        .unwrap_or(0)
        .max("REPORT".len())
        + 2;

    let mut out = format!(
        "{:<width$}{:<18}{}\n",
        "REPORT",
        "OUTCOME",
        "DETAIL",
        width = width
    );
    for outcome in &report.outcomes {
        let detail = match (&outcome.artifact, &outcome.error) {
            (Some(artifact), _) => artifact.destination_key.clone(),
            (None, Some(error)) => error.clone(),
            (None, None) => "-".to_string(),
        };
        out.push_str(&format!(
            "{:<width$}{:<18}{}\n",
            outcome.report_name,
            format!("{:?}", outcome.status),
            detail,
            width = width
        ));
    }
    out
}

/// report-runner run
pub async fn cmd_run(config_path: Option<&Path>, json: bool, strict: bool) -> Result<()> {
    let config = load_config(config_path)?;
    if config.reports.is_empty() {
        tracing::warn!("No reports configured");
    }

    let runner = build_runner(config).await?;
    let report = runner.run_batch().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", format_outcome_table(&report));
        println!("{}", report.summary());
    }

    if strict && !report.all_succeeded() {
        anyhow::bail!("{} report(s) were not saved", report.failed_count());
    }
    Ok(())
}

/// report-runner serve
pub async fn cmd_serve(
    config_path: Option<&Path>,
    host: Option<&str>,
    port: Option<u16>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let host = host.map(str::to_string).unwrap_or_else(|| config.host.clone());
    let port = port.unwrap_or(config.port);

    let runner = build_runner(config).await?;
    let state = Arc::new(AppState::new(Arc::new(runner)));
    server::serve(state, &host, port).await
}

/// report-runner list
pub fn cmd_list(config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = load_config(config_path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config.reports)?);
        return Ok(());
    }

    if config.reports.is_empty() {
        println!("No reports configured.");
        return Ok(());
    }

    for job in &config.reports {
        println!("{}", job.name);
    }
    Ok(())
}
