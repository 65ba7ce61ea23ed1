use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use super::AppState;
use crate::models::{BatchReport, ReportJob};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

fn error_response(status: StatusCode, error: &str, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        }),
    )
        .into_response()
}

/// Result of a triggered batch. Always returned with 200: per-report
/// failures are in `report.outcomes`, not in the HTTP status.
#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub message: String,
    pub all_succeeded: bool,
    pub report: BatchReport,
}

/// GET /api/reports
pub async fn list_reports(State(state): State<Arc<AppState>>) -> Json<Vec<ReportJob>> {
    Json(state.runner.config().reports.clone())
}

/// POST /api/run
///
/// The batch runs on its own task, so a client that disconnects or times out
/// does not cancel it; the run lock is released only when the batch ends.
pub async fn run_batch(State(state): State<Arc<AppState>>) -> Response {
    let guard = match Arc::clone(&state.run_lock).try_lock_owned() {
        Ok(guard) => guard,
        Err(_) => {
            tracing::warn!("Batch trigger rejected: a batch is already running");
            return error_response(
                StatusCode::CONFLICT,
                "conflict",
                "A report batch is already running",
            );
        }
    };

    let runner = Arc::clone(&state.runner);
    let batch = tokio::spawn(async move {
        let report = runner.run_batch().await;
        drop(guard);
        report
    });

    match batch.await {
        Ok(report) => (
            StatusCode::OK,
            Json(RunResponse {
                message: report.summary(),
                all_succeeded: report.all_succeeded(),
                report,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Batch task failed: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "The report batch did not complete",
            )
        }
    }
}
