// HTTP route handlers for the CodeQuest API

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use codequest_common::{TestCase, TestOutcome};
use codequest_sandbox::{executor, Sandbox};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

use crate::metrics;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub source_code: String,
    #[serde(default)]
    pub input: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRequest {
    pub source_code: String,
    pub test_cases: Vec<TestCase>,
}

#[derive(Debug, Serialize)]
pub struct TestResponse {
    pub outcomes: Vec<TestOutcome>,
}

/// Run sandbox work on the blocking pool so the reactor never waits on a
/// learner's loop
async fn run_blocking<T, F>(sandbox: &Sandbox, work: F) -> Result<T, Response>
where
    T: Send + 'static,
    F: FnOnce(&Sandbox) -> T + Send + 'static,
{
    let sandbox = sandbox.clone();
    let start = Instant::now();
    let joined = tokio::task::spawn_blocking(move || work(&sandbox)).await;
    metrics::observe_duration(start.elapsed());

    joined.map_err(|e| {
        error!(error = %e, "Sandbox task failed to complete");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "sandbox task failed" })),
        )
            .into_response()
    })
}

/// GET /status - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// POST /run - Execute a submission once
pub async fn run_code(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RunRequest>,
) -> Response {
    let RunRequest { source_code, input } = payload;
    let result = match run_blocking(&state.sandbox, move |sandbox| {
        sandbox.execute(&source_code, input.as_ref())
    })
    .await
    {
        Ok(result) => result,
        Err(response) => return response,
    };

    metrics::record_execution(&result);
    info!(
        success = result.success,
        kind = ?result.error_kind,
        log_lines = result.logs.len(),
        "Run request completed"
    );

    (StatusCode::OK, Json(result)).into_response()
}

/// POST /test - Run a submission against test cases
pub async fn run_tests(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TestRequest>,
) -> Response {
    let TestRequest {
        source_code,
        test_cases,
    } = payload;
    let outcomes = match run_blocking(&state.sandbox, move |sandbox| {
        executor::run_tests(sandbox, &source_code, &test_cases)
    })
    .await
    {
        Ok(outcomes) => outcomes,
        Err(response) => return response,
    };

    metrics::record_outcomes(&outcomes);
    (StatusCode::OK, Json(TestResponse { outcomes })).into_response()
}

/// POST /grade - Run test cases and return a grading report
pub async fn grade_submission(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TestRequest>,
) -> Response {
    let submission_id = Uuid::new_v4();
    let TestRequest {
        source_code,
        test_cases,
    } = payload;
    let report = match run_blocking(&state.sandbox, move |sandbox| {
        executor::grade_submission(sandbox, submission_id, &source_code, &test_cases)
    })
    .await
    {
        Ok(report) => report,
        Err(response) => return response,
    };

    metrics::record_outcomes(&report.outcomes);
    info!(
        submission_id = %submission_id,
        verdict = ?report.verdict,
        passed = report.passed_count,
        total = report.total_count,
        "Grade request completed"
    );

    (StatusCode::OK, Json(report)).into_response()
}

/// GET /metrics - Prometheus text exposition
pub async fn export_metrics() -> Response {
    match metrics::render() {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
