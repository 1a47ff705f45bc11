// Prometheus metrics for sandbox executions

use codequest_common::{ErrorKind, ExecutionResult, TestOutcome};
use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter_vec, Encoder, Histogram, IntCounterVec, TextEncoder,
};
use std::time::Duration;

lazy_static! {
    /// Executions by result; `ok` or the error kind
    pub static ref EXECUTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "codequest_executions_total",
        "Sandbox executions by result",
        &["result"]
    )
    .expect("metric can be registered");

    pub static ref TEST_OUTCOMES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "codequest_test_outcomes_total",
        "Graded test cases by status",
        &["status"]
    )
    .expect("metric can be registered");

    pub static ref REQUEST_DURATION_SECONDS: Histogram = register_histogram!(
        "codequest_request_duration_seconds",
        "Wall-clock time spent executing a request in the sandbox",
        vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("metric can be registered");
}

fn execution_label(kind: Option<ErrorKind>) -> &'static str {
    kind.map(|k| k.as_str()).unwrap_or("ok")
}

pub fn record_execution(result: &ExecutionResult) {
    EXECUTIONS_TOTAL
        .with_label_values(&[execution_label(result.error_kind)])
        .inc();
}

/// Each test outcome is one sandbox execution as well as one graded case
pub fn record_outcomes(outcomes: &[TestOutcome]) {
    for outcome in outcomes {
        EXECUTIONS_TOTAL
            .with_label_values(&[execution_label(outcome.error_kind)])
            .inc();
        TEST_OUTCOMES_TOTAL
            .with_label_values(&[outcome.status.as_str()])
            .inc();
    }
}

pub fn observe_duration(elapsed: Duration) {
    REQUEST_DURATION_SECONDS.observe(elapsed.as_secs_f64());
}

/// Render the default registry in the text exposition format
pub fn render() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use codequest_common::TestStatus;
    use serde_json::json;

    fn failed_outcome(kind: ErrorKind) -> TestOutcome {
        TestOutcome {
            passed: false,
            status: TestStatus::RuntimeError,
            input: json!(1),
            expected: json!(2),
            actual: None,
            error: Some("boom".into()),
            error_kind: Some(kind),
            logs: vec![],
            description: None,
        }
    }

    #[test]
    fn test_outcomes_count_as_executions() {
        let counter = EXECUTIONS_TOTAL.with_label_values(&["resource_limit"]);
        let before = counter.get();

        record_outcomes(&[
            failed_outcome(ErrorKind::ResourceLimit),
            failed_outcome(ErrorKind::ResourceLimit),
        ]);

        assert!(counter.get() >= before + 2);
    }
}
