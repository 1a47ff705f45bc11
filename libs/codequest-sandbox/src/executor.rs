/// Test Runner - High-Level Orchestration
///
/// **Responsibility:**
/// Coordinate the sandbox and the evaluator for a whole submission.
///
/// **Architecture:**
/// 1. Resolve the entry point once (resolver.rs)
/// 2. Run every test case in a fresh sandbox, in input order (engine.rs)
/// 3. Score each result (evaluator.rs)
/// 4. Fold outcomes into a report (codequest-common grading)
///
/// A failing case never stops later cases from running.
use crate::engine::Sandbox;
use crate::evaluator;
use crate::resolver::resolve_entry_point;
use codequest_common::{GradingReport, TestCase, TestOutcome};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Run every test case against one submission
#[instrument(skip_all, fields(test_count = test_cases.len()))]
pub fn run_tests(sandbox: &Sandbox, source: &str, test_cases: &[TestCase]) -> Vec<TestOutcome> {
    let resolution = resolve_entry_point(source);
    match resolution.entry_point() {
        Some(entry) => debug!(entry = %entry.name, arity = entry.arity, "Resolved entry point"),
        None => debug!("No entry point declared; cases run for side effects only"),
    }

    let results: Vec<_> = test_cases
        .iter()
        .enumerate()
        .map(|(idx, case)| {
            let result = sandbox.execute_resolved(source, &resolution, Some(&case.input));
            if let Some(error) = &result.error {
                warn!(
                    test = idx + 1,
                    kind = ?result.error_kind,
                    error = %error,
                    "Test execution failed; test cannot pass"
                );
            }
            result
        })
        .collect();

    let outcomes = evaluator::evaluate(test_cases, &results);

    info!(
        passed = outcomes.iter().filter(|o| o.passed).count(),
        total = outcomes.len(),
        "Test run complete"
    );

    outcomes
}

/// Run all tests and package the grading report
pub fn grade_submission(
    sandbox: &Sandbox,
    submission_id: Uuid,
    source: &str,
    test_cases: &[TestCase],
) -> GradingReport {
    let outcomes = run_tests(sandbox, source, test_cases);
    let report = GradingReport::new(submission_id, outcomes);

    info!(
        submission_id = %submission_id,
        verdict = ?report.verdict,
        passed = report.passed_count,
        total = report.total_count,
        "Submission graded"
    );

    report
}
