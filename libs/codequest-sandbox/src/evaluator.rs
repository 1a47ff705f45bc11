/// Test Evaluator - Scoring Logic
///
/// **Core Responsibility:**
/// Compare one execution result against its test case and assign a status.
///
/// **Critical Properties:**
/// - Knows nothing about the engine or how the code was run
/// - Pure function: (execution result, test case) → outcome
///
/// **Status Priority:**
/// 1. Timeout → `TimeLimitExceeded`
/// 2. Syntax error → `CompileError`
/// 3. Any other failure → `RuntimeError`
/// 4. Canonical output comparison → `Passed` / `WrongAnswer`
///
/// **Comparison Rules:**
/// - Object key order: ignored
/// - `2.0` vs `2`: equal
/// - Array order: significant
/// - Absent output compares as `null`
use codequest_common::{values_equal, ErrorKind, ExecutionResult, TestCase, TestOutcome, TestStatus};
use serde_json::Value;

/// Evaluate a single execution result
pub fn evaluate_test(result: &ExecutionResult, test_case: &TestCase) -> TestOutcome {
    let status = if !result.success {
        match result.error_kind {
            Some(ErrorKind::Timeout) => TestStatus::TimeLimitExceeded,
            Some(ErrorKind::Syntax) => TestStatus::CompileError,
            _ => TestStatus::RuntimeError,
        }
    } else {
        let actual = result.output.as_ref().unwrap_or(&Value::Null);
        if values_equal(actual, &test_case.expected_output) {
            TestStatus::Passed
        } else {
            TestStatus::WrongAnswer
        }
    };

    TestOutcome {
        passed: status == TestStatus::Passed,
        status,
        input: test_case.input.clone(),
        expected: test_case.expected_output.clone(),
        actual: result.output.clone(),
        error: result.error.clone(),
        error_kind: result.error_kind,
        logs: result.logs.clone(),
        description: test_case.description.clone(),
    }
}

/// Pair results with their test cases, preserving order
pub fn evaluate(test_cases: &[TestCase], results: &[ExecutionResult]) -> Vec<TestOutcome> {
    test_cases
        .iter()
        .zip(results)
        .map(|(case, result)| evaluate_test(result, case))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_passed_on_canonical_match() {
        let case = TestCase::new(json!(1), json!({"a": 1, "b": 2.0}));
        let result = ExecutionResult::success(Some(json!({"b": 2, "a": 1})), vec![]);
        let outcome = evaluate_test(&result, &case);
        assert!(outcome.passed);
        assert_eq!(outcome.status, TestStatus::Passed);
        assert_eq!(outcome.actual, Some(json!({"b": 2, "a": 1})));
    }

    #[test]
    fn test_wrong_answer() {
        let case = TestCase::new(json!(1), json!([1, 2]));
        let result = ExecutionResult::success(Some(json!([2, 1])), vec![]);
        let outcome = evaluate_test(&result, &case);
        assert!(!outcome.passed);
        assert_eq!(outcome.status, TestStatus::WrongAnswer);
    }

    #[test]
    fn test_absent_output_matches_null() {
        let case = TestCase::new(json!(1), Value::Null);
        let result = ExecutionResult::success(None, vec![]);
        assert!(evaluate_test(&result, &case).passed);
    }

    #[test]
    fn test_failure_never_passes() {
        let case = TestCase::new(json!(1), Value::Null);
        let result = ExecutionResult::failure(ErrorKind::Runtime, "bad", vec!["log".into()]);
        let outcome = evaluate_test(&result, &case);
        assert!(!outcome.passed);
        assert_eq!(outcome.status, TestStatus::RuntimeError);
        assert_eq!(outcome.error.as_deref(), Some("bad"));
        assert_eq!(outcome.actual, None);
        assert_eq!(outcome.logs, vec!["log".to_string()]);
    }

    #[test]
    fn test_status_priority() {
        let case = TestCase::new(json!(0), json!(0));
        let timeout = ExecutionResult::failure(ErrorKind::Timeout, "execution timed out", vec![]);
        let syntax = ExecutionResult::failure(ErrorKind::Syntax, "Syntax error: x", vec![]);
        let limit = ExecutionResult::failure(ErrorKind::ResourceLimit, "too deep", vec![]);
        assert_eq!(evaluate_test(&timeout, &case).status, TestStatus::TimeLimitExceeded);
        assert_eq!(evaluate_test(&syntax, &case).status, TestStatus::CompileError);
        assert_eq!(evaluate_test(&limit, &case).status, TestStatus::RuntimeError);
        assert_eq!(evaluate_test(&limit, &case).error_kind, Some(ErrorKind::ResourceLimit));
    }

    #[test]
    fn test_description_is_copied() {
        let case = TestCase::new(json!(3), json!(6)).with_description("doubles three");
        let result = ExecutionResult::success(Some(json!(6)), vec![]);
        let outcome = evaluate_test(&result, &case);
        assert_eq!(outcome.description.as_deref(), Some("doubles three"));
    }

    #[test]
    fn test_evaluate_preserves_order() {
        let cases = vec![TestCase::new(json!(1), json!(2)), TestCase::new(json!(2), json!(5))];
        let results = vec![
            ExecutionResult::success(Some(json!(2)), vec![]),
            ExecutionResult::success(Some(json!(4)), vec![]),
        ];
        let outcomes = evaluate(&cases, &results);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].passed);
        assert!(!outcomes[1].passed);
        assert_eq!(outcomes[1].input, json!(2));
    }
}
