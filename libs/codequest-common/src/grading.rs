/// Grading Aggregator
///
/// Folds ordered test outcomes into an overall verdict. This is the input
/// contract of the submission collaborator: it needs nothing beyond the
/// outcome list to decide pass/fail, and the failure summaries it forwards to
/// tutoring feedback never carry the learner's source.
use crate::types::TestOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Fail,
}

/// Logical AND over `passed` flags
///
/// An empty outcome list passes, matching `every()` on an empty array.
pub fn grade(outcomes: &[TestOutcome]) -> Verdict {
    if outcomes.iter().all(|o| o.passed) {
        Verdict::Pass
    } else {
        Verdict::Fail
    }
}

/// A failing test, shaped for the tutoring-feedback collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureSummary {
    /// 1-based position, for "Test N failed" messages
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input: Value,
    pub expected: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingReport {
    pub submission_id: Uuid,
    pub verdict: Verdict,
    pub passed_count: usize,
    pub total_count: usize,
    pub outcomes: Vec<TestOutcome>,
    pub graded_at: DateTime<Utc>,
}

impl GradingReport {
    pub fn new(submission_id: Uuid, outcomes: Vec<TestOutcome>) -> Self {
        let verdict = grade(&outcomes);
        let passed_count = outcomes.iter().filter(|o| o.passed).count();
        Self {
            submission_id,
            verdict,
            passed_count,
            total_count: outcomes.len(),
            outcomes,
            graded_at: Utc::now(),
        }
    }

    pub fn all_passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }

    pub fn failures(&self) -> Vec<FailureSummary> {
        self.outcomes
            .iter()
            .enumerate()
            .filter(|(_, o)| !o.passed)
            .map(|(idx, o)| FailureSummary {
                index: idx + 1,
                description: o.description.clone(),
                input: o.input.clone(),
                expected: o.expected.clone(),
                actual: o.actual.clone(),
                error: o.error.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TestStatus;
    use serde_json::json;

    fn outcome(passed: bool, input: Value) -> TestOutcome {
        TestOutcome {
            passed,
            status: if passed {
                TestStatus::Passed
            } else {
                TestStatus::WrongAnswer
            },
            input,
            expected: json!(0),
            actual: Some(json!(1)),
            error: None,
            error_kind: None,
            logs: vec![],
            description: None,
        }
    }

    #[test]
    fn test_grade_all_pass() {
        let outcomes = vec![outcome(true, json!(1)), outcome(true, json!(2))];
        assert_eq!(grade(&outcomes), Verdict::Pass);
    }

    #[test]
    fn test_grade_any_failure_fails() {
        let outcomes = vec![outcome(true, json!(1)), outcome(false, json!(2))];
        assert_eq!(grade(&outcomes), Verdict::Fail);
    }

    #[test]
    fn test_grade_empty_passes() {
        assert_eq!(grade(&[]), Verdict::Pass);
    }

    #[test]
    fn test_report_counts_and_failures() {
        let id = Uuid::new_v4();
        let report = GradingReport::new(
            id,
            vec![
                outcome(true, json!(1)),
                outcome(false, json!(2)),
                outcome(false, json!(3)),
            ],
        );

        assert_eq!(report.submission_id, id);
        assert_eq!(report.verdict, Verdict::Fail);
        assert!(!report.all_passed());
        assert_eq!(report.passed_count, 1);
        assert_eq!(report.total_count, 3);

        let failures = report.failures();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].index, 2);
        assert_eq!(failures[0].input, json!(2));
        assert_eq!(failures[1].index, 3);
    }

    #[test]
    fn test_verdict_wire_format() {
        assert_eq!(serde_json::to_value(Verdict::Pass).unwrap(), json!("pass"));
    }
}
