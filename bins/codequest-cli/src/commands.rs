// CLI commands for running submissions locally
use anyhow::{bail, Context, Result};
use codequest_common::{GradingReport, TestCase, TestStatus};
use codequest_sandbox::{executor, resolve_entry_point, Resolution, Sandbox, SandboxConfig};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

/// A challenge content file, or just its test list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ChallengeFile {
    Content(ChallengeContent),
    Tests(Vec<TestCase>),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeContent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub solution: Option<String>,
    pub tests: Vec<TestCase>,
}

impl ChallengeFile {
    fn into_parts(self) -> (Option<String>, Option<String>, Vec<TestCase>) {
        match self {
            ChallengeFile::Content(content) => (content.id, content.solution, content.tests),
            ChallengeFile::Tests(tests) => (None, None, tests),
        }
    }
}

fn config_path_label(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| codequest_sandbox::config::DEFAULT_CONFIG_PATH.to_string())
}

fn load_sandbox(config_path: Option<&Path>) -> Result<Sandbox> {
    let config = SandboxConfig::load_from(config_path)?;
    debug!(
        path = %config_path_label(config_path),
        max_operations = config.max_operations,
        timeout_ms = config.execution_timeout.as_millis() as u64,
        "Sandbox config loaded"
    );
    Ok(Sandbox::new(config))
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read source file {:?}", path))
}

pub fn load_challenge(path: &Path) -> Result<ChallengeFile> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read challenge file {:?}", path))?;
    let challenge: ChallengeFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse challenge file {:?}", path))?;

    let test_count = match &challenge {
        ChallengeFile::Content(content) => content.tests.len(),
        ChallengeFile::Tests(tests) => tests.len(),
    };
    debug!(path = %path.display(), tests = test_count, "Challenge loaded");
    Ok(challenge)
}

/// `run`: execute once and print the ExecutionResult as JSON
pub fn run(config: Option<&Path>, file: &Path, input: Option<&str>) -> Result<()> {
    let sandbox = load_sandbox(config)?;
    let source = read_source(file)?;
    let input: Option<Value> = input
        .map(serde_json::from_str::<Value>)
        .transpose()
        .context("Input is not valid JSON")?;

    let result = sandbox.execute(&source, input.as_ref());
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// `test`: grade a submission against a challenge; returns whether every test passed
pub fn test(config: Option<&Path>, file: Option<&Path>, challenge: &Path) -> Result<bool> {
    let sandbox = load_sandbox(config)?;
    let (id, solution, tests) = load_challenge(challenge)?.into_parts();

    let source = match (file, solution) {
        (Some(path), _) => read_source(path)?,
        (None, Some(solution)) => solution,
        (None, None) => bail!("No --file given and the challenge has no solution to run"),
    };

    if let Some(id) = &id {
        println!("→ Challenge: {}", id);
    }
    println!("→ Running {} test(s)", tests.len());
    println!();

    let report = executor::grade_submission(&sandbox, Uuid::new_v4(), &source, &tests);
    print_summary(&report);
    println!();
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(report.all_passed())
}

fn print_summary(report: &GradingReport) {
    for (idx, outcome) in report.outcomes.iter().enumerate() {
        let label = outcome
            .description
            .clone()
            .unwrap_or_else(|| format!("input {}", outcome.input));
        match outcome.status {
            TestStatus::Passed => println!("  ✓ Test {} ({})", idx + 1, label),
            TestStatus::WrongAnswer => {
                println!("  ✗ Test {} ({}) → wrong answer", idx + 1, label);
                println!("    Expected: {}", outcome.expected);
                match &outcome.actual {
                    Some(actual) => println!("    Got:      {}", actual),
                    None => println!("    Got:      (no value)"),
                }
            }
            status => println!(
                "  ✗ Test {} ({}) → {}: {}",
                idx + 1,
                label,
                status.as_str(),
                outcome.error.as_deref().unwrap_or("")
            ),
        }
    }
    println!();
    println!(
        "  Score: {} / {} ({:?})",
        report.passed_count, report.total_count, report.verdict
    );
}

/// `entry`: print the resolved entry point as JSON
pub fn entry(file: &Path) -> Result<()> {
    let source = read_source(file)?;
    let resolution = resolve_entry_point(&source);
    if resolution == Resolution::NotFound {
        println!("→ No function declared; the script would run for side effects only");
    }
    println!("{}", serde_json::to_string_pretty(&resolution)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_challenge_content() {
        let file = write_temp(
            r#"{
                "id": "double-it",
                "prompt": "Double the number",
                "solution": "fn main(n) { n * 2 }",
                "tests": [{ "input": 2, "expectedOutput": 4, "description": "two" }]
            }"#,
        );
        let (id, solution, tests) = load_challenge(file.path()).unwrap().into_parts();
        assert_eq!(id.as_deref(), Some("double-it"));
        assert!(solution.is_some());
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].description.as_deref(), Some("two"));
    }

    #[test]
    fn test_load_bare_test_array() {
        let file = write_temp(r#"[{ "input": 1, "expectedOutput": 1 }]"#);
        let (id, solution, tests) = load_challenge(file.path()).unwrap().into_parts();
        assert!(id.is_none());
        assert!(solution.is_none());
        assert_eq!(tests.len(), 1);
    }

    #[test]
    fn test_challenge_solution_is_graded() {
        let challenge = write_temp(
            r#"{ "solution": "fn main(n) { n * 2 }", "tests": [{ "input": 3, "expectedOutput": 6 }] }"#,
        );
        assert!(test(None, None, challenge.path()).unwrap());
    }

    #[test]
    fn test_failing_submission_reports_false() {
        let challenge = write_temp(r#"[{ "input": 3, "expectedOutput": 6 }]"#);
        let source = write_temp("fn main(n) { n + 1 }");
        assert!(!test(None, Some(source.path()), challenge.path()).unwrap());
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let challenge = write_temp(r#"[{ "input": 3, "expectedOutput": 6 }]"#);
        assert!(test(None, None, challenge.path()).is_err());
    }

    #[test]
    fn test_invalid_input_json() {
        let source = write_temp("fn main(n) { n }");
        assert!(run(None, source.path(), Some("{not json")).is_err());
    }
}
