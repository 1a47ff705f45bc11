//! Shared interchange types for the CodeQuest sandbox.
//!
//! Everything that crosses a crate or process boundary lives here so the
//! sandbox, the HTTP API and the CLI never drift apart.

pub mod canonical;
pub mod grading;
pub mod types;

pub use canonical::{canonical_json, values_equal};
pub use grading::{grade, FailureSummary, GradingReport, Verdict};
pub use types::{ErrorKind, ExecutionResult, TestCase, TestOutcome, TestStatus};
