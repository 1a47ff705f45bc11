//! Untrusted learner-code execution for CodeQuest.
//!
//! Learner submissions are Rhai scripts. Each execution gets a freshly built
//! engine with an allow-listed standard library, shadowed host capabilities,
//! a captured console and hard operation/time budgets. Nothing here ever
//! returns an error to the caller: every failure becomes data.

pub mod config;
pub mod convert;
pub mod engine;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod resolver;


pub use config::SandboxConfig;
pub use engine::Sandbox;
pub use error::SandboxError;
pub use executor::{grade_submission, run_tests};
pub use resolver::{resolve_entry_point, EntryPoint, Resolution};
