/// Execution Sandbox - runs one submission against one input
///
/// **Core Responsibility:**
/// Compile and run learner source, optionally invoke the resolved entry
/// point with one input, and capture output, error and logs.
///
/// **Critical Architectural Boundary:**
/// - Knows HOW to execute (fresh Rhai environment, limits, capture)
/// - Does NOT know scoring rules or expected outputs
/// - Never returns an error: every failure becomes an `ExecutionResult`
///
/// **Safety Guarantees:**
/// - Input validation: oversized source or input is rejected before compiling
/// - Fresh environment per call: no state survives between executions
/// - Input by value: the script receives a copy rebuilt from JSON
/// - Hard budgets: operation count and wall-clock deadline abort runaway code
/// - Panic containment: a panic inside the engine is reported, not propagated
use crate::config::SandboxConfig;
use crate::convert::{json_to_dynamic, output_from_dynamic};
use crate::environment::Environment;
use crate::error::SandboxError;
use crate::resolver::{resolve_entry_point, EntryPoint, Resolution};
use codequest_common::ExecutionResult;
use rhai::{CallFnOptions, Dynamic, Scope};
use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct Sandbox {
    config: Arc<SandboxConfig>,
}

impl Sandbox {
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Run a submission once, resolving its entry point first
    pub fn execute(&self, source: &str, input: Option<&Value>) -> ExecutionResult {
        let resolution = resolve_entry_point(source);
        self.execute_resolved(source, &resolution, input)
    }

    /// Run a submission with an already resolved entry point
    ///
    /// The Test Runner resolves once per submission so every test case
    /// invokes the same function.
    pub fn execute_resolved(
        &self,
        source: &str,
        resolution: &Resolution,
        input: Option<&Value>,
    ) -> ExecutionResult {
        let start = Instant::now();

        // GUARDRAIL: validate sizes before any parsing
        if source.len() > self.config.max_source_bytes {
            return SandboxError::SourceTooLarge {
                limit: self.config.max_source_bytes,
            }
            .into_result(Vec::new());
        }
        if let Some(value) = input {
            let size = serde_json::to_string(value).map(|s| s.len()).unwrap_or(usize::MAX);
            if size > self.config.max_input_bytes {
                return SandboxError::InputTooLarge {
                    limit: self.config.max_input_bytes,
                }
                .into_result(Vec::new());
            }
        }

        let env = Environment::new(&self.config);
        let logs = env.logs.clone();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            run_in_environment(&env, source, resolution, input)
        }))
        .unwrap_or_else(|_| Err(SandboxError::Internal));

        let elapsed_ms = start.elapsed().as_millis() as u64;
        let logs = logs.snapshot();

        match outcome {
            Ok(output) => {
                debug!(
                    execution_ms = elapsed_ms,
                    log_lines = logs.len(),
                    has_output = output.is_some(),
                    "Sandbox execution succeeded"
                );
                ExecutionResult::success(output, logs)
            }
            Err(err) => {
                match err {
                    SandboxError::TimedOut => warn!(
                        execution_ms = elapsed_ms,
                        timeout_ms = self.config.execution_timeout.as_millis() as u64,
                        "Sandbox execution timed out"
                    ),
                    SandboxError::Internal => warn!("Sandbox engine panicked"),
                    ref other => debug!(
                        execution_ms = elapsed_ms,
                        kind = %other.kind(),
                        "Sandbox execution failed"
                    ),
                }
                err.into_result(logs)
            }
        }
    }
}

/// Compile, run top-level statements, then invoke the entry point if any
fn run_in_environment(
    env: &Environment,
    source: &str,
    resolution: &Resolution,
    input: Option<&Value>,
) -> Result<Option<Value>, SandboxError> {
    let ast = env.engine.compile(source)?;
    let mut scope = Scope::new();

    let entry = match resolution {
        Resolution::Found(entry) => entry,
        Resolution::NotFound => {
            env.engine.run_ast_with_scope(&mut scope, &ast)?;
            return Ok(None);
        }
    };

    let args = invocation_args(entry, input);
    let options = CallFnOptions::new().eval_ast(true);
    let returned: Dynamic = env
        .engine
        .call_fn_with_options(options, &mut scope, &ast, &entry.name, args)?;

    output_from_dynamic(&returned)
        .map_err(|e| SandboxError::Runtime(e.for_script(&env.engine).to_string()))
}

/// Arguments for the entry point: the input first, `()` for any further
/// parameters, nothing at all for a zero-parameter function
fn invocation_args(entry: &EntryPoint, input: Option<&Value>) -> Vec<Dynamic> {
    if entry.arity == 0 {
        return Vec::new();
    }
    let mut args = Vec::with_capacity(entry.arity);
    args.push(input.map(json_to_dynamic).unwrap_or(Dynamic::UNIT));
    args.resize(entry.arity, Dynamic::UNIT);
    args
}
