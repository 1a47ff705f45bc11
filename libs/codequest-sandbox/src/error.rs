use codequest_common::{ErrorKind, ExecutionResult};
use rhai::{EvalAltResult, ParseError};
use thiserror::Error;

/// Everything that can stop a sandbox execution.
///
/// These never escape the crate as `Err`: [`SandboxError::into_result`]
/// turns each one into a failed [`ExecutionResult`] at the sandbox boundary.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SandboxError {
    #[error("source code exceeds maximum size of {limit} bytes")]
    SourceTooLarge { limit: usize },

    #[error("test input exceeds maximum size of {limit} bytes")]
    InputTooLarge { limit: usize },

    #[error("Syntax error: {0}")]
    Syntax(String),

    /// Thrown by learner code or raised by the runtime; shown verbatim
    #[error("{0}")]
    Runtime(String),

    #[error("execution timed out")]
    TimedOut,

    #[error("resource limit exceeded: {0}")]
    ResourceLimit(String),

    #[error("internal sandbox failure")]
    Internal,
}

impl SandboxError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SandboxError::SourceTooLarge { .. } | SandboxError::InputTooLarge { .. } => {
                ErrorKind::InvalidInput
            }
            SandboxError::Syntax(_) => ErrorKind::Syntax,
            SandboxError::Runtime(_) => ErrorKind::Runtime,
            SandboxError::TimedOut => ErrorKind::Timeout,
            SandboxError::ResourceLimit(_) => ErrorKind::ResourceLimit,
            SandboxError::Internal => ErrorKind::Internal,
        }
    }

    pub fn into_result(self, logs: Vec<String>) -> ExecutionResult {
        ExecutionResult::failure(self.kind(), self.to_string(), logs)
    }
}

impl From<ParseError> for SandboxError {
    fn from(err: ParseError) -> Self {
        SandboxError::Syntax(err.to_string())
    }
}

impl From<Box<EvalAltResult>> for SandboxError {
    fn from(err: Box<EvalAltResult>) -> Self {
        classify(*err)
    }
}

/// Map a Rhai error onto the sandbox taxonomy.
///
/// Errors raised inside script functions arrive wrapped once per call
/// frame; the innermost error is the one the learner caused.
fn classify(err: EvalAltResult) -> SandboxError {
    match err {
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _)
        | EvalAltResult::ErrorInModule(_, inner, _) => classify(*inner),
        EvalAltResult::ErrorRuntime(value, _) => SandboxError::Runtime(thrown_message(&value)),
        EvalAltResult::ErrorParsing(parse_err, pos) => {
            SandboxError::Syntax(format!("{} ({})", parse_err, pos))
        }
        EvalAltResult::ErrorTooManyOperations(_) | EvalAltResult::ErrorTerminated(_, _) => {
            SandboxError::TimedOut
        }
        EvalAltResult::ErrorStackOverflow(_) => {
            SandboxError::ResourceLimit("maximum call depth reached".to_string())
        }
        EvalAltResult::ErrorDataTooLarge(what, _) => {
            SandboxError::ResourceLimit(format!("{} is too large", what))
        }
        EvalAltResult::ErrorTooManyModules(_) => {
            SandboxError::ResourceLimit("too many modules".to_string())
        }
        other => SandboxError::Runtime(other.to_string()),
    }
}

/// Message for a thrown value: strings as-is, `#{ message: .. }` objects by
/// their message, anything else by its display form
fn thrown_message(value: &rhai::Dynamic) -> String {
    if let Some(text) = value.read_lock::<rhai::ImmutableString>() {
        return text.to_string();
    }
    if let Some(map) = value.read_lock::<rhai::Map>() {
        if let Some(message) = map.get("message") {
            return message.to_string();
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhai::{Dynamic, Map, Position};

    #[test]
    fn test_thrown_string_is_verbatim() {
        let err: Box<EvalAltResult> = "bad".into();
        assert_eq!(SandboxError::from(err), SandboxError::Runtime("bad".into()));
    }

    #[test]
    fn test_thrown_map_uses_message_field() {
        let mut map = Map::new();
        map.insert("message".into(), "boom".into());
        let err = Box::new(EvalAltResult::ErrorRuntime(Dynamic::from_map(map), Position::NONE));
        assert_eq!(SandboxError::from(err).to_string(), "boom");
    }

    #[test]
    fn test_nested_function_errors_are_unwrapped() {
        let inner: Box<EvalAltResult> = "deep".into();
        let wrapped = Box::new(EvalAltResult::ErrorInFunctionCall(
            "main".into(),
            String::new(),
            Box::new(EvalAltResult::ErrorInFunctionCall(
                "helper".into(),
                String::new(),
                inner,
                Position::NONE,
            )),
            Position::NONE,
        ));
        assert_eq!(SandboxError::from(wrapped), SandboxError::Runtime("deep".into()));
    }

    #[test]
    fn test_operation_budget_is_timeout() {
        let err = Box::new(EvalAltResult::ErrorTooManyOperations(Position::NONE));
        let classified = SandboxError::from(err);
        assert_eq!(classified, SandboxError::TimedOut);
        assert_eq!(classified.kind(), ErrorKind::Timeout);
        assert_eq!(classified.to_string(), "execution timed out");
    }

    #[test]
    fn test_into_result_keeps_logs() {
        let result = SandboxError::Syntax("oops".into()).into_result(vec!["a".into()]);
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Syntax error: oops"));
        assert_eq!(result.error_kind, Some(ErrorKind::Syntax));
        assert_eq!(result.logs, vec!["a".to_string()]);
        assert!(result.output.is_none());
    }
}
