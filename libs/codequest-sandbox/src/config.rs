// Sandbox configuration: resource limits and the denied-capability list
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Default location, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/sandbox.json";

/// Limits applied to every sandbox execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Largest accepted source text, in bytes
    #[serde(default = "default_max_source_bytes")]
    pub max_source_bytes: usize,

    /// Largest accepted test input, in bytes of compact JSON
    #[serde(default = "default_max_input_bytes")]
    pub max_input_bytes: usize,

    /// Operation budget per execution
    #[serde(default = "default_max_operations")]
    pub max_operations: u64,

    /// Maximum function call nesting depth
    #[serde(default = "default_max_call_levels")]
    pub max_call_levels: usize,

    #[serde(default = "default_max_expr_depth")]
    pub max_expr_depth: usize,

    #[serde(default = "default_max_function_expr_depth")]
    pub max_function_expr_depth: usize,

    /// Maximum string length in characters
    #[serde(default = "default_max_string_size")]
    pub max_string_size: usize,

    #[serde(default = "default_max_array_size")]
    pub max_array_size: usize,

    #[serde(default = "default_max_map_size")]
    pub max_map_size: usize,

    /// Wall-clock deadline per execution
    #[serde(
        default = "default_execution_timeout",
        deserialize_with = "deserialize_duration_from_millis",
        serialize_with = "serialize_duration_as_millis"
    )]
    pub execution_timeout: Duration,

    /// Host names shadowed by an unusable value in every execution
    #[serde(default = "default_denied_globals")]
    pub denied_globals: Vec<String>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            max_source_bytes: default_max_source_bytes(),
            max_input_bytes: default_max_input_bytes(),
            max_operations: default_max_operations(),
            max_call_levels: default_max_call_levels(),
            max_expr_depth: default_max_expr_depth(),
            max_function_expr_depth: default_max_function_expr_depth(),
            max_string_size: default_max_string_size(),
            max_array_size: default_max_array_size(),
            max_map_size: default_max_map_size(),
            execution_timeout: default_execution_timeout(),
            denied_globals: default_denied_globals(),
        }
    }
}

fn default_max_source_bytes() -> usize {
    64 * 1024
}

fn default_max_input_bytes() -> usize {
    1024 * 1024
}

fn default_max_operations() -> u64 {
    5_000_000
}

fn default_max_call_levels() -> usize {
    64
}

fn default_max_expr_depth() -> usize {
    64
}

fn default_max_function_expr_depth() -> usize {
    32
}

fn default_max_string_size() -> usize {
    64 * 1024
}

fn default_max_array_size() -> usize {
    10_000
}

fn default_max_map_size() -> usize {
    10_000
}

fn default_execution_timeout() -> Duration {
    Duration::from_millis(2_000)
}

fn default_denied_globals() -> Vec<String> {
    [
        "fetch",
        "XMLHttpRequest",
        "WebSocket",
        "setTimeout",
        "setInterval",
        "setImmediate",
        "Function",
        "require",
        "process",
        "globalThis",
        "window",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn deserialize_duration_from_millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let millis = u64::deserialize(deserializer)?;
    Ok(Duration::from_millis(millis))
}

fn serialize_duration_as_millis<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(duration.as_millis() as u64)
}

impl SandboxConfig {
    /// Load configuration from a JSON file
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!("Sandbox config file not found: {}", config_path.display());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: SandboxConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from `config/sandbox.json`, falling back to built-in defaults
    /// when the file does not exist
    pub fn load_default() -> Result<Self> {
        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        if !default_path.exists() {
            debug!(path = DEFAULT_CONFIG_PATH, "No sandbox config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(default_path)
    }

    /// Load from an explicit path when given, otherwise the default location
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::load_default(),
        }
    }

    /// Reject limits that would make every execution fail
    pub fn validate(&self) -> Result<()> {
        let limits = [
            ("max_source_bytes", self.max_source_bytes as u64),
            ("max_input_bytes", self.max_input_bytes as u64),
            ("max_operations", self.max_operations),
            ("max_call_levels", self.max_call_levels as u64),
            ("max_expr_depth", self.max_expr_depth as u64),
            ("max_function_expr_depth", self.max_function_expr_depth as u64),
            ("max_string_size", self.max_string_size as u64),
            ("max_array_size", self.max_array_size as u64),
            ("max_map_size", self.max_map_size as u64),
            ("execution_timeout", self.execution_timeout.as_millis() as u64),
        ];
        for (name, value) in limits {
            if value == 0 {
                bail!("Sandbox limit '{}' must be greater than zero", name);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = SandboxConfig::default();
        assert_eq!(config.max_operations, 5_000_000);
        assert_eq!(config.max_call_levels, 64);
        assert_eq!(config.execution_timeout, Duration::from_millis(2_000));
        assert!(config.denied_globals.iter().any(|g| g == "fetch"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "max_operations": 1000, "execution_timeout": 250 }"#;
        let config: SandboxConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.max_operations, 1000);
        assert_eq!(config.execution_timeout, Duration::from_millis(250));
        assert_eq!(config.max_call_levels, default_max_call_levels());
        assert_eq!(config.denied_globals, default_denied_globals());
    }

    #[test]
    fn test_timeout_round_trips_as_millis() {
        let config = SandboxConfig::default();
        let encoded = serde_json::to_value(&config).unwrap();
        assert_eq!(encoded["execution_timeout"], 2000);
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let config = SandboxConfig {
            max_operations: 0,
            ..SandboxConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_operations"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "max_array_size": 42, "denied_globals": ["fetch"] }}"#).unwrap();

        let config = SandboxConfig::load(file.path()).unwrap();
        assert_eq!(config.max_array_size, 42);
        assert_eq!(config.denied_globals, vec!["fetch".to_string()]);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = SandboxConfig::load(Path::new("/nonexistent/sandbox.json"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_invalid_json_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(SandboxConfig::load(file.path()).is_err());
    }
}
