use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::Validate;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Engine configuration with validation
#[derive(Clone, Debug, PartialEq, Eq, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Deepest navigable path implicit fetch construction may reach
    #[validate(range(
        min = 1,
        max = 64,
        message = "Max fetch depth must be between 1 and 64"
    ))]
    pub max_fetch_depth: usize,

    /// Whether explicit builders may address columns by position
    pub allow_positional_selections: bool,

    /// Whether resolved plans are cached
    pub plan_cache_enabled: bool,

    #[validate(range(
        min = 1,
        max = 1_000_000,
        message = "Plan cache size must be between 1 and 1000000"
    ))]
    pub plan_cache_max_entries: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_fetch_depth: 16,
            allow_positional_selections: true,
            plan_cache_enabled: true,
            plan_cache_max_entries: 256,
        }
    }
}

impl EngineConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            max_fetch_depth: parse_env_var("RESULTGRAPH_MAX_FETCH_DEPTH", "16")?,
            allow_positional_selections: parse_env_var(
                "RESULTGRAPH_ALLOW_POSITIONAL_SELECTIONS",
                "true",
            )?,
            plan_cache_enabled: parse_env_var("RESULTGRAPH_PLAN_CACHE_ENABLED", "true")?,
            plan_cache_max_entries: parse_env_var("RESULTGRAPH_PLAN_CACHE_MAX_ENTRIES", "256")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file. Missing keys take their defaults.
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }
}

/// Parse an environment variable with a default value. An unset variable
/// takes the default; a value that is not valid unicode is an error.
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = match env::var(key) {
        Ok(value) => value,
        Err(env::VarError::NotPresent) => default.to_string(),
        Err(e) => return Err(ConfigError::EnvVar(e)),
    };
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
