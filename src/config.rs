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

/// Translation engine configuration with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Try URI-pattern bridges before URI-column bridges and skip redundant
    /// column lookups
    pub use_all_optimizations: bool,

    /// Upper bound on bridge combinations considered for one pattern
    #[validate(range(
        min = 1,
        max = 1_000_000,
        message = "Max combinations must be between 1 and 1000000"
    ))]
    pub max_combinations: usize,

    /// Serve several node relations with one SQL statement when their base
    /// relations agree
    pub group_compatible_relations: bool,

    /// Drop duplicate triples from find results
    pub deduplicate_find_results: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            use_all_optimizations: true,
            max_combinations: 10_000,
            group_compatible_relations: true,
            deduplicate_find_results: true,
        }
    }
}

impl EngineConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            use_all_optimizations: parse_env_var("RELGRAPH_USE_ALL_OPTIMIZATIONS", "true")?,
            max_combinations: parse_env_var("RELGRAPH_MAX_COMBINATIONS", "10000")?,
            group_compatible_relations: parse_env_var("RELGRAPH_GROUP_RELATIONS", "true")?,
            deduplicate_find_results: parse_env_var("RELGRAPH_DEDUPLICATE_RESULTS", "true")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
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

/// Configuration for the result cache
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultCacheConfig {
    /// Enable or disable caching
    pub enabled: bool,
    /// Maximum number of cached find results (LRU eviction)
    #[validate(range(min = 1, message = "Cache must hold at least one find result"))]
    pub max_find_entries: usize,
    /// Maximum number of cached contains results (LRU eviction)
    #[validate(range(min = 1, message = "Cache must hold at least one contains result"))]
    pub max_exists_entries: usize,
    /// Budget for the estimated size of all cached find results
    pub max_size_bytes: usize,
    pub uri_weight: usize,
    pub literal_weight: usize,
    pub blank_weight: usize,
}

impl Default for ResultCacheConfig {
    fn default() -> Self {
        ResultCacheConfig {
            enabled: true,
            max_find_entries: 1000,
            max_exists_entries: 10_000,
            max_size_bytes: 10 * 1024 * 1024, // 10 MB
            uri_weight: 1,
            literal_weight: 1,
            blank_weight: 1,
        }
    }
}

impl ResultCacheConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let max_size_mb: usize = parse_env_var("RELGRAPH_CACHE_MAX_SIZE_MB", "10")?;
        let config = ResultCacheConfig {
            enabled: parse_env_var("RELGRAPH_CACHE_ENABLED", "true")?,
            max_find_entries: parse_env_var("RELGRAPH_CACHE_MAX_FIND_ENTRIES", "1000")?,
            max_exists_entries: parse_env_var("RELGRAPH_CACHE_MAX_EXISTS_ENTRIES", "10000")?,
            max_size_bytes: max_size_mb * 1024 * 1024,
            uri_weight: parse_env_var("RELGRAPH_CACHE_URI_WEIGHT", "1")?,
            literal_weight: parse_env_var("RELGRAPH_CACHE_LITERAL_WEIGHT", "1")?,
            blank_weight: parse_env_var("RELGRAPH_CACHE_BLANK_WEIGHT", "1")?,
        };

        config.validate()?;
        Ok(config)
    }
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
