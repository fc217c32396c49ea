//! Configuration system for the Engram journaling graph agent.
//!
//! TOML-based configuration with environment-variable overrides:
//! ```toml
//! [graph]          # graph store endpoint and client retry policy
//! [retry]          # generic pipeline retry executor
//! [core_entities]  # heavy-node index tunables
//! [consistency]    # duplicate-detection tunables
//! [context]        # conversational memory bounds
//! ```
//!
//! Every tunable carries a default, so an absent file yields a working
//! configuration pointed at `http://localhost:8080/api/mcp/`.

pub mod error;
pub mod types;

use std::path::Path;

pub use error::{ConfigError, Result};
pub use types::{
    ConsistencyConfig, ContextConfig, CoreEntityConfig, EngramConfig, GraphConfig, RetryConfig,
};

/// Environment variable prefix for overrides.
const ENV_PREFIX: &str = "ENGRAM_";

/// Load configuration from a TOML file, then apply environment overrides.
pub fn load_config_file(path: impl AsRef<Path>) -> Result<EngramConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    let mut config: EngramConfig = toml::from_str(&content)?;
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Default configuration with environment overrides applied.
pub fn load_config() -> EngramConfig {
    let mut config = EngramConfig::default();
    apply_env_overrides(&mut config);
    config
}

fn apply_env_overrides(config: &mut EngramConfig) {
    if let Some(url) = env_var("GRAPH_URL") {
        config.graph.url = url;
    }
    if let Some(timeout) = env_var("GRAPH_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        config.graph.timeout_secs = timeout;
    }
    if let Some(retries) = env_var("GRAPH_MAX_RETRIES").and_then(|v| v.parse().ok()) {
        config.graph.max_retries = retries;
    }
    if let Some(retries) = env_var("RETRY_MAX_RETRIES").and_then(|v| v.parse().ok()) {
        config.retry.max_retries = retries;
    }
    if let Some(threshold) = env_var("CORE_WEIGHT_THRESHOLD").and_then(|v| v.parse().ok()) {
        config.core_entities.weight_threshold = threshold;
    }
    if let Some(cap) = env_var("CONTEXT_FINDINGS_CAP").and_then(|v| v.parse().ok()) {
        config.context.findings_cap = cap;
    }
}

fn env_var(suffix: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{suffix}")).ok()
}
