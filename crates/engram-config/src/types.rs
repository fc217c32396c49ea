//! Configuration types mapping to the TOML schema.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Root configuration structure.
///
/// All sections default, so a partial file (or no file at all) yields a
/// complete configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngramConfig {
    pub graph: GraphConfig,
    pub retry: RetryConfig,
    pub core_entities: CoreEntityConfig,
    pub consistency: ConsistencyConfig,
    pub context: ContextConfig,
}

impl EngramConfig {
    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.consistency.fuzzy_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "consistency.fuzzy_threshold".to_string(),
                reason: "must be between 0.0 and 1.0".to_string(),
            });
        }
        if self.context.findings_cap == 0 {
            return Err(ConfigError::InvalidValue {
                field: "context.findings_cap".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Graph store endpoint and client retry policy.
///
/// The client retry loop covers cold starts of the remote store (502/503/504
/// and connect/timeout failures) and is independent of the pipeline-level
/// [`RetryConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Graph store endpoint (JSON-RPC `tools/call` over HTTP POST).
    pub url: String,
    /// Total per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Retry attempts after the first failure.
    pub max_retries: u32,
    /// Initial backoff in milliseconds; doubles per attempt.
    pub initial_delay_ms: u64,
    /// Tool name for read-only statements.
    pub read_tool: String,
    /// Tool name for mutating statements.
    pub write_tool: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080/api/mcp/".to_string(),
            timeout_secs: 30,
            max_retries: 4,
            initial_delay_ms: 5_000,
            read_tool: "read_graph_cypher".to_string(),
            write_tool: "write_graph_cypher".to_string(),
        }
    }
}

/// Generic retry executor used around network-sensitive pipeline steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1_000,
        }
    }
}

/// Heavy-node index tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreEntityConfig {
    /// Minimum relationship count for a node to qualify as core.
    pub weight_threshold: u64,
    /// Maximum nodes returned per load.
    pub limit: u64,
    /// Labels included regardless of weight.
    pub pinned_labels: Vec<String>,
    /// Transient turn-artifact labels excluded from the index.
    pub excluded_labels: Vec<String>,
}

impl Default for CoreEntityConfig {
    fn default() -> Self {
        Self {
            weight_threshold: 3,
            limit: 200,
            pinned_labels: vec!["Person".to_string(), "Organization".to_string()],
            excluded_labels: vec![
                "JournalEntry".to_string(),
                "Alias".to_string(),
                "AuditLog".to_string(),
            ],
        }
    }
}

/// Duplicate-detection tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsistencyConfig {
    /// Candidate pairs examined per strategy per run.
    pub candidate_limit: u64,
    /// Store-side fuzzy string-similarity threshold for topology pairs.
    pub fuzzy_threshold: f64,
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            candidate_limit: 10,
            fuzzy_threshold: 0.8,
        }
    }
}

/// Conversational memory bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Maximum retrieved findings retained across turns (ring buffer).
    pub findings_cap: usize,
    /// Keep the last retrieval output for one extra turn when pruning.
    pub keep_retrieval_on_prune: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            findings_cap: 10,
            keep_retrieval_on_prune: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(EngramConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let mut config = EngramConfig::default();
        config.consistency.fuzzy_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_cap() {
        let mut config = EngramConfig::default();
        config.context.findings_cap = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_excluded_labels_cover_turn_artifacts() {
        let config = CoreEntityConfig::default();
        assert!(config.excluded_labels.contains(&"JournalEntry".to_string()));
        assert!(config.excluded_labels.contains(&"Alias".to_string()));
    }
}
