//! Error types for turn orchestration.

use engram_graph::Transient;
use thiserror::Error;

/// Result type alias using the agent error type.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Error type for turn orchestration.
#[derive(Debug, Error)]
pub enum AgentError {
    /// A collaborator call failed at the transport level.
    #[error("collaborator error: {0}")]
    Collaborator(String),

    /// A collaborator answered with output that violates its contract.
    /// Retrying will not fix a malformed payload.
    #[error("collaborator contract violation: {0}")]
    Contract(String),

    /// Graph store error.
    #[error("graph error: {0}")]
    Graph(#[from] engram_graph::GraphError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The turn was cancelled before completing.
    #[error("turn cancelled")]
    Cancelled,
}

impl AgentError {
    /// Create a collaborator transport error.
    pub fn collaborator(msg: impl Into<String>) -> Self {
        Self::Collaborator(msg.into())
    }

    /// Create a contract-violation error.
    pub fn contract(msg: impl Into<String>) -> Self {
        Self::Contract(msg.into())
    }
}

impl Transient for AgentError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Collaborator(_) => true,
            Self::Graph(e) => e.is_transient(),
            Self::Contract(_) | Self::Serialization(_) | Self::Cancelled => false,
        }
    }
}
