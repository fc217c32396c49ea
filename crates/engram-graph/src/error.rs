//! Error types for graph store access.

use thiserror::Error;

use crate::retry::Transient;

/// Result type for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Error type for graph operations.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Failed to reach the graph store (connection refused, DNS, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The store answered with a warming-up status (502/503/504).
    #[error("graph store unavailable ({status}): {message}")]
    Unavailable { status: u16, message: String },

    /// The request exceeded its total timeout.
    #[error("graph request timed out")]
    Timeout,

    /// The store answered with a definitive error status. Not retried.
    #[error("HTTP error {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body could not be decoded as SSE or JSON.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The store returned a JSON-RPC error object.
    #[error("server error {code}: {message}")]
    ServerError {
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },

    /// The tool itself reported a failure.
    #[error("tool error: {0}")]
    ToolError(String),
}

impl GraphError {
    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a tool error.
    pub fn tool_error(msg: impl Into<String>) -> Self {
        Self::ToolError(msg.into())
    }

    /// Create a server error from a JSON-RPC error object.
    pub fn server_error(
        code: i64,
        message: impl Into<String>,
        data: Option<serde_json::Value>,
    ) -> Self {
        Self::ServerError {
            code,
            message: message.into(),
            data,
        }
    }
}

impl Transient for GraphError {
    /// Transport failures, warming-up statuses, and timeouts are worth
    /// retrying. Malformed payloads and definitive server errors are not —
    /// retrying will not fix them.
    fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Unavailable { .. } | Self::Timeout
        )
    }
}

impl From<reqwest::Error> for GraphError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GraphError::Timeout
        } else if err.is_connect() {
            GraphError::Transport(format!("connection failed: {err}"))
        } else {
            GraphError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transience_classification() {
        assert!(GraphError::transport("refused").is_transient());
        assert!(GraphError::Timeout.is_transient());
        assert!(
            GraphError::Unavailable {
                status: 503,
                message: "warming up".to_string()
            }
            .is_transient()
        );

        assert!(!GraphError::protocol("bad SSE frame").is_transient());
        assert!(
            !GraphError::Status {
                status: 401,
                message: "unauthorized".to_string()
            }
            .is_transient()
        );
        assert!(!GraphError::server_error(-32600, "Invalid Request", None).is_transient());
        assert!(!GraphError::tool_error("constraint violation").is_transient());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: GraphError = json_err.into();
        assert!(matches!(err, GraphError::Json(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_error_display() {
        let err = GraphError::Unavailable {
            status: 502,
            message: "bad gateway".to_string(),
        };
        assert!(err.to_string().contains("502"));
        assert!(err.to_string().contains("bad gateway"));
    }
}
