//! Turn routing decision types.

use serde::{Deserialize, Serialize};

/// Classification of a turn's intent.
///
/// The routing collaborator's contract names three handled routes; anything
/// else it emits parses into `Other` and the orchestrator degrades to a
/// logged no-op turn rather than crashing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Route {
    /// Conversational filler; respond directly, persist nothing.
    Skip,
    /// Not enough information to persist; ask for what's missing.
    Clarify,
    /// Enough information; run the full write pipeline.
    Write,
    /// A route value the orchestrator does not handle.
    Other(String),
}

impl From<String> for Route {
    fn from(value: String) -> Self {
        match value.as_str() {
            "SKIP" => Self::Skip,
            "CLARIFY" => Self::Clarify,
            "WRITE" => Self::Write,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for Route {
    fn from(value: &str) -> Self {
        value.to_string().into()
    }
}

impl From<Route> for String {
    fn from(route: Route) -> Self {
        match route {
            Route::Skip => "SKIP".to_string(),
            Route::Clarify => "CLARIFY".to_string(),
            Route::Write => "WRITE".to_string(),
            Route::Other(value) => value,
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Skip => f.write_str("SKIP"),
            Self::Clarify => f.write_str("CLARIFY"),
            Self::Write => f.write_str("WRITE"),
            Self::Other(value) => f.write_str(value),
        }
    }
}

/// The routing collaborator's decision for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub route: Route,
    /// For CLARIFY: free-form tags naming the missing information
    /// ("feelings", "reason", "event/time").
    #[serde(default)]
    pub missing: Vec<String>,
}

impl RoutingDecision {
    pub fn new(route: impl Into<Route>) -> Self {
        Self {
            route: route.into(),
            missing: Vec::new(),
        }
    }

    pub fn clarify(missing: Vec<String>) -> Self {
        Self {
            route: Route::Clarify,
            missing,
        }
    }
}
