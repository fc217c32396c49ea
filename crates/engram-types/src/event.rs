//! Turn event log types.
//!
//! A conversation is an ordered sequence of turn artifacts tagged with the
//! pipeline stage that produced them. The log is append-only during a turn
//! and pruned between turns to bound context growth.

use serde::{Deserialize, Serialize};

/// The pipeline stage that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAuthor {
    /// Raw user input.
    User,
    /// Structured extraction output. Marks the boundary between thoughts
    /// that have been persisted and thoughts that have not.
    Extractor,
    /// Retrieved supporting context.
    Retriever,
    /// Authored mutation statements.
    Author,
    /// Statement execution results.
    Executor,
    /// The final generated response.
    Assistant,
    /// Orchestrator status notices.
    System,
}

/// One artifact in a conversation's event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnEvent {
    pub author: EventAuthor,
    pub content: String,
}

impl TurnEvent {
    pub fn new(author: EventAuthor, content: impl Into<String>) -> Self {
        Self {
            author,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(EventAuthor::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(EventAuthor::Assistant, content)
    }

    pub fn is_user(&self) -> bool {
        self.author == EventAuthor::User
    }
}
