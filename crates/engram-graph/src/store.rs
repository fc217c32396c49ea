//! Store abstraction over graph statement execution.
//!
//! Higher layers depend on [`GraphStore`] rather than the HTTP client, so
//! resolution and consistency logic can be tested against [`MockGraph`]
//! without a live store.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::client::GraphClient;
use crate::error::{GraphError, Result};

/// Executes graph statements against some backing store.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Run a read-only statement, returning row records.
    async fn read(&self, statement: &str, params: Option<Value>) -> Result<Vec<Value>>;

    /// Run a mutating statement, returning row records (often empty).
    async fn write(&self, statement: &str, params: Option<Value>) -> Result<Vec<Value>>;
}

/// Shared handle to a store implementation.
pub type SharedStore = Arc<dyn GraphStore>;

#[async_trait]
impl GraphStore for GraphClient {
    async fn read(&self, statement: &str, params: Option<Value>) -> Result<Vec<Value>> {
        GraphClient::read(self, statement, params).await
    }

    async fn write(&self, statement: &str, params: Option<Value>) -> Result<Vec<Value>> {
        GraphClient::write(self, statement, params).await
    }
}

/// What a [`MockGraph`] rule answers with.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Answer with these rows.
    Rows(Vec<Value>),
    /// Fail with a transport error carrying this message.
    Error(String),
}

#[derive(Debug, Clone)]
struct MockRule {
    pattern: String,
    reply: MockReply,
}

#[derive(Debug, Default)]
struct MockState {
    rules: Vec<MockRule>,
    statements: Vec<String>,
}

/// Scripted in-memory store for tests.
///
/// Rules match on a substring of the statement; the first match wins.
/// Unmatched statements answer with no rows. Every executed statement is
/// recorded and can be inspected afterwards.
#[derive(Debug, Default)]
pub struct MockGraph {
    state: Mutex<MockState>,
}

impl MockGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer statements containing `pattern` with the given rows.
    pub async fn on(&self, pattern: impl Into<String>, rows: Vec<Value>) {
        let mut state = self.state.lock().await;
        state.rules.push(MockRule {
            pattern: pattern.into(),
            reply: MockReply::Rows(rows),
        });
    }

    /// Fail statements containing `pattern` with a transport error.
    pub async fn fail_on(&self, pattern: impl Into<String>, message: impl Into<String>) {
        let mut state = self.state.lock().await;
        state.rules.push(MockRule {
            pattern: pattern.into(),
            reply: MockReply::Error(message.into()),
        });
    }

    /// Statements executed so far, in order.
    pub async fn statements(&self) -> Vec<String> {
        self.state.lock().await.statements.clone()
    }

    /// Number of statements executed so far.
    pub async fn statement_count(&self) -> usize {
        self.state.lock().await.statements.len()
    }

    async fn execute(&self, statement: &str) -> Result<Vec<Value>> {
        let mut state = self.state.lock().await;
        state.statements.push(statement.to_string());
        let reply = state
            .rules
            .iter()
            .find(|rule| statement.contains(&rule.pattern))
            .map(|rule| rule.reply.clone());
        match reply {
            Some(MockReply::Rows(rows)) => Ok(rows),
            Some(MockReply::Error(message)) => Err(GraphError::transport(message)),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl GraphStore for MockGraph {
    async fn read(&self, statement: &str, _params: Option<Value>) -> Result<Vec<Value>> {
        self.execute(statement).await
    }

    async fn write(&self, statement: &str, _params: Option<Value>) -> Result<Vec<Value>> {
        self.execute(statement).await
    }
}
