//! HTTP client for the remote graph store.
//!
//! Statements go out as JSON-RPC `tools/call` POSTs. The remote store runs
//! on scale-to-zero infrastructure: the first call after an idle period can
//! answer 502/503/504 for tens of seconds while it warms up, so the client
//! carries its own bounded backoff loop, separate from the pipeline-level
//! [`RetryPolicy`](crate::RetryPolicy) the orchestrator wraps around whole
//! steps.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::{Value, json};

use crate::error::{GraphError, Result};
use crate::protocol::{CallToolParams, CallToolResult, JsonRpcRequest, decode_rpc_body};
use crate::retry::RetryPolicy;
use crate::scrub::strip_embeddings;

/// Statuses treated as "store still starting".
const WARMUP_STATUSES: [u16; 3] = [502, 503, 504];

/// Configuration for a graph store connection.
#[derive(Debug, Clone)]
pub struct GraphClientConfig {
    /// Store endpoint URL.
    pub url: String,
    /// Total per-request timeout.
    pub timeout: Duration,
    /// Cold-start retries after the first failure.
    pub max_retries: u32,
    /// Initial cold-start backoff; doubles per retry.
    pub initial_delay: Duration,
    /// Extra headers (e.g., authentication) added to every request.
    pub headers: Vec<(String, String)>,
    /// Tool name for read-only statements.
    pub read_tool: String,
    /// Tool name for mutating statements.
    pub write_tool: String,
    /// Tool name for the schema passthrough.
    pub schema_tool: String,
}

impl Default for GraphClientConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout: Duration::from_secs(30),
            max_retries: 4,
            initial_delay: Duration::from_secs(5),
            headers: Vec::new(),
            read_tool: "read_graph_cypher".to_string(),
            write_tool: "write_graph_cypher".to_string(),
            schema_tool: "get_graph_schema".to_string(),
        }
    }
}

impl GraphClientConfig {
    /// Create a config pointed at the given endpoint.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the cold-start retry count.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the initial cold-start backoff.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Add a header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }
}

impl From<&engram_config::GraphConfig> for GraphClientConfig {
    fn from(config: &engram_config::GraphConfig) -> Self {
        Self {
            url: config.url.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            read_tool: config.read_tool.clone(),
            write_tool: config.write_tool.clone(),
            ..Default::default()
        }
    }
}

/// A client connected to a single graph store endpoint.
pub struct GraphClient {
    config: GraphClientConfig,
    http: reqwest::Client,
    request_id: AtomicU64,
}

impl GraphClient {
    /// Build a client from the given config.
    ///
    /// Validates the endpoint URL and constructs the HTTP client; no request
    /// is sent until the first statement.
    pub fn connect(config: GraphClientConfig) -> Result<Self> {
        let _parsed = url::Url::parse(&config.url)
            .map_err(|e| GraphError::transport(format!("invalid URL: {e}")))?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GraphError::transport(format!("failed to build HTTP client: {e}")))?;

        tracing::info!(
            url = %config.url,
            timeout_secs = config.timeout.as_secs(),
            "connected to graph store"
        );

        Ok(Self {
            config,
            http,
            request_id: AtomicU64::new(1),
        })
    }

    fn next_request_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Call a tool on the store, retrying warm-up failures with backoff.
    pub async fn call_tool(&self, tool: &str, arguments: Value) -> Result<CallToolResult> {
        let policy = RetryPolicy::new(self.config.max_retries, self.config.initial_delay);
        policy
            .run(tool, || self.call_tool_once(tool, arguments.clone()))
            .await
    }

    /// One attempt: POST, decode SSE-or-JSON, unwrap the envelope.
    async fn call_tool_once(&self, tool: &str, arguments: Value) -> Result<CallToolResult> {
        let params = CallToolParams {
            name: tool.to_string(),
            arguments: Some(arguments),
        };
        let request = JsonRpcRequest::new(
            self.next_request_id(),
            "tools/call",
            Some(serde_json::to_value(&params)?),
        );

        let mut req = self
            .http
            .post(&self.config.url)
            .json(&request)
            .header("Accept", "application/json, text/event-stream");
        for (key, value) in &self.config.headers {
            req = req.header(key, value);
        }

        let response = req.send().await?;
        let status = response.status().as_u16();

        if WARMUP_STATUSES.contains(&status) {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(status, tool, "graph store warming up");
            return Err(GraphError::Unavailable { status, message });
        }
        if !(200..300).contains(&status) {
            let message = response.text().await.unwrap_or_default();
            return Err(GraphError::Status { status, message });
        }

        // Read raw text: some deployments send JSON with a stream mimetype.
        let body = response.text().await?;
        let envelope = decode_rpc_body(&body)?;
        let result = envelope.into_result()?;
        let call_result: CallToolResult = serde_json::from_value(result)?;

        if call_result.is_error() {
            return Err(GraphError::tool_error(call_result.text()));
        }

        tracing::debug!(tool, "tool call succeeded");
        Ok(call_result)
    }

    /// Execute a read-only statement and return decoded rows.
    pub async fn read(&self, statement: &str, params: Option<Value>) -> Result<Vec<Value>> {
        let result = self
            .call_tool(&self.config.read_tool, statement_args(statement, params))
            .await?;
        Ok(decode_rows(&result))
    }

    /// Execute a mutating statement and return decoded rows (often empty).
    pub async fn write(&self, statement: &str, params: Option<Value>) -> Result<Vec<Value>> {
        let result = self
            .call_tool(&self.config.write_tool, statement_args(statement, params))
            .await?;
        Ok(decode_rows(&result))
    }

    /// Fetch the store's schema description.
    pub async fn schema(&self) -> Result<String> {
        let result = self
            .call_tool(&self.config.schema_tool, json!({}))
            .await?;
        Ok(result.text())
    }
}

fn statement_args(statement: &str, params: Option<Value>) -> Value {
    let mut args = json!({ "query": statement });
    if let Some(params) = params {
        args["params"] = params;
    }
    args
}

/// Decode a tool result's text content into row records.
///
/// Read statements answer with a JSON array of row objects; write statements
/// often answer with a human-readable summary. Non-array text decodes to no
/// rows rather than an error. Every row is scrubbed of embedding fields.
fn decode_rows(result: &CallToolResult) -> Vec<Value> {
    let text = result.text();
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Array(rows)) => rows.into_iter().map(strip_embeddings).collect(),
        Ok(_) | Err(_) => {
            if !text.trim().is_empty() {
                tracing::debug!(len = text.len(), "tool result is not a row array");
            }
            Vec::new()
        }
    }
}
