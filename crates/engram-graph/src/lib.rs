//! Graph store access for Engram.
//!
//! The graph store speaks JSON-RPC 2.0 `tools/call` over HTTP POST, with
//! responses arriving either as a single JSON body or as a streamed
//! server-sent-event format. This crate provides:
//!
//! - [`GraphClient`] — the HTTP client, with its own cold-start retry loop
//!   (the remote store scales to zero and answers 502/503/504 while warming
//!   up) and recursive embedding-field stripping on every decoded row.
//! - [`GraphStore`] — the async seam services and tests program against,
//!   with a scripted [`MockGraph`] double.
//! - [`RetryPolicy`] — the generic retry executor wrapped around
//!   network-sensitive pipeline steps, independent of the client's own loop.

pub mod client;
pub mod error;
pub mod protocol;
pub mod retry;
pub mod scrub;
pub mod store;

pub use client::{GraphClient, GraphClientConfig};
pub use error::{GraphError, Result};
pub use protocol::{CallToolParams, CallToolResult, JsonRpcError, JsonRpcRequest, ToolContent};
pub use retry::{RetryPolicy, Transient};
pub use scrub::strip_embeddings;
pub use store::{GraphStore, MockGraph, SharedStore};
