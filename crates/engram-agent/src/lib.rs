//! Turn orchestration for Engram.
//!
//! This crate drives one conversation of the journaling agent: it
//! reconstructs the turn's context from the event log, classifies the
//! turn's intent, and runs the matching pipeline. Everything generative
//! (routing, extraction, retrieval, authoring, response) sits behind the
//! [`collaborator`] traits; everything deterministic (resolution, the core
//! index, consistency checking) comes from `engram-memory`.
//!
//! # Core components
//!
//! - [`TurnOrchestrator`]: the per-conversation state machine
//! - [`ThoughtBuffers`]: written/unwritten context reconstruction
//! - [`TurnState`]: one turn's working data
//! - [`MockCollaborator`]: scripted collaborator double for tests

pub mod collaborator;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod sanitize;
pub mod state;
pub mod telemetry;

pub use collaborator::{
    AuthorRequest, ContextRetriever, EntityExtractor, ExtractRequest, MockCollaborator,
    RespondRequest, ResponseComposer, RetrieveRequest, RouteClassifier, RouteRequest,
    StatementAuthor,
};
pub use context::{
    FindingsBuffer, NO_PREVIOUS_CONTEXT, ThoughtBuffers, prune_after_write, split_user_messages,
};
pub use error::{AgentError, Result};
pub use orchestrator::{Collaborators, OrchestratorOptions, TurnOrchestrator, TurnOutcome};
pub use sanitize::is_unsafe_delete;
pub use state::TurnState;
pub use telemetry::init_tracing;
