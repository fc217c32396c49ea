//! Collaborator contracts for the external generative steps.
//!
//! The orchestrator never reasons about language itself; routing
//! classification, entity extraction, context retrieval, statement authoring
//! and response composition are delegated through these traits. Any
//! text-generation backend can sit behind them; the state machine only
//! depends on the request/response contracts.
//!
//! [`MockCollaborator`] implements all five with scripted answers and a
//! request log, for tests.

use std::collections::VecDeque;

use async_trait::async_trait;
use engram_memory::CoreEntityIndex;
use engram_types::{
    ExtractionOutput, MergeCommand, ResolutionResult, RetrievalOutput, Route, RoutingDecision,
};
use tokio::sync::Mutex;

use crate::error::{AgentError, Result};

// ─── Requests ────────────────────────────────────────────────────────────

/// Input to routing classification.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    /// Thoughts already persisted, for reference only.
    pub previous_context: String,
    /// Thoughts not yet persisted; the decision is based on these.
    pub current_thoughts: String,
}

/// Input to entity extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractRequest {
    /// The unwritten thoughts to extract from.
    pub thoughts: String,
    /// Already-persisted context, for disambiguation only.
    pub previous_context: String,
    /// Wall-clock stamp for resolving relative dates ("yesterday").
    pub current_time: String,
}

/// Input to context retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrieveRequest {
    pub extraction: ExtractionOutput,
    /// Findings accumulated from earlier turns.
    pub prior_findings: String,
    /// Canonical well-connected nodes to bias matching toward.
    pub core_index: CoreEntityIndex,
}

/// Input to statement authoring.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorRequest {
    pub extraction: ExtractionOutput,
    pub resolution: ResolutionResult,
    /// Retrieved supporting context.
    pub retrieved_context: String,
    /// Merge commands proposed by retrieval; these come first in the
    /// authored statement order.
    pub merge_commands: Vec<MergeCommand>,
}

/// Input to response composition.
#[derive(Debug, Clone, PartialEq)]
pub struct RespondRequest {
    /// Full conversational context, chronological.
    pub context: String,
    /// How the turn was routed.
    pub route: Route,
    /// For CLARIFY: tags naming the missing information.
    pub missing: Vec<String>,
}

// ─── Traits ──────────────────────────────────────────────────────────────

/// Classifies a turn's intent.
#[async_trait]
pub trait RouteClassifier: Send + Sync {
    async fn route(&self, request: RouteRequest) -> Result<RoutingDecision>;
}

/// Extracts structured entities and events from unwritten thoughts.
///
/// Contract: emits at least one entry for non-empty input, and one entry
/// per distinct date when the input carries several dated entries.
#[async_trait]
pub trait EntityExtractor: Send + Sync {
    async fn extract(&self, request: ExtractRequest) -> Result<ExtractionOutput>;
}

/// Retrieves supporting context for the extracted entities.
///
/// Contract: findings must never include raw embedding vectors.
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    async fn retrieve(&self, request: RetrieveRequest) -> Result<RetrievalOutput>;
}

/// Authors the ordered graph-mutation statements for a turn.
#[async_trait]
pub trait StatementAuthor: Send + Sync {
    async fn author(&self, request: AuthorRequest) -> Result<Vec<String>>;
}

/// Composes the final natural-language response.
#[async_trait]
pub trait ResponseComposer: Send + Sync {
    async fn respond(&self, request: RespondRequest) -> Result<String>;
}

// ─── Mock ────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct MockScript {
    routes: VecDeque<RoutingDecision>,
    extraction: ExtractionOutput,
    extract_failures: u32,
    retrieval: RetrievalOutput,
    retrieve_failures: u32,
    statements: Vec<String>,
    response: String,
}

#[derive(Debug, Default)]
struct MockLog {
    route_requests: Vec<RouteRequest>,
    extract_requests: Vec<ExtractRequest>,
    retrieve_requests: Vec<RetrieveRequest>,
    author_requests: Vec<AuthorRequest>,
    respond_requests: Vec<RespondRequest>,
}

/// Scripted implementation of every collaborator trait.
///
/// Routing decisions are consumed in order; an empty queue models a
/// classifier that produced no decision. `fail_*` counters make the first N
/// calls fail with a transient error, for retry tests. Every request is
/// recorded for inspection.
#[derive(Debug, Default)]
pub struct MockCollaborator {
    script: Mutex<MockScript>,
    log: Mutex<MockLog>,
}

impl MockCollaborator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a routing decision.
    pub async fn push_route(&self, decision: RoutingDecision) {
        self.script.lock().await.routes.push_back(decision);
    }

    /// Set the scripted extraction output.
    pub async fn set_extraction(&self, extraction: ExtractionOutput) {
        self.script.lock().await.extraction = extraction;
    }

    /// Make the first `n` extraction calls fail with a transient error.
    pub async fn fail_extractions(&self, n: u32) {
        self.script.lock().await.extract_failures = n;
    }

    /// Set the scripted retrieval output.
    pub async fn set_retrieval(&self, retrieval: RetrievalOutput) {
        self.script.lock().await.retrieval = retrieval;
    }

    /// Make the first `n` retrieval calls fail with a transient error.
    pub async fn fail_retrievals(&self, n: u32) {
        self.script.lock().await.retrieve_failures = n;
    }

    /// Set the scripted authored statements.
    pub async fn set_statements(&self, statements: Vec<String>) {
        self.script.lock().await.statements = statements;
    }

    /// Set the scripted response text.
    pub async fn set_response(&self, response: impl Into<String>) {
        self.script.lock().await.response = response.into();
    }

    pub async fn route_requests(&self) -> Vec<RouteRequest> {
        self.log.lock().await.route_requests.clone()
    }

    pub async fn extract_requests(&self) -> Vec<ExtractRequest> {
        self.log.lock().await.extract_requests.clone()
    }

    pub async fn retrieve_requests(&self) -> Vec<RetrieveRequest> {
        self.log.lock().await.retrieve_requests.clone()
    }

    pub async fn author_requests(&self) -> Vec<AuthorRequest> {
        self.log.lock().await.author_requests.clone()
    }

    pub async fn respond_requests(&self) -> Vec<RespondRequest> {
        self.log.lock().await.respond_requests.clone()
    }
}

#[async_trait]
impl RouteClassifier for MockCollaborator {
    async fn route(&self, request: RouteRequest) -> Result<RoutingDecision> {
        self.log.lock().await.route_requests.push(request);
        self.script
            .lock()
            .await
            .routes
            .pop_front()
            .ok_or_else(|| AgentError::contract("no routing decision"))
    }
}

#[async_trait]
impl EntityExtractor for MockCollaborator {
    async fn extract(&self, request: ExtractRequest) -> Result<ExtractionOutput> {
        self.log.lock().await.extract_requests.push(request);
        let mut script = self.script.lock().await;
        if script.extract_failures > 0 {
            script.extract_failures -= 1;
            return Err(AgentError::collaborator("extraction backend unavailable"));
        }
        Ok(script.extraction.clone())
    }
}

#[async_trait]
impl ContextRetriever for MockCollaborator {
    async fn retrieve(&self, request: RetrieveRequest) -> Result<RetrievalOutput> {
        self.log.lock().await.retrieve_requests.push(request);
        let mut script = self.script.lock().await;
        if script.retrieve_failures > 0 {
            script.retrieve_failures -= 1;
            return Err(AgentError::collaborator("retrieval backend unavailable"));
        }
        Ok(script.retrieval.clone())
    }
}

#[async_trait]
impl StatementAuthor for MockCollaborator {
    async fn author(&self, request: AuthorRequest) -> Result<Vec<String>> {
        self.log.lock().await.author_requests.push(request);
        Ok(self.script.lock().await.statements.clone())
    }
}

#[async_trait]
impl ResponseComposer for MockCollaborator {
    async fn respond(&self, request: RespondRequest) -> Result<String> {
        self.log.lock().await.respond_requests.push(request);
        Ok(self.script.lock().await.response.clone())
    }
}
