//! The turn orchestrator state machine.
//!
//! One turn: reconstruct context, classify the route, dispatch.
//!
//! ```text
//!            ┌──────── ROUTING ────────┐
//!            ▼            ▼            ▼
//!          SKIP        CLARIFY       WRITE
//!            │            │            │
//!         respond      respond    extract → resolve → core index
//!                                  → retrieve → author → execute
//!                                  → consistency → respond → prune
//! ```
//!
//! SKIP and CLARIFY persist nothing. WRITE runs the full pipeline in strict
//! order, emits an acknowledgment notice before the first network call, and
//! prunes the event log afterwards. Resolution, core-index and consistency
//! failures degrade to empty substitutes; extraction, retrieval and
//! statement execution are retried and fail the turn when exhausted.
//!
//! The orchestrator exclusively owns one conversation's event log and turn
//! state. Concurrent turns for the same conversation are not defined; a
//! higher layer serializes them.

use std::sync::Arc;

use engram_config::EngramConfig;
use engram_graph::{RetryPolicy, SharedStore};
use engram_memory::{ConsistencyChecker, CoreIndexService, EntityResolver};
use engram_types::{EventAuthor, Route, TurnEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::collaborator::{
    AuthorRequest, ContextRetriever, EntityExtractor, ExtractRequest, RespondRequest,
    ResponseComposer, RetrieveRequest, RouteClassifier, RouteRequest, StatementAuthor,
};
use crate::context::{FindingsBuffer, ThoughtBuffers, prune_after_write};
use crate::error::{AgentError, Result};
use crate::sanitize::is_unsafe_delete;
use crate::state::TurnState;

/// The five external generative steps, bundled.
#[derive(Clone)]
pub struct Collaborators {
    pub classifier: Arc<dyn RouteClassifier>,
    pub extractor: Arc<dyn EntityExtractor>,
    pub retriever: Arc<dyn ContextRetriever>,
    pub author: Arc<dyn StatementAuthor>,
    pub composer: Arc<dyn ResponseComposer>,
}

impl Collaborators {
    /// Use one implementation for all five contracts.
    pub fn uniform<T>(collaborator: Arc<T>) -> Self
    where
        T: RouteClassifier
            + EntityExtractor
            + ContextRetriever
            + StatementAuthor
            + ResponseComposer
            + 'static,
    {
        Self {
            classifier: collaborator.clone(),
            extractor: collaborator.clone(),
            retriever: collaborator.clone(),
            author: collaborator.clone(),
            composer: collaborator,
        }
    }
}

/// Orchestrator tunables.
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Notice sent as soon as a turn routes to WRITE, before any network
    /// call, so the caller is never left waiting without feedback.
    pub ack_notice: String,
    /// Retry policy for network-sensitive pipeline steps.
    pub retry: RetryPolicy,
    /// Cap on the findings ring buffer.
    pub findings_cap: usize,
    /// Keep the last retrieval output for one extra turn when pruning.
    pub keep_retrieval_on_prune: bool,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            ack_notice: "This matters. Writing it down so it isn't lost...".to_string(),
            retry: RetryPolicy::default(),
            findings_cap: 10,
            keep_retrieval_on_prune: false,
        }
    }
}

impl OrchestratorOptions {
    pub fn from_config(config: &EngramConfig) -> Self {
        Self {
            retry: RetryPolicy::new(
                config.retry.max_retries,
                std::time::Duration::from_millis(config.retry.initial_delay_ms),
            ),
            findings_cap: config.context.findings_cap,
            keep_retrieval_on_prune: config.context.keep_retrieval_on_prune,
            ..Default::default()
        }
    }

    pub fn with_ack_notice(mut self, notice: impl Into<String>) -> Self {
        self.ack_notice = notice.into();
        self
    }
}

/// What a turn produced.
///
/// Silence is distinguishable from success: a routing failure and an
/// unhandled route both end the turn without a response, and the caller
/// must treat those as their own outcomes.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The turn completed with a response.
    Response { route: Route, text: String },
    /// The classifier produced no decision; the turn was aborted before
    /// any side effect.
    NoDecision,
    /// The classifier emitted a route the orchestrator does not handle.
    Ignored { route: String },
}

impl TurnOutcome {
    /// The response text, if the turn produced one.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Response { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// Drives one conversation, turn by turn.
pub struct TurnOrchestrator {
    collaborators: Collaborators,
    store: SharedStore,
    resolver: EntityResolver,
    core_index: CoreIndexService,
    consistency: ConsistencyChecker,
    options: OrchestratorOptions,
    events: Vec<TurnEvent>,
    findings: FindingsBuffer,
    notices: Option<mpsc::UnboundedSender<String>>,
    cancel: CancellationToken,
}

impl TurnOrchestrator {
    pub fn new(collaborators: Collaborators, store: SharedStore, config: &EngramConfig) -> Self {
        let options = OrchestratorOptions::from_config(config);
        Self {
            collaborators,
            resolver: EntityResolver::new(store.clone()),
            core_index: CoreIndexService::new(store.clone(), config.core_entities.clone()),
            consistency: ConsistencyChecker::new(store.clone(), config.consistency.clone()),
            store,
            findings: FindingsBuffer::new(options.findings_cap),
            options,
            events: Vec::new(),
            notices: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the default options.
    pub fn with_options(mut self, options: OrchestratorOptions) -> Self {
        self.findings = FindingsBuffer::new(options.findings_cap);
        self.options = options;
        self
    }

    /// Send acknowledgment notices over this channel.
    pub fn with_notices(mut self, sender: mpsc::UnboundedSender<String>) -> Self {
        self.notices = Some(sender);
        self
    }

    /// Abandon the remainder of a turn when this token triggers. Statements
    /// already sent are not undone.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Seed the event log, e.g. when resuming a stored conversation.
    pub fn load_history(&mut self, events: Vec<TurnEvent>) {
        self.events = events;
    }

    /// The conversation's event log.
    pub fn events(&self) -> &[TurnEvent] {
        &self.events
    }

    /// Run one turn to completion.
    pub async fn run_turn(&mut self, raw_input: &str) -> Result<TurnOutcome> {
        let buffers = ThoughtBuffers::build(&self.events, raw_input);
        self.events.push(TurnEvent::user(raw_input));
        let mut state = TurnState::new(buffers);

        let decision = match self
            .collaborators
            .classifier
            .route(RouteRequest {
                previous_context: state.buffers.previous_context.clone(),
                current_thoughts: state.buffers.current_thoughts.clone(),
            })
            .await
        {
            Ok(decision) => decision,
            Err(e) => {
                tracing::error!(error = %e, "routing produced no decision, aborting turn");
                return Ok(TurnOutcome::NoDecision);
            }
        };
        tracing::info!(route = %decision.route, "routing decision");
        state.routing_decision = Some(decision.clone());

        match decision.route {
            Route::Skip => {
                let text = self.respond(&state, Route::Skip, Vec::new()).await?;
                Ok(TurnOutcome::Response {
                    route: Route::Skip,
                    text,
                })
            }
            Route::Clarify => {
                tracing::info!(missing = ?decision.missing, "asking for clarification");
                let text = self
                    .respond(&state, Route::Clarify, decision.missing)
                    .await?;
                Ok(TurnOutcome::Response {
                    route: Route::Clarify,
                    text,
                })
            }
            Route::Write => self.run_write(&mut state).await,
            Route::Other(route) => {
                tracing::warn!(route, "unhandled route, ignoring turn");
                Ok(TurnOutcome::Ignored { route })
            }
        }
    }

    /// The full write pipeline, in strict order.
    async fn run_write(&mut self, state: &mut TurnState) -> Result<TurnOutcome> {
        if let Some(notices) = &self.notices {
            let _ = notices.send(self.options.ack_notice.clone());
        }

        let retry = self.options.retry;
        let current_time = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        // Extract.
        let extractor = self.collaborators.extractor.clone();
        let extract_request = ExtractRequest {
            thoughts: state.buffers.current_thoughts.clone(),
            previous_context: state.buffers.previous_context.clone(),
            current_time,
        };
        let extraction = self
            .guarded(retry.run("extract", || extractor.extract(extract_request.clone())))
            .await?;
        if extraction.entries.is_empty() && !state.buffers.current_thoughts.trim().is_empty() {
            return Err(AgentError::contract(
                "extractor emitted no entries for non-empty input",
            ));
        }
        self.events.push(TurnEvent::new(
            EventAuthor::Extractor,
            serde_json::to_string(&extraction)?,
        ));
        state.extraction = Some(extraction.clone());

        // Resolve. Lookup failures are absorbed inside the resolver; missing
        // dedup hints must never block persistence.
        state.resolution = self.resolver.resolve(&extraction).await;

        // Core index. Same rule: failure degrades to an empty index.
        state.core_index = self.core_index.load().await;

        // Retrieve.
        let retriever = self.collaborators.retriever.clone();
        let retrieve_request = RetrieveRequest {
            extraction: extraction.clone(),
            prior_findings: self.findings.joined(),
            core_index: state.core_index.clone(),
        };
        let retrieval = self
            .guarded(retry.run("retrieve", || retriever.retrieve(retrieve_request.clone())))
            .await?;
        self.events.push(TurnEvent::new(
            EventAuthor::Retriever,
            retrieval.findings.clone(),
        ));
        self.findings.push(retrieval.findings.clone());
        state.context_output = retrieval.findings.clone();

        // Author.
        let statements = self
            .collaborators
            .author
            .author(AuthorRequest {
                extraction,
                resolution: state.resolution.clone(),
                retrieved_context: retrieval.findings,
                merge_commands: retrieval.merge_commands,
            })
            .await?;
        self.events.push(TurnEvent::new(
            EventAuthor::Author,
            statements.join("\n"),
        ));
        state.statements = statements.clone();

        // Execute, statement by statement. Each statement is an independent
        // request; there is no client-held transaction to roll back. Deletes
        // that target the unresolved-id sentinel never reach the store.
        let mut executed = 0usize;
        let mut blocked = 0usize;
        for (index, statement) in statements.iter().enumerate() {
            if is_unsafe_delete(statement) {
                tracing::warn!(index, "blocked delete targeting an unresolved id");
                blocked += 1;
                continue;
            }
            let store = self.store.clone();
            self.guarded(async {
                retry
                    .run("execute", || store.write(statement, None))
                    .await
                    .map_err(AgentError::from)
            })
            .await?;
            executed += 1;
            tracing::debug!(index, "statement executed");
        }
        self.events.push(TurnEvent::new(
            EventAuthor::Executor,
            format!("executed {executed} statements, blocked {blocked}"),
        ));

        // Consistency. Degrades internally; a failed run costs cleanup, not
        // the turn.
        let report = self.consistency.run(&state.resolution.touched_labels()).await;
        tracing::info!(
            duplicates = report.duplicates_found,
            merged = report.merged,
            aliases = report.aliases_created,
            "consistency check complete"
        );

        // Respond, then prune and reset accumulation so the next writing
        // turn does not inherit stale findings.
        let text = self.respond(state, Route::Write, Vec::new()).await?;
        self.events = prune_after_write(&self.events, self.options.keep_retrieval_on_prune);
        self.findings.clear();
        state.context_output.clear();

        Ok(TurnOutcome::Response {
            route: Route::Write,
            text,
        })
    }

    async fn respond(
        &mut self,
        state: &TurnState,
        route: Route,
        missing: Vec<String>,
    ) -> Result<String> {
        let text = self
            .collaborators
            .composer
            .respond(RespondRequest {
                context: state.buffers.thought_buffer_context.clone(),
                route,
                missing,
            })
            .await?;
        self.events.push(TurnEvent::assistant(&text));
        Ok(text)
    }

    /// Race a pipeline step against cancellation.
    async fn guarded<T, F>(&self, step: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(AgentError::Cancelled),
            result = step => result,
        }
    }
}
