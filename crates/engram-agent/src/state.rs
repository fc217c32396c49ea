//! Per-turn working state.

use engram_memory::CoreEntityIndex;
use engram_types::{ExtractionOutput, ResolutionResult, RoutingDecision};

use crate::context::ThoughtBuffers;

/// The working data of one turn, owned by the orchestrator.
///
/// Created empty at turn start, populated stage by stage, discarded at turn
/// end. Nothing in here outlives the turn except what the orchestrator
/// explicitly carries over (the findings ring buffer and the pruned event
/// log).
#[derive(Debug, Clone, Default)]
pub struct TurnState {
    pub buffers: ThoughtBuffers,
    pub routing_decision: Option<RoutingDecision>,
    pub extraction: Option<ExtractionOutput>,
    pub resolution: ResolutionResult,
    pub core_index: CoreEntityIndex,
    /// Findings from this turn's retrieval step.
    pub context_output: String,
    /// Authored mutation statements, in execution order.
    pub statements: Vec<String>,
}

impl TurnState {
    pub fn new(buffers: ThoughtBuffers) -> Self {
        Self {
            buffers,
            ..Default::default()
        }
    }
}
