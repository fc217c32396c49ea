//! Shared types for the Engram journaling graph agent.

pub mod entity;
pub mod event;
pub mod resolution;
pub mod routing;

pub use entity::{
    Entity, EntityKind, ExtractedEvent, ExtractionOutput, JournalEntryExtraction, MISSING_ID,
};
pub use event::{EventAuthor, TurnEvent};
pub use resolution::{
    AliasRecord, CoreEntity, MergeCommand, NewEntity, ResolutionResult, ResolutionSource,
    ResolvedEntity, RetrievalOutput, NEW_NODE_ID,
};
pub use routing::{Route, RoutingDecision};
