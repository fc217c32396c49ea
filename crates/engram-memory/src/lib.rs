//! Deterministic graph services.
//!
//! Everything here is plain statement execution against a
//! [`GraphStore`](engram_graph::GraphStore), with no model calls and no
//! prompting. Three services:
//!
//! - [`EntityResolver`] — partitions a turn's extracted entities into
//!   already-known and not-yet-known, alias mappings consulted first.
//! - [`CoreIndexService`] — loads the well-connected "core" nodes of the
//!   graph, grouped by label, so downstream consumers can bias toward them.
//! - [`ConsistencyChecker`] — the post-write reflex loop: finds duplicate
//!   nodes, collapses them, and records an alias so the duplicate name
//!   resolves directly next time.
//!
//! All three degrade rather than fail: a store error during resolution
//! treats the entity as new, an index load error yields an empty index,
//! and a failed merge skips only that pair.

pub mod consistency;
pub mod core_index;
pub mod resolver;

pub use consistency::{ConsistencyChecker, ConsistencyReport, DuplicatePair};
pub use core_index::{CoreEntityIndex, CoreIndexService};
pub use resolver::EntityResolver;
