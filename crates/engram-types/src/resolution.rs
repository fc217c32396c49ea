//! Resolution results, duplicate merges, and learned aliases.

use serde::{Deserialize, Serialize};

use crate::entity::EntityKind;

/// Sentinel for a merge target that only exists in the current turn's
/// extraction and was never persisted.
pub const NEW_NODE_ID: &str = "NEW";

/// How an existing entity was matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    /// Matched through a learned alias from a past merge.
    Alias,
    /// Matched through a kind-specific graph lookup.
    Lookup,
}

/// An extracted entity that matched a node already in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEntity {
    /// Graph id of the matched node, or [`crate::MISSING_ID`].
    pub id: String,
    /// Canonical name of the matched node.
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    /// The surface name the user actually wrote.
    pub original_query: String,
    pub source: ResolutionSource,
}

/// An extracted entity with no match in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEntity {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
}

/// Partition of a turn's entities into already-known and not-yet-known.
///
/// Every input entity lands in exactly one of the two lists, keyed by its
/// original surface name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub existing: Vec<ResolvedEntity>,
    pub new: Vec<NewEntity>,
}

impl ResolutionResult {
    /// Total entities across both partitions.
    pub fn total(&self) -> usize {
        self.existing.len() + self.new.len()
    }

    /// Whether a surface name appears in the existing partition.
    pub fn is_existing(&self, surface_name: &str) -> bool {
        self.existing.iter().any(|e| e.original_query == surface_name)
    }

    /// Whether a surface name appears in the new partition.
    pub fn is_new(&self, surface_name: &str) -> bool {
        self.new.iter().any(|e| e.name == surface_name)
    }

    /// Labels of every category that appeared in this turn, deduplicated.
    pub fn touched_labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self
            .existing
            .iter()
            .map(|e| e.kind.label().to_string())
            .chain(self.new.iter().map(|e| e.kind.label().to_string()))
            .collect();
        labels.sort();
        labels.dedup();
        labels
    }
}

/// A well-connected canonical node, biased toward during resolution and
/// statement authoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreEntity {
    pub id: String,
    pub name: String,
    /// Relationship count (graph degree).
    pub weight: u64,
}

/// A proposed or executed collapse of a duplicate entity into a canonical one.
///
/// `keep_id` must reference the node with the higher relationship count;
/// ties break toward the lowest id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeCommand {
    pub keep_id: String,
    pub keep_name: String,
    /// Id of the duplicate, or [`NEW_NODE_ID`] when it was never persisted.
    pub remove_id: String,
    pub remove_name: String,
    pub reason: String,
}

/// A durable mapping from a duplicate name to its canonical entity.
///
/// Written after a merge so future turns resolve the duplicate name directly
/// without re-running similarity search. Never deleted automatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasRecord {
    pub from_name: String,
    pub to_name: String,
    pub canonical_id: String,
    pub confidence: f64,
}

impl AliasRecord {
    /// An alias learned from a confirmed merge.
    pub fn confirmed(
        from_name: impl Into<String>,
        to_name: impl Into<String>,
        canonical_id: impl Into<String>,
    ) -> Self {
        Self {
            from_name: from_name.into(),
            to_name: to_name.into(),
            canonical_id: canonical_id.into(),
            confidence: 1.0,
        }
    }
}

/// What the retrieval collaborator answers with.
///
/// Alongside its findings the retriever may propose merge commands for
/// duplicates it noticed; statement authoring must honor those before any
/// other mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalOutput {
    /// Structured findings as text, free of embedding vectors.
    pub findings: String,
    #[serde(default)]
    pub merge_commands: Vec<MergeCommand>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_partition_helpers() {
        let result = ResolutionResult {
            existing: vec![ResolvedEntity {
                id: "person_1".to_string(),
                name: "Sasha".to_string(),
                kind: EntityKind::Person,
                original_query: "Sashka".to_string(),
                source: ResolutionSource::Alias,
            }],
            new: vec![NewEntity {
                name: "woodworking".to_string(),
                kind: EntityKind::Topic,
            }],
        };

        assert_eq!(result.total(), 2);
        assert!(result.is_existing("Sashka"));
        assert!(!result.is_existing("woodworking"));
        assert!(result.is_new("woodworking"));
        assert_eq!(result.touched_labels(), vec!["Person", "Topic"]);
    }

    #[test]
    fn test_alias_confirmed_has_full_confidence() {
        let alias = AliasRecord::confirmed("Sashka", "Sasha", "person_1");
        assert_eq!(alias.confidence, 1.0);
        assert_eq!(alias.canonical_id, "person_1");
    }

    #[test]
    fn test_merge_command_serde() {
        let cmd = MergeCommand {
            keep_id: "person_1".to_string(),
            keep_name: "Sasha".to_string(),
            remove_id: NEW_NODE_ID.to_string(),
            remove_name: "Sashka".to_string(),
            reason: "diminutive of the same name".to_string(),
        };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["remove_id"], "NEW");
        let back: MergeCommand = serde_json::from_value(json).unwrap();
        assert_eq!(back, cmd);
    }
}
