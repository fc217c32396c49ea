//! Entities and journal-entry extraction output.

use serde::{Deserialize, Serialize};

/// Sentinel id for a node that exists in the graph but has no assigned id yet.
pub const MISSING_ID: &str = "MISSING";

/// Category of an extracted entity.
///
/// The extraction collaborator emits free-form label strings; the known
/// categories are closed into this enum, with `Other` catching any label the
/// schema does not name. `Other` labels still get a generic lookup path, so
/// an unexpected category degrades to exact-match resolution instead of
/// failing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityKind {
    Person,
    Topic,
    State,
    Event,
    Organization,
    Place,
    Pet,
    Object,
    Other(String),
}

impl EntityKind {
    /// The graph label for this category.
    pub fn label(&self) -> &str {
        match self {
            Self::Person => "Person",
            Self::Topic => "Topic",
            Self::State => "State",
            Self::Event => "Event",
            Self::Organization => "Organization",
            Self::Place => "Place",
            Self::Pet => "Pet",
            Self::Object => "Object",
            Self::Other(label) => label,
        }
    }
}

impl From<String> for EntityKind {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Person" => Self::Person,
            "Topic" => Self::Topic,
            "State" => Self::State,
            "Event" => Self::Event,
            "Organization" => Self::Organization,
            "Place" => Self::Place,
            "Pet" => Self::Pet,
            "Object" => Self::Object,
            _ => Self::Other(label),
        }
    }
}

impl From<&str> for EntityKind {
    fn from(label: &str) -> Self {
        label.to_string().into()
    }
}

impl From<EntityKind> for String {
    fn from(kind: EntityKind) -> Self {
        kind.label().to_string()
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// An entity mentioned in a journal entry.
///
/// Identity within a turn is by `(kind, name)`; identity in the graph is by
/// an opaque id (or [`MISSING_ID`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub name: String,
    /// Relation to the journal author, if stated ("former workplace", "friend").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
}

impl Entity {
    pub fn new(kind: impl Into<EntityKind>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            relation: None,
        }
    }

    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = Some(relation.into());
        self
    }
}

/// An event described in a journal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEvent {
    pub description: String,
    /// Event category ("conflict", "achievement", "business", ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// When the event happened (YYYY-MM-DD, best estimate).
    pub timestamp: String,
    /// The journal entry date this event was written under, when the input
    /// carried multiple dated entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_date: Option<String>,
    /// False when the timing is vague and needs clarification.
    pub is_clarified: bool,
}

/// Extraction from a single dated journal entry.
///
/// One turn of input may describe several distinct dated entries; the
/// extractor emits one of these per date it finds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntryExtraction {
    /// Date of this specific entry (YYYY-MM-DD).
    pub entry_date: String,
    /// Emotional state expressed in this entry.
    pub mood: String,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub events: Vec<ExtractedEvent>,
}

/// Full output of the extraction collaborator for one turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionOutput {
    pub entries: Vec<JournalEntryExtraction>,
    /// Combined search query covering all entries, used by retrieval.
    #[serde(default)]
    pub search_query: String,
}

impl ExtractionOutput {
    /// All entities across every dated entry, in extraction order.
    pub fn all_entities(&self) -> impl Iterator<Item = &Entity> {
        self.entries.iter().flat_map(|entry| entry.entities.iter())
    }

    /// Total entity count across entries.
    pub fn entity_count(&self) -> usize {
        self.entries.iter().map(|e| e.entities.len()).sum()
    }
}
