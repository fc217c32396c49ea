//! Entity resolution against the graph.
//!
//! For each extracted entity the resolver first consults learned alias
//! records, then falls back to a kind-specific lookup. Matching is
//! deliberately conservative for exact-name kinds (Topic, State) and
//! permissive for people, whose surface names vary across languages and
//! diminutives.

use engram_graph::SharedStore;
use engram_types::{
    EntityKind, ExtractionOutput, MISSING_ID, NewEntity, ResolutionResult, ResolutionSource,
    ResolvedEntity,
};
use serde_json::{Value, json};

/// Partitions extracted entities into already-known and not-yet-known.
pub struct EntityResolver {
    store: SharedStore,
}

const ALIAS_LOOKUP: &str = "\
MATCH (a:Alias)
WHERE toLower(a.from_name) = toLower($name)
RETURN a.canonical_id AS id, a.to_name AS name
LIMIT 1";

const PERSON_LOOKUP: &str = "\
MATCH (p:Person)
WHERE CASE
    WHEN p.name IS :: LIST<STRING> THEN ANY(n IN p.name WHERE toLower(n) CONTAINS toLower($name))
    ELSE toLower(p.name) CONTAINS toLower($name)
END
RETURN coalesce(p.id, 'MISSING') AS id,
       CASE WHEN p.name IS :: LIST<STRING> THEN p.name[0] ELSE p.name END AS name
LIMIT 1";

const TOPIC_LOOKUP: &str = "\
MATCH (t:Topic) WHERE toLower(t.name) = toLower($name)
RETURN coalesce(t.id, 'MISSING') AS id, t.name AS name
LIMIT 1";

const STATE_LOOKUP: &str = "\
MATCH (s:State) WHERE toLower(s.name) = toLower($name)
RETURN coalesce(s.id, 'MISSING') AS id, s.name AS name
LIMIT 1";

const EVENT_LOOKUP: &str = "\
MATCH (e:Event) WHERE toLower(e.type) = toLower($name)
RETURN coalesce(e.id, 'MISSING') AS id, e.type AS name
LIMIT 1";

impl EntityResolver {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Resolve every entity in the extraction output.
    ///
    /// Every input entity lands in exactly one partition. A store error for
    /// an individual entity records it as new rather than failing the turn.
    pub async fn resolve(&self, extraction: &ExtractionOutput) -> ResolutionResult {
        let mut result = ResolutionResult::default();

        let entities: Vec<_> = extraction.all_entities().collect();
        tracing::debug!(
            entities = entities.len(),
            entries = extraction.entries.len(),
            "resolving extracted entities"
        );

        for entity in entities {
            if entity.name.is_empty() {
                continue;
            }
            match self.resolve_one(&entity.kind, &entity.name).await {
                Some(resolved) => {
                    if resolved.source == ResolutionSource::Alias {
                        tracing::info!(
                            surface = %entity.name,
                            canonical = %resolved.name,
                            "resolved through learned alias"
                        );
                    }
                    result.existing.push(resolved);
                }
                None => result.new.push(NewEntity {
                    name: entity.name.clone(),
                    kind: entity.kind.clone(),
                }),
            }
        }

        tracing::info!(
            existing = result.existing.len(),
            new = result.new.len(),
            "entity resolution complete"
        );
        result
    }

    /// Alias mapping first, then the kind-specific lookup. `None` means the
    /// entity is new (including the error case).
    async fn resolve_one(&self, kind: &EntityKind, name: &str) -> Option<ResolvedEntity> {
        let params = json!({ "name": name });

        match self.store.read(ALIAS_LOOKUP, Some(params.clone())).await {
            Ok(rows) => {
                if let Some(row) = rows.first() {
                    return Some(ResolvedEntity {
                        id: row_string(row, "id"),
                        name: row_string(row, "name"),
                        kind: kind.clone(),
                        original_query: name.to_string(),
                        source: ResolutionSource::Alias,
                    });
                }
            }
            Err(e) => {
                tracing::warn!(name, error = %e, "alias lookup failed");
            }
        }

        let statement = match kind {
            EntityKind::Person => PERSON_LOOKUP.to_string(),
            EntityKind::Topic => TOPIC_LOOKUP.to_string(),
            EntityKind::State => STATE_LOOKUP.to_string(),
            EntityKind::Event => EVENT_LOOKUP.to_string(),
            other => generic_lookup(other.label()),
        };

        match self.store.read(&statement, Some(params)).await {
            Ok(rows) => rows.first().map(|row| ResolvedEntity {
                id: row_string(row, "id"),
                name: row_string(row, "name"),
                kind: kind.clone(),
                original_query: name.to_string(),
                source: ResolutionSource::Lookup,
            }),
            Err(e) => {
                tracing::warn!(name, label = kind.label(), error = %e, "entity lookup failed, treating as new");
                None
            }
        }
    }
}

fn generic_lookup(label: &str) -> String {
    format!(
        "MATCH (n:{label}) WHERE toLower(n.name) = toLower($name)\n\
         RETURN coalesce(n.id, 'MISSING') AS id, n.name AS name\n\
         LIMIT 1"
    )
}

fn row_string(row: &Value, key: &str) -> String {
    match row.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .first()
            .and_then(Value::as_str)
            .unwrap_or(MISSING_ID)
            .to_string(),
        _ => MISSING_ID.to_string(),
    }
}
