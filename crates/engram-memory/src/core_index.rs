//! Core-entity index.
//!
//! The "core" of the graph is its well-connected nodes. The index is loaded
//! once per writing turn and handed to retrieval and statement authoring so
//! new facts attach to canonical nodes instead of spawning near-duplicates.

use std::collections::BTreeMap;

use engram_config::CoreEntityConfig;
use engram_graph::SharedStore;
use engram_types::{CoreEntity, MISSING_ID};
use serde_json::{Value, json};

/// Core entities grouped by primary label, each group in descending weight
/// order.
pub type CoreEntityIndex = BTreeMap<String, Vec<CoreEntity>>;

/// Loads the core-entity index from the graph.
pub struct CoreIndexService {
    store: SharedStore,
    config: CoreEntityConfig,
}

impl CoreIndexService {
    pub fn new(store: SharedStore, config: CoreEntityConfig) -> Self {
        Self { store, config }
    }

    /// Load the full index in a single query.
    ///
    /// Pinned labels qualify regardless of weight; everything else needs a
    /// degree at or above the threshold. A store failure yields an empty
    /// index with a warning rather than an error: the index is advisory.
    pub async fn load(&self) -> CoreEntityIndex {
        let statement = self.build_statement();
        let params = json!({ "threshold": self.config.weight_threshold });

        let rows = match self.store.read(&statement, Some(params)).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(error = %e, "core-entity load failed, using empty index");
                return CoreEntityIndex::new();
            }
        };

        let mut index = CoreEntityIndex::new();
        for row in &rows {
            let labels = row
                .get("labels")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let primary = labels
                .first()
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_string();

            index.entry(primary).or_default().push(CoreEntity {
                id: str_or_missing(row, "id"),
                name: str_or_missing(row, "name"),
                weight: row.get("weight").and_then(Value::as_u64).unwrap_or(0),
            });
        }

        let total: usize = index.values().map(Vec::len).sum();
        tracing::info!(
            total,
            labels = index.len(),
            threshold = self.config.weight_threshold,
            "core-entity index loaded"
        );
        index
    }

    fn build_statement(&self) -> String {
        let excluded = self
            .config
            .excluded_labels
            .iter()
            .map(|l| format!("  AND NOT '{l}' IN labels(n)"))
            .collect::<Vec<_>>()
            .join("\n");
        let pinned = self
            .config
            .pinned_labels
            .iter()
            .map(|l| format!("'{l}'"))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            r#"MATCH (n)
WHERE n.name IS NOT NULL
{excluded}
  AND (
    any(label IN labels(n) WHERE label IN [{pinned}])
    OR COUNT {{ (n)--() }} >= $threshold
  )
RETURN DISTINCT
    coalesce(n.id, 'MISSING') AS id,
    CASE WHEN n.name IS :: LIST<STRING> THEN n.name[0] ELSE n.name END AS name,
    labels(n) AS labels,
    COUNT {{ (n)--() }} AS weight
ORDER BY weight DESC
LIMIT {limit}"#,
            limit = self.config.limit
        )
    }
}

fn str_or_missing(row: &Value, key: &str) -> String {
    row.get(key)
        .and_then(Value::as_str)
        .unwrap_or(MISSING_ID)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_graph::MockGraph;
    use std::sync::Arc;

    fn service(mock: Arc<MockGraph>) -> CoreIndexService {
        CoreIndexService::new(mock, CoreEntityConfig::default())
    }

    #[tokio::test]
    async fn test_groups_by_primary_label() {
        let mock = Arc::new(MockGraph::new());
        mock.on(
            "ORDER BY weight DESC",
            vec![
                json!({"id": "person_1", "name": "Kirill", "labels": ["Person"], "weight": 42}),
                json!({"id": "person_2", "name": "Sasha", "labels": ["Person"], "weight": 28}),
                json!({"id": "topic_1", "name": "woodworking", "labels": ["Topic"], "weight": 5}),
            ],
        )
        .await;

        let index = service(mock).load().await;

        assert_eq!(index.len(), 2);
        assert_eq!(index["Person"].len(), 2);
        assert_eq!(index["Person"][0].name, "Kirill");
        assert_eq!(index["Person"][0].weight, 42);
        assert_eq!(index["Topic"][0].id, "topic_1");
    }

    #[tokio::test]
    async fn test_load_failure_yields_empty_index() {
        let mock = Arc::new(MockGraph::new());
        mock.fail_on("MATCH (n)", "store offline").await;

        let index = service(mock).load().await;
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn test_statement_carries_config() {
        let service = CoreIndexService::new(
            Arc::new(MockGraph::new()),
            CoreEntityConfig::default(),
        );
        let statement = service.build_statement();

        assert!(statement.contains("NOT 'JournalEntry' IN labels(n)"));
        assert!(statement.contains("NOT 'Alias' IN labels(n)"));
        assert!(statement.contains("'Person', 'Organization'"));
        assert!(statement.contains("LIMIT 200"));
    }

    #[tokio::test]
    async fn test_missing_fields_use_sentinel() {
        let mock = Arc::new(MockGraph::new());
        mock.on(
            "ORDER BY weight DESC",
            vec![json!({"labels": ["State"], "weight": 7})],
        )
        .await;

        let index = service(mock).load().await;
        assert_eq!(index["State"][0].id, MISSING_ID);
        assert_eq!(index["State"][0].name, MISSING_ID);
    }
}
