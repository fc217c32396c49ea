//! Post-write consistency checking.
//!
//! The reflex loop that runs after facts land in the graph: look for nodes
//! that are probably the same real-world thing, collapse each pair into the
//! better-connected node, and record an alias so the duplicate name resolves
//! directly on future turns.
//!
//! Two detection strategies run per label. Name similarity catches exact and
//! containment matches outright. Topology looks at pairs sharing a persisted
//! journal-entry neighbor and additionally accepts store-side fuzzy
//! similarity; when the store lacks the similarity function the strategy
//! degrades to nothing rather than failing the run.

use engram_config::ConsistencyConfig;
use engram_graph::SharedStore;
use engram_types::AliasRecord;
use serde_json::{Value, json};

/// Outcome counts for one consistency run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    pub duplicates_found: usize,
    pub merged: usize,
    pub aliases_created: usize,
}

/// A candidate duplicate pair, already ordered: `keep` is the node that
/// survives the merge.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicatePair {
    pub keep_id: String,
    pub keep_name: String,
    pub remove_id: String,
    pub remove_name: String,
}

/// Detects and collapses duplicate nodes after a write.
pub struct ConsistencyChecker {
    store: SharedStore,
    config: ConsistencyConfig,
}

impl ConsistencyChecker {
    pub fn new(store: SharedStore, config: ConsistencyConfig) -> Self {
        Self { store, config }
    }

    /// Run duplicate detection and merging for each of the given labels.
    ///
    /// A failure while merging a pair skips that pair only; the run always
    /// produces a report.
    pub async fn run(&self, labels: &[String]) -> ConsistencyReport {
        let mut report = ConsistencyReport::default();

        for label in labels {
            let mut pairs = self.find_by_name(label).await;
            for pair in self.find_by_topology(label).await {
                if !pairs.iter().any(|p| same_pair(p, &pair)) {
                    pairs.push(pair);
                }
            }
            report.duplicates_found += pairs.len();

            if pairs.is_empty() {
                tracing::debug!(label, "no duplicate candidates");
                continue;
            }
            tracing::info!(label, candidates = pairs.len(), "found duplicate candidates");

            for pair in pairs {
                if !self.merge(label, &pair).await {
                    continue;
                }
                report.merged += 1;
                tracing::info!(
                    label,
                    remove = %pair.remove_name,
                    keep = %pair.keep_name,
                    "merged duplicate node"
                );
                let alias =
                    AliasRecord::confirmed(&pair.remove_name, &pair.keep_name, &pair.keep_id);
                if self.create_alias(&alias).await {
                    report.aliases_created += 1;
                }
            }
        }

        report
    }

    /// Pairs whose names are equal or contain one another, case-insensitive.
    async fn find_by_name(&self, label: &str) -> Vec<DuplicatePair> {
        let statement = format!(
            r#"MATCH (a:{label}), (b:{label})
WHERE a.id < b.id
  AND (
    toLower(a.name) = toLower(b.name)
    OR toLower(a.name) CONTAINS toLower(b.name)
    OR toLower(b.name) CONTAINS toLower(a.name)
  )
RETURN
  a.id AS id_a, a.name AS name_a, COUNT {{ (a)--() }} AS weight_a,
  b.id AS id_b, b.name AS name_b, COUNT {{ (b)--() }} AS weight_b
LIMIT {limit}"#,
            limit = self.config.candidate_limit
        );

        match self.store.read(&statement, None).await {
            Ok(rows) => rows.iter().filter_map(order_pair).collect(),
            Err(e) => {
                tracing::warn!(label, error = %e, "name-similarity check failed");
                Vec::new()
            }
        }
    }

    /// Pairs sharing a journal-entry neighbor whose names are contained in
    /// one another or fuzzily similar. Requires a store-side similarity
    /// function; its absence degrades to no candidates.
    async fn find_by_topology(&self, label: &str) -> Vec<DuplicatePair> {
        let statement = format!(
            r#"MATCH (a:{label})<-[:MENTIONS]-(j:JournalEntry)-[:MENTIONS]->(b:{label})
WHERE a.id < b.id
  AND (
    toLower(a.name) CONTAINS toLower(b.name)
    OR toLower(b.name) CONTAINS toLower(a.name)
    OR apoc.text.levenshteinSimilarity(a.name, b.name) > {threshold}
  )
RETURN DISTINCT
  a.id AS id_a, a.name AS name_a, COUNT {{ (a)--() }} AS weight_a,
  b.id AS id_b, b.name AS name_b, COUNT {{ (b)--() }} AS weight_b,
  count(j) AS shared_entries
ORDER BY shared_entries DESC
LIMIT {limit}"#,
            threshold = self.config.fuzzy_threshold,
            limit = self.config.candidate_limit
        );

        match self.store.read(&statement, None).await {
            Ok(rows) => rows.iter().filter_map(order_pair).collect(),
            Err(e) => {
                tracing::debug!(label, error = %e, "topology check unavailable");
                Vec::new()
            }
        }
    }

    /// Delete the duplicate node. Edges are not transferred; the alias record
    /// preserves the name mapping.
    async fn merge(&self, label: &str, pair: &DuplicatePair) -> bool {
        let statement = format!(
            "MATCH (remove:{label} {{id: $remove_id}})\n\
             DETACH DELETE remove\n\
             RETURN count(*) AS deleted"
        );
        let params = json!({ "remove_id": pair.remove_id });

        match self.store.write(&statement, Some(params)).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(
                    label,
                    remove_id = %pair.remove_id,
                    error = %e,
                    "merge failed, skipping pair"
                );
                false
            }
        }
    }

    async fn create_alias(&self, alias: &AliasRecord) -> bool {
        let statement = "\
MERGE (a:Alias {from_name: $from_name, to_name: $to_name})
SET a.canonical_id = $canonical_id,
    a.created_at = datetime(),
    a.confidence = $confidence
RETURN a.from_name AS created";
        let params = json!({
            "from_name": alias.from_name,
            "to_name": alias.to_name,
            "canonical_id": alias.canonical_id,
            "confidence": alias.confidence,
        });

        match self.store.write(statement, Some(params)).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(from = %alias.from_name, error = %e, "alias creation failed");
                false
            }
        }
    }
}

/// Turn a candidate row into an ordered pair: the higher-weight node is
/// kept, ties break toward the lowest id.
fn order_pair(row: &Value) -> Option<DuplicatePair> {
    let id_a = row.get("id_a")?.as_str()?.to_string();
    let name_a = row.get("name_a")?.as_str()?.to_string();
    let id_b = row.get("id_b")?.as_str()?.to_string();
    let name_b = row.get("name_b")?.as_str()?.to_string();
    let weight_a = row.get("weight_a").and_then(Value::as_u64).unwrap_or(0);
    let weight_b = row.get("weight_b").and_then(Value::as_u64).unwrap_or(0);

    let a_keeps = match weight_a.cmp(&weight_b) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => id_a <= id_b,
    };

    Some(if a_keeps {
        DuplicatePair {
            keep_id: id_a,
            keep_name: name_a,
            remove_id: id_b,
            remove_name: name_b,
        }
    } else {
        DuplicatePair {
            keep_id: id_b,
            keep_name: name_b,
            remove_id: id_a,
            remove_name: name_a,
        }
    })
}

fn same_pair(a: &DuplicatePair, b: &DuplicatePair) -> bool {
    (a.keep_id == b.keep_id && a.remove_id == b.remove_id)
        || (a.keep_id == b.remove_id && a.remove_id == b.keep_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_graph::MockGraph;
    use std::sync::Arc;

    fn pair_row(
        id_a: &str,
        name_a: &str,
        weight_a: u64,
        id_b: &str,
        name_b: &str,
        weight_b: u64,
    ) -> Value {
        json!({
            "id_a": id_a, "name_a": name_a, "weight_a": weight_a,
            "id_b": id_b, "name_b": name_b, "weight_b": weight_b,
        })
    }

    fn checker(mock: Arc<MockGraph>) -> ConsistencyChecker {
        ConsistencyChecker::new(mock, ConsistencyConfig::default())
    }

    #[test]
    fn test_higher_weight_keeps() {
        let row = pair_row("person_3", "Sashka", 3, "person_1", "Sasha", 10);
        let pair = order_pair(&row).unwrap();
        assert_eq!(pair.keep_id, "person_1");
        assert_eq!(pair.remove_id, "person_3");
        assert_eq!(pair.remove_name, "Sashka");
    }

    #[test]
    fn test_weight_tie_breaks_to_lowest_id() {
        let row = pair_row("person_9", "Olia", 4, "person_2", "Olha", 4);
        let pair = order_pair(&row).unwrap();
        assert_eq!(pair.keep_id, "person_2");
        assert_eq!(pair.remove_id, "person_9");
    }

    #[tokio::test]
    async fn test_merge_then_alias() {
        let mock = Arc::new(MockGraph::new());
        mock.on(
            "MATCH (a:Person), (b:Person)",
            vec![pair_row("person_1", "Sasha", 10, "person_3", "Sashka", 3)],
        )
        .await;

        let report = checker(mock.clone()).run(&["Person".to_string()]).await;

        assert_eq!(
            report,
            ConsistencyReport {
                duplicates_found: 1,
                merged: 1,
                aliases_created: 1,
            }
        );

        let statements = mock.statements().await;
        let delete = statements
            .iter()
            .find(|s| s.contains("DETACH DELETE"))
            .unwrap();
        assert!(delete.contains("MATCH (remove:Person"));
        assert!(statements.iter().any(|s| s.contains("MERGE (a:Alias")));
    }

    #[tokio::test]
    async fn test_topology_failure_degrades() {
        let mock = Arc::new(MockGraph::new());
        mock.on(
            "MATCH (a:Person), (b:Person)",
            vec![pair_row("person_1", "Sasha", 10, "person_3", "Sashka", 3)],
        )
        .await;
        mock.fail_on("levenshteinSimilarity", "Unknown function 'apoc.text.levenshteinSimilarity'")
            .await;

        let report = checker(mock).run(&["Person".to_string()]).await;
        assert_eq!(report.duplicates_found, 1);
        assert_eq!(report.merged, 1);
    }

    #[tokio::test]
    async fn test_failed_merge_skips_pair_only() {
        let mock = Arc::new(MockGraph::new());
        mock.on(
            "MATCH (a:Person), (b:Person)",
            vec![
                pair_row("person_1", "Sasha", 10, "person_3", "Sashka", 3),
                pair_row("person_2", "Olha", 8, "person_5", "Olia", 2),
            ],
        )
        .await;
        mock.fail_on("DETACH DELETE", "deadlock").await;

        let report = checker(mock).run(&["Person".to_string()]).await;
        assert_eq!(report.duplicates_found, 2);
        assert_eq!(report.merged, 0);
        assert_eq!(report.aliases_created, 0);
    }

    #[tokio::test]
    async fn test_duplicate_candidates_across_strategies_counted_once() {
        let mock = Arc::new(MockGraph::new());
        let row = pair_row("person_1", "Sasha", 10, "person_3", "Sashka", 3);
        mock.on("MATCH (a:Person), (b:Person)", vec![row.clone()]).await;
        mock.on("levenshteinSimilarity", vec![row]).await;

        let report = checker(mock).run(&["Person".to_string()]).await;
        assert_eq!(report.duplicates_found, 1);
        assert_eq!(report.merged, 1);
    }

    #[tokio::test]
    async fn test_no_candidates_is_clean_report() {
        let mock = Arc::new(MockGraph::new());
        let report = checker(mock.clone()).run(&["Topic".to_string()]).await;
        assert_eq!(report, ConsistencyReport::default());
        // Both detection queries still ran.
        assert_eq!(mock.statement_count().await, 2);
    }
}
