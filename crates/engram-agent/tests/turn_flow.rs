//! End-to-end turn scenarios against scripted collaborators and a scripted
//! graph store.

use std::sync::Arc;

use engram_agent::{
    AgentError, Collaborators, MockCollaborator, TurnOrchestrator, TurnOutcome,
};
use engram_config::EngramConfig;
use engram_graph::MockGraph;
use engram_types::{
    Entity, EventAuthor, ExtractionOutput, JournalEntryExtraction, MergeCommand, RetrievalOutput,
    Route, RoutingDecision,
};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn test_config() -> EngramConfig {
    let mut config = EngramConfig::default();
    // Keep retry backoff out of test wall time.
    config.retry.initial_delay_ms = 1;
    config
}

fn orchestrator(
    mock: Arc<MockCollaborator>,
    graph: Arc<MockGraph>,
) -> TurnOrchestrator {
    TurnOrchestrator::new(Collaborators::uniform(mock), graph, &test_config())
}

fn extraction_with(entities: Vec<Entity>) -> ExtractionOutput {
    ExtractionOutput {
        entries: vec![JournalEntryExtraction {
            entry_date: "2026-08-26".to_string(),
            mood: "thoughtful".to_string(),
            entities,
            events: vec![],
        }],
        search_query: "journal search".to_string(),
    }
}

#[tokio::test]
async fn skip_route_responds_without_persisting() {
    let mock = Arc::new(MockCollaborator::new());
    mock.push_route(RoutingDecision::new(Route::Skip)).await;
    mock.set_response("Noted.").await;
    let graph = Arc::new(MockGraph::new());

    let mut orch = orchestrator(mock.clone(), graph.clone());
    let outcome = orch.run_turn("ok").await.unwrap();

    assert_eq!(
        outcome,
        TurnOutcome::Response {
            route: Route::Skip,
            text: "Noted.".to_string(),
        }
    );
    // No extraction, no authoring, no graph traffic.
    assert!(mock.extract_requests().await.is_empty());
    assert!(mock.author_requests().await.is_empty());
    assert_eq!(graph.statement_count().await, 0);
}

#[tokio::test]
async fn clarify_route_passes_missing_tags() {
    let mock = Arc::new(MockCollaborator::new());
    mock.push_route(RoutingDecision::clarify(vec![
        "feelings".to_string(),
        "reason".to_string(),
    ]))
    .await;
    mock.set_response("How do you feel about it?").await;
    let graph = Arc::new(MockGraph::new());

    let mut orch = orchestrator(mock.clone(), graph.clone());
    let outcome = orch.run_turn("I have an interview tomorrow").await.unwrap();

    assert!(matches!(
        outcome,
        TurnOutcome::Response { route: Route::Clarify, .. }
    ));
    let requests = mock.respond_requests().await;
    assert_eq!(requests.len(), 1);
    assert!(requests[0].missing.contains(&"feelings".to_string()));
    assert_eq!(graph.statement_count().await, 0);
}

#[tokio::test]
async fn no_routing_decision_aborts_silently() {
    let mock = Arc::new(MockCollaborator::new());
    let graph = Arc::new(MockGraph::new());

    let mut orch = orchestrator(mock.clone(), graph.clone());
    let outcome = orch.run_turn("something").await.unwrap();

    assert_eq!(outcome, TurnOutcome::NoDecision);
    assert!(mock.respond_requests().await.is_empty());
    assert_eq!(graph.statement_count().await, 0);
}

#[tokio::test]
async fn unhandled_route_is_ignored() {
    let mock = Arc::new(MockCollaborator::new());
    mock.push_route(RoutingDecision::new("READ")).await;
    let graph = Arc::new(MockGraph::new());

    let mut orch = orchestrator(mock.clone(), graph.clone());
    let outcome = orch.run_turn("what did I write last week?").await.unwrap();

    assert_eq!(
        outcome,
        TurnOutcome::Ignored {
            route: "READ".to_string()
        }
    );
    assert!(mock.respond_requests().await.is_empty());
}

#[tokio::test]
async fn write_route_runs_full_pipeline() {
    let mock = Arc::new(MockCollaborator::new());
    mock.push_route(RoutingDecision::new(Route::Write)).await;
    mock.set_extraction(extraction_with(vec![
        Entity::new("Person", "Olha"),
        Entity::new("Topic", "gardening"),
    ]))
    .await;
    mock.set_retrieval(RetrievalOutput {
        findings: "Olha appeared in two earlier entries.".to_string(),
        merge_commands: vec![],
    })
    .await;
    mock.set_statements(vec![
        "CREATE (j:JournalEntry {content: $content})".to_string(),
        "MERGE (t:Topic {name: 'gardening'})".to_string(),
    ])
    .await;
    mock.set_response("Saved. Olha again — she keeps coming up.").await;

    let graph = Arc::new(MockGraph::new());
    graph
        .on("MATCH (p:Person)", vec![json!({"id": "person_7", "name": "Olha"})])
        .await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut orch = orchestrator(mock.clone(), graph.clone()).with_notices(tx);
    let outcome = orch
        .run_turn("Spent the evening gardening with Olha, felt calm for once")
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        TurnOutcome::Response { route: Route::Write, .. }
    ));

    // The acknowledgment went out before any network call could answer.
    assert!(rx.try_recv().is_ok());

    // Both authored statements were executed against the store.
    let statements = graph.statements().await;
    assert!(statements.iter().any(|s| s.contains("CREATE (j:JournalEntry")));
    assert!(statements.iter().any(|s| s.contains("MERGE (t:Topic")));

    // Authoring saw the resolution partition.
    let author_requests = mock.author_requests().await;
    assert_eq!(author_requests.len(), 1);
    let resolution = &author_requests[0].resolution;
    assert!(resolution.is_existing("Olha"));
    assert!(resolution.is_new("gardening"));

    // The log was pruned down to the load-bearing events.
    let authors: Vec<EventAuthor> = orch.events().iter().map(|e| e.author).collect();
    assert_eq!(
        authors,
        vec![EventAuthor::User, EventAuthor::Extractor, EventAuthor::Assistant]
    );
}

#[tokio::test]
async fn write_blocks_delete_targeting_unresolved_id() {
    let mock = Arc::new(MockCollaborator::new());
    mock.push_route(RoutingDecision::new(Route::Write)).await;
    mock.set_extraction(extraction_with(vec![Entity::new("Person", "Olha")]))
        .await;
    mock.set_retrieval(RetrievalOutput {
        findings: String::new(),
        merge_commands: vec![],
    })
    .await;
    mock.set_statements(vec![
        "CREATE (j:JournalEntry {content: $content})".to_string(),
        r#"MATCH (remove {id: "MISSING"}) DETACH DELETE remove"#.to_string(),
    ])
    .await;
    mock.set_response("Saved.").await;

    let graph = Arc::new(MockGraph::new());
    let mut orch = orchestrator(mock.clone(), graph.clone());
    let outcome = orch.run_turn("Olha called today").await.unwrap();

    // The turn completes; only the safe statement reached the store.
    assert!(matches!(
        outcome,
        TurnOutcome::Response { route: Route::Write, .. }
    ));
    let statements = graph.statements().await;
    assert!(statements.iter().any(|s| s.contains("CREATE (j:JournalEntry")));
    assert!(!statements.iter().any(|s| s.contains("DETACH DELETE")));
}

#[tokio::test]
async fn write_forwards_merge_commands_to_authoring() {
    let mock = Arc::new(MockCollaborator::new());
    mock.push_route(RoutingDecision::new(Route::Write)).await;
    mock.set_extraction(extraction_with(vec![Entity::new("Person", "Sashka")]))
        .await;
    mock.set_retrieval(RetrievalOutput {
        findings: "Sashka is likely the known person Sasha.".to_string(),
        merge_commands: vec![MergeCommand {
            keep_id: "person_1".to_string(),
            keep_name: "Sasha".to_string(),
            remove_id: "NEW".to_string(),
            remove_name: "Sashka".to_string(),
            reason: "diminutive of the same name".to_string(),
        }],
    })
    .await;
    mock.set_response("Saved.").await;
    let graph = Arc::new(MockGraph::new());

    let mut orch = orchestrator(mock.clone(), graph);
    orch.run_turn("Sashka called me today, we talked for an hour about her move")
        .await
        .unwrap();

    let author_requests = mock.author_requests().await;
    assert_eq!(author_requests[0].merge_commands.len(), 1);
    assert_eq!(author_requests[0].merge_commands[0].keep_id, "person_1");
}

#[tokio::test]
async fn write_merges_duplicate_into_heavier_node() {
    let mock = Arc::new(MockCollaborator::new());
    mock.push_route(RoutingDecision::new(Route::Write)).await;
    mock.set_extraction(extraction_with(vec![Entity::new("Person", "Sashka")]))
        .await;
    mock.set_response("Saved.").await;

    let graph = Arc::new(MockGraph::new());
    // Sashka resolves to nothing; the consistency pass finds the pair, with
    // Sasha (person_1) the far better-connected node.
    graph
        .on(
            "MATCH (a:Person), (b:Person)",
            vec![json!({
                "id_a": "person_9", "name_a": "Sashka", "weight_a": 3,
                "id_b": "person_1", "name_b": "Sasha", "weight_b": 30,
            })],
        )
        .await;

    let mut orch = orchestrator(mock, graph.clone());
    orch.run_turn("Sashka and I went hiking, it helped me clear my head")
        .await
        .unwrap();

    let statements = graph.statements().await;
    let delete = statements.iter().find(|s| s.contains("DETACH DELETE")).unwrap();
    assert!(delete.contains("MATCH (remove:Person"));
    let alias = statements.iter().find(|s| s.contains("MERGE (a:Alias")).unwrap();
    assert!(alias.contains("canonical_id"));
}

#[tokio::test]
async fn write_with_two_dated_entries_keeps_both() {
    let mock = Arc::new(MockCollaborator::new());
    mock.push_route(RoutingDecision::new(Route::Write)).await;
    mock.set_extraction(ExtractionOutput {
        entries: vec![
            JournalEntryExtraction {
                entry_date: "2018-11-24".to_string(),
                mood: "anxious".to_string(),
                entities: vec![Entity::new("Topic", "job search")],
                events: vec![],
            },
            JournalEntryExtraction {
                entry_date: "2018-12-05".to_string(),
                mood: "relieved".to_string(),
                entities: vec![Entity::new("Organization", "the studio")],
                events: vec![],
            },
        ],
        search_query: "job search studio".to_string(),
    })
    .await;
    mock.set_response("Both days saved.").await;
    let graph = Arc::new(MockGraph::new());

    let mut orch = orchestrator(mock.clone(), graph);
    orch.run_turn("2018-11-24 I was searching... 2018-12-05 the studio said yes")
        .await
        .unwrap();

    let author_requests = mock.author_requests().await;
    let entries = &author_requests[0].extraction.entries;
    assert_eq!(entries.len(), 2);
    assert_ne!(entries[0].entry_date, entries[1].entry_date);
}

#[tokio::test]
async fn transient_retrieval_failures_are_retried() {
    let mock = Arc::new(MockCollaborator::new());
    mock.push_route(RoutingDecision::new(Route::Write)).await;
    mock.set_extraction(extraction_with(vec![Entity::new("Topic", "running")]))
        .await;
    mock.fail_retrievals(2).await;
    mock.set_response("Saved.").await;
    let graph = Arc::new(MockGraph::new());

    let mut orch = orchestrator(mock.clone(), graph);
    let outcome = orch
        .run_turn("Started running again this week and it finally feels good")
        .await
        .unwrap();

    assert!(matches!(outcome, TurnOutcome::Response { .. }));
    // Two failures, one success: exactly three invocations.
    assert_eq!(mock.retrieve_requests().await.len(), 3);
}

#[tokio::test]
async fn second_turn_sees_first_as_written() {
    let mock = Arc::new(MockCollaborator::new());
    mock.push_route(RoutingDecision::new(Route::Write)).await;
    mock.push_route(RoutingDecision::new(Route::Skip)).await;
    mock.set_extraction(extraction_with(vec![Entity::new("Topic", "moving")]))
        .await;
    mock.set_response("Saved.").await;
    let graph = Arc::new(MockGraph::new());

    let mut orch = orchestrator(mock.clone(), graph);
    orch.run_turn("We finally signed the lease, I'm relieved and a bit scared")
        .await
        .unwrap();
    orch.run_turn("ok").await.unwrap();

    // The second turn's routing saw the first turn on the written side of
    // the extraction marker.
    let route_requests = mock.route_requests().await;
    assert_eq!(route_requests.len(), 2);
    assert!(route_requests[1].previous_context.contains("signed the lease"));
    assert_eq!(route_requests[1].current_thoughts, "ok");
}

#[tokio::test]
async fn cancelled_turn_abandons_write_pipeline() {
    let mock = Arc::new(MockCollaborator::new());
    mock.push_route(RoutingDecision::new(Route::Write)).await;
    mock.set_extraction(extraction_with(vec![Entity::new("Topic", "anything")]))
        .await;
    // Keep the extractor failing so the retry loop would spin if not cancelled.
    mock.fail_extractions(u32::MAX).await;
    let graph = Arc::new(MockGraph::new());

    let token = CancellationToken::new();
    token.cancel();
    let mut orch = orchestrator(mock, graph.clone()).with_cancellation(token);

    let err = orch
        .run_turn("This thought will never finish writing")
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::Cancelled));
    assert_eq!(graph.statement_count().await, 0);
}

#[tokio::test]
async fn empty_extraction_for_nonempty_input_is_contract_violation() {
    let mock = Arc::new(MockCollaborator::new());
    mock.push_route(RoutingDecision::new(Route::Write)).await;
    // Default script: no entries.
    let graph = Arc::new(MockGraph::new());

    let mut orch = orchestrator(mock, graph);
    let err = orch
        .run_turn("A long and substantial thought about my week")
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::Contract(_)));
}
