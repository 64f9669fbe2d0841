//! End-to-end propagation tests.
//!
//! Each test seeds a `MemoryStore`, runs `Justifier::propagate()` and reads
//! the committed tables back through the `GraphStore` trait.

use justify_graph::storage::{Collection, GraphStore};
use justify_graph::{Edge, EngineConfig, Justifier, MemoryStore, NodeId, ScoreTable, PropagationEngine};
use pretty_assertions::assert_eq;

fn assert_close(actual: Option<f64>, expected: f64) {
    let actual = actual.unwrap_or_else(|| panic!("expected {expected}, got nothing"));
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

fn id(uri: &str) -> NodeId {
    NodeId::new(uri)
}

// ============================================================================
// 1. Two-hop chain: the second hop only lands in round 2
// ============================================================================

#[tokio::test]
async fn test_chain_two_rounds() {
    let justifier = Justifier::open_memory().unwrap();
    justifier.store().insert_edges([
        Edge::new("/", "/c/en/a", "justifies", 0.5),
        Edge::new("/c/en/a", "/c/en/b", "justifies", 0.4),
    ]);

    let report = justifier.propagate().await.unwrap();
    assert_eq!(report.rounds.len(), 2);
    assert_eq!(report.table.version(), 2);

    let store = justifier.store();
    assert_close(store.lookup_node(&id("/c/en/a")).await.unwrap(), 0.5);
    assert_close(store.lookup_node(&id("/c/en/b")).await.unwrap(), 0.2);
    assert_eq!(store.lookup_node(&NodeId::root()).await.unwrap(), Some(1.0));
}

#[tokio::test]
async fn test_chain_single_round_stops_early() {
    let store = MemoryStore::rooted();
    store.insert_edges([
        Edge::new("/", "/c/en/a", "justifies", 0.5),
        Edge::new("/c/en/a", "/c/en/b", "justifies", 0.4),
    ]);
    let justifier = Justifier::with_store(store, EngineConfig::default().with_rounds(1)).unwrap();

    justifier.propagate().await.unwrap();
    let store = justifier.store();
    assert_close(store.lookup_node(&id("/c/en/a")).await.unwrap(), 0.5);
    assert_eq!(store.lookup_node(&id("/c/en/b")).await.unwrap(), None);
}

// ============================================================================
// 2. Conjunctions
// ============================================================================

#[tokio::test]
async fn test_conjunction_parallel_combination() {
    let conj = "/and/[/s/x/,/s/y/]";
    let justifier = Justifier::open_memory().unwrap();
    let store = justifier.store();
    store.insert_edges([
        Edge::new("/", "/s/x", "justifies", 0.8),
        Edge::new("/", "/s/y", "justifies", 0.4),
        Edge::conjunct("/s/x", conj),
        Edge::conjunct("/s/y", conj),
    ]);

    justifier.propagate().await.unwrap();

    // Round 1 sets x and y; round 2 combines them.
    assert_close(store.lookup_conjunction(&id(conj)).await.unwrap(), 1.0 / 3.75);
    assert_eq!(store.lookup_node(&id(conj)).await.unwrap(), None);
}

#[tokio::test]
async fn test_conjunction_feeds_downstream() {
    let conj = "/and/[/s/x/,/s/y/]";
    let justifier = Justifier::with_store(MemoryStore::rooted(), EngineConfig::default().with_rounds(3)).unwrap();
    let store = justifier.store();
    store.insert_edges([
        Edge::new("/", "/s/x", "justifies", 2.0),
        Edge::new("/", "/s/y", "justifies", 2.0),
        Edge::conjunct("/s/x", conj),
        Edge::conjunct("/s/y", conj),
        Edge::new(conj, "/c/en/claim", "justifies", 0.5),
    ]);

    justifier.propagate().await.unwrap();

    // conj = 1 / (1/2 + 1/2) = 1 after round 2, claim = 0.5 after round 3
    assert_close(store.lookup_conjunction(&id(conj)).await.unwrap(), 1.0);
    assert_close(store.lookup_node(&id("/c/en/claim")).await.unwrap(), 0.5);
}

#[tokio::test]
async fn test_failed_premise_zeroes_conjunction() {
    let conj = "/and/[/s/good/,/s/bad/]";
    let store = MemoryStore::rooted();
    store.set_score(id("/s/good"), 5.0);
    store.set_score(id("/s/bad"), 0.0);
    store.insert_edges([Edge::conjunct("/s/good", conj), Edge::conjunct("/s/bad", conj)]);
    let justifier = Justifier::with_store(store, EngineConfig::default().with_rounds(1)).unwrap();

    justifier.propagate().await.unwrap();
    assert_eq!(justifier.store().lookup_conjunction(&id(conj)).await.unwrap(), Some(0.0));
}

#[tokio::test]
async fn test_conjunction_without_premises_keeps_value() {
    let conj = id("/and/[/s/p/,/s/q/]");
    let store = MemoryStore::rooted();
    store.set_score(conj.clone(), 0.3);
    // premises exist as edges but have no value anywhere
    store.insert_edges([Edge::conjunct("/s/p", conj.clone()), Edge::conjunct("/s/q", conj.clone())]);
    let justifier = Justifier::with_store(store, EngineConfig::default()).unwrap();

    let report = justifier.propagate().await.unwrap();
    assert_eq!(justifier.store().lookup_conjunction(&conj).await.unwrap(), Some(0.3));
    assert_eq!(report.rounds[0].conjunctions_carried, 1);
}

// ============================================================================
// 3. Root and self-loop invariants
// ============================================================================

#[tokio::test]
async fn test_root_is_one_after_every_round() {
    let justifier = Justifier::with_store(MemoryStore::rooted(), EngineConfig::default().with_rounds(4)).unwrap();
    justifier.store().insert_edges([
        Edge::new("/", "/c/en/a", "justifies", 3.0),
        Edge::new("/c/en/a", "/", "justifies", 7.0),
    ]);

    let edges = justifier.store().stream_edges(None).await.unwrap();
    let mut table = justifier.seed_table(&edges).await.unwrap();
    for round in 1..=4 {
        table = justifier.engine().run_round(round, &table, &edges).table;
        assert_eq!(table.get(&NodeId::root()), Some(1.0), "round {round}");
    }
}

#[tokio::test]
async fn test_self_loop_on_ordinary_node_ignored() {
    let justifier = Justifier::open_memory().unwrap();
    let store = justifier.store();
    store.insert_edges([
        Edge::new("/", "/c/en/a", "justifies", 0.5),
        Edge::new("/c/en/a", "/c/en/a", "justifies", 1.0),
    ]);

    let report = justifier.propagate().await.unwrap();
    assert_close(store.lookup_node(&id("/c/en/a")).await.unwrap(), 0.5);
    assert_eq!(report.rounds[1].activation.self_loops, 1);
}

// ============================================================================
// 4. Partially ingested graphs and bad weights
// ============================================================================

#[tokio::test]
async fn test_missing_and_invalid_edges_are_skipped() {
    let justifier = Justifier::open_memory().unwrap();
    let store = justifier.store();
    let mut no_weight = Edge::new("/", "/c/en/c", "justifies", 1.0);
    no_weight.weight = None;
    store.insert_edges([
        Edge::new("/", "/c/en/a", "justifies", 0.5),
        Edge::new("/c/en/ghost", "/c/en/a", "justifies", 0.9),
        Edge::new("/", "/c/en/b", "justifies", 0.0),
        no_weight,
    ]);

    let report = justifier.propagate().await.unwrap();
    assert_close(store.lookup_node(&id("/c/en/a")).await.unwrap(), 0.5);
    assert_eq!(store.lookup_node(&id("/c/en/b")).await.unwrap(), None);
    assert_eq!(store.lookup_node(&id("/c/en/c")).await.unwrap(), None);
    assert_eq!(report.rounds[0].normalize.invalid_weight, 2);
    assert_eq!(report.rounds[0].activation.missing_source, 1);
}

#[tokio::test]
async fn test_parallel_edges_of_different_types_both_count() {
    let justifier = Justifier::open_memory().unwrap();
    let store = justifier.store();
    store.insert_edges([
        Edge::new("/", "/c/en/a", "justifies", 0.5),
        Edge::new("/", "/c/en/a", "supports", 0.25),
    ]);

    justifier.propagate().await.unwrap();
    assert_close(store.lookup_node(&id("/c/en/a")).await.unwrap(), 0.75);
}

// ============================================================================
// 5. Edge-weight materialization
// ============================================================================

#[tokio::test]
async fn test_edge_weights_are_materialized() {
    let conj = "/and/[/s/x/,/s/y/]";
    let store = MemoryStore::rooted();
    store.set_score(id("/s/x"), 0.8);
    store.set_score(id("/s/y"), 0.4);
    store.set_score(id(conj), 0.2);
    store.insert_edges([
        Edge::conjunct("/s/x", conj),
        Edge::conjunct("/s/y", conj),
        Edge::new("/s/x", "/s/y", "justifies", 0.1),
    ]);
    let justifier = Justifier::with_store(store, EngineConfig::default().with_rounds(1)).unwrap();
    justifier.propagate().await.unwrap();

    let weights = justifier.store().edge_weights();
    assert_close(weights.get(&Edge::conjunct("/s/x", conj).key()), 0.25);
    assert_close(weights.get(&Edge::conjunct("/s/y", conj).key()), 0.5);
    assert_close(weights.get(&Edge::new("/s/x", "/s/y", "justifies", 0.1).key()), 0.1);
    assert_eq!(weights.get(&Edge::root_loop().key()), Some(1.0));
}

#[tokio::test]
async fn test_edge_weights_can_be_left_out() {
    let mut config = EngineConfig::default();
    config.commit_edge_weights = false;
    let justifier = Justifier::with_store(MemoryStore::rooted(), config).unwrap();
    justifier.store().insert_edge(Edge::new("/", "/c/en/a", "justifies", 0.5));

    justifier.propagate().await.unwrap();
    assert!(justifier.store().edge_weights().is_empty());
}

// ============================================================================
// 6. Store/engine agreement
// ============================================================================

#[tokio::test]
async fn test_committed_tables_match_in_memory_run() {
    let justifier = Justifier::open_memory().unwrap();
    let store = justifier.store();
    store.insert_edges([
        Edge::new("/", "/c/en/a", "justifies", 0.5),
        Edge::new("/", "/c/en/b", "justifies", 0.3),
        Edge::new("/c/en/a", "/c/en/c", "justifies", 0.4),
        Edge::new("/c/en/b", "/c/en/c", "justifies", 0.6),
        Edge::conjunct("/c/en/a", "/and/[/c/en/a/,/c/en/b/]"),
        Edge::conjunct("/c/en/b", "/and/[/c/en/a/,/c/en/b/]"),
    ]);

    let edges = store.stream_edges(None).await.unwrap();
    let engine = PropagationEngine::new(EngineConfig::default()).unwrap();
    let expected = engine.run(&ScoreTable::rooted(), &edges);

    justifier.propagate().await.unwrap();
    let mut committed = store.load_scores(&Collection::Justification).await.unwrap();
    committed.extend(store.load_scores(&Collection::Conjunctions).await.unwrap());

    assert_eq!(committed.len(), expected.table.len());
    for (node, value) in expected.table.iter() {
        assert_close(committed.get(node).copied(), value);
    }
}
