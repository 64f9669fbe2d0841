//! # justify-graph — justification propagation over evidence graphs
//!
//! Turns a static weighted graph of evidential support ("A is justified by
//! B with weight W") into converged per-node scores, then into sortable
//! per-edge scores and range-queryable index keys.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `GraphStore` is the contract between the driver and storage
//! 2. **Frozen snapshots**: a round reads one immutable `ScoreTable` and builds the next
//! 3. **Engine owns nothing**: `PropagationEngine` is pure over (snapshot, edges)
//! 4. **Typed nodes**: ordinary vs conjunction is resolved once, when an id is built
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use justify_graph::{Edge, Justifier, NodeId};
//!
//! # async fn example() -> justify_graph::Result<()> {
//! let justifier = Justifier::open_memory()?;
//! justifier.store().insert_edges([
//!     Edge::new("/", "/c/en/a", "justifies", 0.5),
//!     Edge::new("/c/en/a", "/c/en/b", "justifies", 0.4),
//! ]);
//!
//! let report = justifier.propagate().await?;
//! assert_eq!(report.rounds.len(), 2);
//! println!("{:?}", report.table.get(&NodeId::new("/c/en/b")));
//! # Ok(())
//! # }
//! ```
//!
//! ## Components
//!
//! | Component | Module | Role |
//! |-----------|--------|------|
//! | ScoreCodec | `codec` | order-preserving 8-hex score codes |
//! | Score keys | `index` | `Aout`/`Ain`/`Bout`/`Bin` composite keys |
//! | PropagationEngine | `engine` | BSP rounds, AND/OR aggregation |
//! | GraphStore | `storage` | read/write contract, `MemoryStore` |
//! | Scorer | `scoring` | jittered node/edge scores |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod codec;
pub mod index;
pub mod engine;
pub mod scoring;
pub mod storage;
pub mod export;

use chrono::{DateTime, Utc};
use hashbrown::HashSet;

// ============================================================================
// Re-exports
// ============================================================================

pub use model::{Edge, EdgeKey, EdgeType, NodeId, NodeKind, ScoreMap, ScoreTable};
pub use codec::{Polarity, ScoreCode, ScoreCodec};
pub use index::{Role, ScoreKey};
pub use engine::{
    ConjunctionResolver, EdgeWeightNormalizer, EdgeWeights, EngineConfig,
    PropagationEngine, RoundOutcome, RoundStats,
};
pub use scoring::{JitterSource, NoJitter, ScoredEdge, ScoredNode, Scorer, SeededJitter, ThreadJitter};
pub use storage::{Collection, GraphStore, MemoryStore, RoundCommit, ScoreWrite, WriteMode};

// ============================================================================
// Reports
// ============================================================================

/// Outcome of a committed propagation run.
#[derive(Debug, Clone)]
pub struct PropagationReport {
    /// The last committed table.
    pub table: ScoreTable,
    pub rounds: Vec<RoundStats>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Outcome of a scoring pass.
#[derive(Debug, Clone)]
pub struct ScoringReport {
    /// Best first.
    pub nodes: Vec<ScoredNode>,
    pub edges: Vec<ScoredEdge>,
    pub index_keys: usize,
}

// ============================================================================
// Top-level Justifier handle
// ============================================================================

/// The primary entry point: a store plus an engine.
///
/// `propagate()` drives the configured number of rounds and commits each
/// one; `score()` turns the committed values into index entries.
pub struct Justifier<S: GraphStore> {
    store: S,
    engine: PropagationEngine,
}

impl<S: GraphStore> Justifier<S> {
    pub fn with_store(store: S, config: EngineConfig) -> Result<Self> {
        Ok(Self { store, engine: PropagationEngine::new(config)? })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn engine(&self) -> &PropagationEngine {
        &self.engine
    }

    /// Build the round-0 snapshot from committed values of every node an
    /// edge mentions. Nodes the store does not know are simply absent.
    pub async fn seed_table(&self, edges: &[Edge]) -> Result<ScoreTable> {
        let mut ids: HashSet<&NodeId> = HashSet::new();
        for edge in edges {
            ids.insert(&edge.start);
            ids.insert(&edge.end);
        }

        let mut values = ScoreMap::with_capacity(ids.len());
        for id in ids {
            if let Some(value) = self.store.lookup(id).await? {
                values.insert(id.clone(), value);
            }
        }
        Ok(ScoreTable::new(values).with_root_pinned())
    }

    /// Run every configured round against the store, committing after each.
    ///
    /// A failed commit abandons the run with `Error::RoundCommit`; the
    /// store keeps the last successfully committed round. Stores without
    /// `atomic_round_commit` have their score collections captured before
    /// each commit and restored if it fails. Their edge-weight table is
    /// upsert-only and is not rolled back.
    pub async fn propagate(&self) -> Result<PropagationReport> {
        let started_at = Utc::now();
        let config = self.engine.config();
        let atomic = self.store.capabilities().atomic_round_commit;
        let edges = self.store.stream_edges(None).await?;
        let mut table = self.seed_table(&edges).await?;
        let mut rounds = Vec::with_capacity(config.rounds);

        tracing::info!(edges = edges.len(), nodes = table.len(), rounds = config.rounds, atomic, "propagation start");

        for round in 1..=config.rounds {
            let outcome = self.engine.run_round(round, &table, &edges);
            let previous = if atomic { None } else { Some(self.committed_scores().await?) };
            let commit = RoundCommit {
                round,
                writes: ScoreWrite::from_table(&outcome.table).to_vec(),
                edge_weights: config.commit_edge_weights.then(|| outcome.edge_weights.clone()),
            };
            if let Err(source) = self.store.commit_round(commit).await {
                tracing::warn!(round, error = %source, "round commit failed, keeping previous table");
                if let Some(previous) = previous {
                    self.restore_scores(round, previous).await;
                }
                return Err(Error::RoundCommit { round, source: Box::new(source) });
            }
            table = outcome.table;
            rounds.push(outcome.stats);
        }

        Ok(PropagationReport { table, rounds, started_at, finished_at: Utc::now() })
    }

    /// Replace-writes that reproduce the committed score collections.
    async fn committed_scores(&self) -> Result<Vec<ScoreWrite>> {
        let mut writes = Vec::with_capacity(2);
        for collection in [Collection::Justification, Collection::Conjunctions] {
            let scores = self.store.load_scores(&collection).await?;
            writes.push(ScoreWrite::replace(collection, scores.into_iter().collect()));
        }
        Ok(writes)
    }

    async fn restore_scores(&self, round: usize, previous: Vec<ScoreWrite>) {
        for write in previous {
            let collection = write.collection.clone();
            if let Err(error) = self.store.commit_scores(write).await {
                tracing::error!(round, %collection, %error, "restoring previous scores failed");
                return;
            }
        }
        tracing::info!(round, "previous scores restored");
    }

    /// Score committed nodes and edges and write the edge index.
    pub async fn score(&self, jitter: &mut dyn JitterSource) -> Result<ScoringReport> {
        let config = self.engine.config();
        let scorer = Scorer::new(config.jitter_scale, config.missing_score);

        let mut scores = self.store.load_scores(&Collection::Justification).await?;
        scores.extend(self.store.load_scores(&Collection::Conjunctions).await?);
        let edges = self.store.stream_edges(None).await?;

        let nodes = scorer.score_nodes(&scores, jitter);
        let scored_edges = scorer.score_edges(&edges, &scores, jitter);
        let mut keys = Vec::with_capacity(scored_edges.len() * 4);
        for edge in &scored_edges {
            keys.extend(edge.index_keys()?);
        }
        let index_keys = keys.len();
        self.store.write_index(keys).await?;

        tracing::info!(nodes = nodes.len(), edges = scored_edges.len(), index_keys, "scoring complete");
        Ok(ScoringReport { nodes, edges: scored_edges, index_keys })
    }

    /// Edges around `anchor` in descending score order.
    ///
    /// `edge_type` is required for `Bout`/`Bin` and rejected otherwise.
    pub async fn top_edges(
        &self,
        role: Role,
        edge_type: Option<&EdgeType>,
        anchor: &NodeId,
        limit: usize,
    ) -> Result<Vec<ScoreKey>> {
        let prefix = ScoreKey::prefix(role, edge_type, anchor)?;
        self.store.scan_index(&prefix, Some(limit)).await
    }
}

/// In-memory justifier with a rooted store and default configuration.
impl Justifier<MemoryStore> {
    pub fn open_memory() -> Result<Self> {
        Self::with_store(MemoryStore::rooted(), EngineConfig::default())
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Score code error: {0}")]
    Codec(String),

    #[error("Index key error: {0}")]
    KeyParse(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not supported by this store: {0}")]
    Unsupported(String),

    #[error("Round {round} was not committed: {source}")]
    RoundCommit {
        round: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
