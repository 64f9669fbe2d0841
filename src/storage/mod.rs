//! # Graph Store Trait
//!
//! The contract between the propagation driver and whatever persists nodes,
//! edges and score tables. The engine itself never touches a store; the
//! [`Justifier`](crate::Justifier) driver reads through this trait and
//! commits each finished round through it.
//!
//! ## Implementations
//!
//! | Store | Module | Description |
//! |-------|--------|-------------|
//! | `MemoryStore` | `memory` | In-memory, atomic per-round commits |

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::engine::EdgeWeights;
use crate::index::ScoreKey;
use crate::model::*;
use crate::{Error, Result};

pub use memory::MemoryStore;

// ============================================================================
// Score collections
// ============================================================================

/// Named score table in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Collection {
    /// Values of ordinary nodes (and the root).
    Justification,
    /// Values of conjunction nodes.
    Conjunctions,
    /// Any other caller-named table.
    Named(String),
}

impl Collection {
    pub fn name(&self) -> &str {
        match self {
            Collection::Justification => "justification",
            Collection::Conjunctions => "conjunctions",
            Collection::Named(name) => name,
        }
    }

    /// The collection holding values of `kind` nodes.
    pub fn for_kind(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Ordinary => Collection::Justification,
            NodeKind::Conjunction => Collection::Conjunctions,
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How a score write lands in its collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteMode {
    /// Atomically overwrite the whole collection.
    Replace,
    /// Upsert by id; on duplicate ids within one write the last one wins.
    Merge,
}

/// One collection write.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreWrite {
    pub collection: Collection,
    pub mode: WriteMode,
    pub scores: Vec<(NodeId, f64)>,
}

impl ScoreWrite {
    pub fn replace(collection: Collection, scores: Vec<(NodeId, f64)>) -> Self {
        Self { collection, mode: WriteMode::Replace, scores }
    }

    pub fn merge(collection: Collection, scores: Vec<(NodeId, f64)>) -> Self {
        Self { collection, mode: WriteMode::Merge, scores }
    }

    /// Split a round's table into its two replace-writes.
    pub fn from_table(table: &ScoreTable) -> [Self; 2] {
        let ordinary = table.of_kind(NodeKind::Ordinary).map(|(id, v)| (id.clone(), v)).collect();
        let conjunctions = table.of_kind(NodeKind::Conjunction).map(|(id, v)| (id.clone(), v)).collect();
        [
            Self::replace(Collection::Justification, ordinary),
            Self::replace(Collection::Conjunctions, conjunctions),
        ]
    }
}

/// Everything persisted after one round. Applied all-or-nothing.
#[derive(Debug, Clone, Default)]
pub struct RoundCommit {
    pub round: usize,
    pub writes: Vec<ScoreWrite>,
    pub edge_weights: Option<EdgeWeights>,
}

// ============================================================================
// Store capabilities
// ============================================================================

/// Optional features of a store.
#[derive(Debug, Clone, Default)]
pub struct StoreCapabilities {
    pub supports_edge_weights: bool,
    pub supports_score_index: bool,
    /// `commit_round` applies all writes atomically.
    pub atomic_round_commit: bool,
}

// ============================================================================
// GraphStore Trait
// ============================================================================

/// Minimal storage contract consumed by the driver.
///
/// Reads are point lookups and a full edge scan; writes are whole score
/// collections. Optional operations default to `Error::Unsupported`.
#[async_trait]
pub trait GraphStore: Send + Sync + 'static {
    // ========================================================================
    // Reads
    // ========================================================================

    /// Committed justification value of an ordinary node.
    async fn lookup_node(&self, id: &NodeId) -> Result<Option<f64>>;

    /// Committed value of a conjunction node.
    async fn lookup_conjunction(&self, id: &NodeId) -> Result<Option<f64>>;

    /// All edges, optionally of one type. Finite and restartable; order
    /// carries no meaning.
    async fn stream_edges(&self, edge_type: Option<&EdgeType>) -> Result<Vec<Edge>>;

    /// Whole contents of one collection.
    async fn load_scores(&self, collection: &Collection) -> Result<ScoreMap>;

    /// Value of `id` from the collection its kind lives in.
    async fn lookup(&self, id: &NodeId) -> Result<Option<f64>> {
        match id.kind() {
            NodeKind::Ordinary => self.lookup_node(id).await,
            NodeKind::Conjunction => self.lookup_conjunction(id).await,
        }
    }

    // ========================================================================
    // Writes
    // ========================================================================

    async fn commit_scores(&self, write: ScoreWrite) -> Result<()>;

    /// Upsert materialized edge weights.
    async fn commit_edge_weights(&self, _weights: &EdgeWeights) -> Result<()> {
        Err(Error::Unsupported("edge weight table".into()))
    }

    /// Persist one round.
    ///
    /// Default applies the writes one after another, which is only
    /// all-or-nothing if the first failing write is the first write. Stores
    /// that can should override this and report `atomic_round_commit`;
    /// for the others the driver restores the previous score collections
    /// when a round fails part way.
    async fn commit_round(&self, commit: RoundCommit) -> Result<()> {
        for write in commit.writes {
            self.commit_scores(write).await?;
        }
        if let Some(weights) = &commit.edge_weights {
            self.commit_edge_weights(weights).await?;
        }
        Ok(())
    }

    // ========================================================================
    // Score index
    // ========================================================================

    /// Replace the whole score index with `keys`. Keys from an earlier
    /// scoring pass do not survive.
    async fn write_index(&self, _keys: Vec<ScoreKey>) -> Result<()> {
        Err(Error::Unsupported("score index".into()))
    }

    /// Keys starting with `prefix`, in ascending key order.
    async fn scan_index(&self, _prefix: &str, _limit: Option<usize>) -> Result<Vec<ScoreKey>> {
        Err(Error::Unsupported("score index".into()))
    }

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities::default()
    }
}
