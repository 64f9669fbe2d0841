//! In-memory graph store.
//!
//! Reference implementation of `GraphStore`, backed by maps behind
//! `parking_lot::RwLock`s.
//!
//! - **Atomic rounds**: `commit_round()` applies a whole round while holding
//!   the collection and edge-weight write locks; readers see the old round
//!   or the new one, and no concurrent write is lost in between.
//! - **Ordered index**: score keys live in a `BTreeSet`, so prefix scans
//!   come back in key order (best score first). Each `write_index()`
//!   replaces the previous pass.
//!
//! Use it for tests, for embedding, and as the model other stores follow.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{Collection, GraphStore, RoundCommit, ScoreWrite, StoreCapabilities, WriteMode};
use crate::engine::EdgeWeights;
use crate::index::ScoreKey;
use crate::model::*;
use crate::Result;

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory justification store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    /// Edges in ingestion order.
    edges: RwLock<Vec<Edge>>,
    collections: RwLock<BTreeMap<Collection, ScoreMap>>,
    edge_weights: RwLock<EdgeWeights>,
    /// Rendered score keys.
    index: RwLock<BTreeSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with the root value and its self-loop.
    pub fn rooted() -> Self {
        let store = Self::new();
        store.set_score(NodeId::root(), 1.0);
        store.insert_edge(Edge::root_loop());
        store
    }

    // ========================================================================
    // Ingestion
    // ========================================================================

    pub fn insert_edge(&self, edge: Edge) {
        self.inner.edges.write().push(edge);
    }

    pub fn insert_edges(&self, edges: impl IntoIterator<Item = Edge>) {
        self.inner.edges.write().extend(edges);
    }

    /// Set a committed value directly, in the collection of its kind.
    pub fn set_score(&self, id: NodeId, value: f64) {
        let collection = Collection::for_kind(id.kind());
        self.inner
            .collections
            .write()
            .entry(collection)
            .or_default()
            .insert(id, value);
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edges.read().len()
    }

    /// Snapshot of the materialized edge-weight table.
    pub fn edge_weights(&self) -> EdgeWeights {
        self.inner.edge_weights.read().clone()
    }

    pub fn index_len(&self) -> usize {
        self.inner.index.read().len()
    }
}

/// Apply one write to a copy-on-write collection map.
fn apply_write(collections: &mut BTreeMap<Collection, ScoreMap>, write: ScoreWrite) {
    let ScoreWrite { collection, mode, scores } = write;
    match mode {
        WriteMode::Replace => {
            collections.insert(collection, scores.into_iter().collect());
        }
        WriteMode::Merge => {
            let target = collections.entry(collection).or_default();
            for (id, value) in scores {
                target.insert(id, value);
            }
        }
    }
}

// ============================================================================
// GraphStore impl
// ============================================================================

#[async_trait]
impl GraphStore for MemoryStore {
    async fn lookup_node(&self, id: &NodeId) -> Result<Option<f64>> {
        Ok(self
            .inner
            .collections
            .read()
            .get(&Collection::Justification)
            .and_then(|scores| scores.get(id).copied()))
    }

    async fn lookup_conjunction(&self, id: &NodeId) -> Result<Option<f64>> {
        Ok(self
            .inner
            .collections
            .read()
            .get(&Collection::Conjunctions)
            .and_then(|scores| scores.get(id).copied()))
    }

    async fn stream_edges(&self, edge_type: Option<&EdgeType>) -> Result<Vec<Edge>> {
        let edges = self.inner.edges.read();
        Ok(match edge_type {
            Some(t) => edges.iter().filter(|e| &e.edge_type == t).cloned().collect(),
            None => edges.clone(),
        })
    }

    async fn load_scores(&self, collection: &Collection) -> Result<ScoreMap> {
        Ok(self
            .inner
            .collections
            .read()
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    async fn commit_scores(&self, write: ScoreWrite) -> Result<()> {
        let mut collections = self.inner.collections.write();
        apply_write(&mut collections, write);
        Ok(())
    }

    async fn commit_edge_weights(&self, weights: &EdgeWeights) -> Result<()> {
        self.inner.edge_weights.write().merge(weights);
        Ok(())
    }

    async fn commit_round(&self, commit: RoundCommit) -> Result<()> {
        // Lock order: collections, then edge weights.
        let mut collections = self.inner.collections.write();
        let mut edge_weights = self.inner.edge_weights.write();
        for write in commit.writes {
            apply_write(&mut collections, write);
        }
        if let Some(weights) = &commit.edge_weights {
            edge_weights.merge(weights);
        }
        tracing::info!(round = commit.round, collections = collections.len(), "round committed");
        Ok(())
    }

    async fn write_index(&self, keys: Vec<ScoreKey>) -> Result<()> {
        let fresh: BTreeSet<String> = keys.iter().map(ToString::to_string).collect();
        *self.inner.index.write() = fresh;
        Ok(())
    }

    async fn scan_index(&self, prefix: &str, limit: Option<usize>) -> Result<Vec<ScoreKey>> {
        let index = self.inner.index.read();
        index
            .range(prefix.to_string()..)
            .take_while(|key| key.starts_with(prefix))
            .take(limit.unwrap_or(usize::MAX))
            .map(|key| ScoreKey::parse(key))
            .collect()
    }

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities {
            supports_edge_weights: true,
            supports_score_index: true,
            atomic_round_commit: true,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
