//! Versioned, immutable score snapshots.
//!
//! A round reads one `ScoreTable` and produces a brand new one. Tables are
//! cheap to clone (`Arc`-shared) and never mutated after construction.

use std::sync::Arc;

use hashbrown::HashMap;
use super::{NodeId, NodeKind};

/// Mapping from node id to justification value.
pub type ScoreMap = HashMap<NodeId, f64>;

/// Frozen score snapshot.
#[derive(Debug, Clone, Default)]
pub struct ScoreTable {
    version: u64,
    values: Arc<ScoreMap>,
}

impl ScoreTable {
    pub fn new(values: ScoreMap) -> Self {
        Self { version: 0, values: Arc::new(values) }
    }

    /// Start from the root alone.
    pub fn rooted() -> Self {
        let mut values = ScoreMap::new();
        values.insert(NodeId::root(), 1.0);
        Self::new(values)
    }

    /// Round counter of the table: 0 for a seed, `n` after round `n`.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn get(&self, id: &NodeId) -> Option<f64> {
        self.values.get(id).copied()
    }

    /// Value usable as a propagation source: present and strictly positive.
    pub fn positive(&self, id: &NodeId) -> Option<f64> {
        self.get(id).filter(|v| *v > 0.0)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.values.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, f64)> {
        self.values.iter().map(|(id, v)| (id, *v))
    }

    /// Entries of one node kind.
    pub fn of_kind(&self, kind: NodeKind) -> impl Iterator<Item = (&NodeId, f64)> {
        self.iter().filter(move |(id, _)| id.kind() == kind)
    }

    pub fn values(&self) -> &ScoreMap {
        &self.values
    }

    /// Copy of this table with the root pinned to 1.
    pub fn with_root_pinned(&self) -> Self {
        if self.get(&NodeId::root()) == Some(1.0) {
            return self.clone();
        }
        let mut values = (*self.values).clone();
        values.insert(NodeId::root(), 1.0);
        Self { version: self.version, values: Arc::new(values) }
    }

    /// Seal a freshly built map as the successor of `self`.
    pub(crate) fn successor(&self, values: ScoreMap) -> Self {
        Self { version: self.version + 1, values: Arc::new(values) }
    }
}

impl FromIterator<(NodeId, f64)> for ScoreTable {
    fn from_iter<I: IntoIterator<Item = (NodeId, f64)>>(iter: I) -> Self {
        ScoreTable::new(iter.into_iter().collect())
    }
}
