//! Edge materialization: the effective weight of every edge for one round.
//!
//! `conjunct` edges get `conjunction(end) / justification(start)` read from
//! the round's snapshot; every other edge keeps its stored weight. Edges
//! that cannot be weighted are skipped outright rather than emitted with
//! weight 0, so they never shadow another entry for the same target.

use hashbrown::HashMap;
use rayon::prelude::*;
use serde::Serialize;

use crate::model::{Edge, EdgeKey, ScoreTable};

/// Why an edge was left out of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// An endpoint is absent from the snapshot (or has no positive value).
    MissingReference,
    /// Stored weight is missing, zero, negative or not finite.
    InvalidWeight,
    /// The conjunction has no usable value yet.
    UndefinedConjunction,
}

/// Materialized edge weights keyed by `(type, start, end)`.
///
/// Inserting an existing key replaces it ("last write wins").
#[derive(Debug, Clone, Default)]
pub struct EdgeWeights {
    entries: HashMap<EdgeKey, f64>,
}

impl EdgeWeights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: EdgeKey, weight: f64) {
        self.entries.insert(key, weight);
    }

    pub fn get(&self, key: &EdgeKey) -> Option<f64> {
        self.entries.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EdgeKey, f64)> {
        self.entries.iter().map(|(k, w)| (k, *w))
    }

    pub(crate) fn entries(&self) -> &HashMap<EdgeKey, f64> {
        &self.entries
    }

    /// Upsert every entry of `other` into `self`.
    pub fn merge(&mut self, other: &EdgeWeights) {
        for (key, weight) in other.iter() {
            self.entries.insert(key.clone(), weight);
        }
    }
}

/// Skip counters from one materialization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeStats {
    pub materialized: usize,
    pub missing_reference: usize,
    pub invalid_weight: usize,
    pub undefined_conjunction: usize,
}

impl NormalizeStats {
    fn record(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::MissingReference => self.missing_reference += 1,
            SkipReason::InvalidWeight => self.invalid_weight += 1,
            SkipReason::UndefinedConjunction => self.undefined_conjunction += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeWeightNormalizer;

impl EdgeWeightNormalizer {
    /// Effective weight of a single edge against `snapshot`.
    pub fn weigh(&self, snapshot: &ScoreTable, edge: &Edge) -> Result<f64, SkipReason> {
        if !edge.edge_type.is_conjunct() {
            return edge.usable_weight().ok_or(SkipReason::InvalidWeight);
        }
        if !edge.end.is_conjunction() {
            return Err(SkipReason::MissingReference);
        }
        let conjunction = snapshot
            .positive(&edge.end)
            .ok_or(SkipReason::UndefinedConjunction)?;
        let justification = snapshot
            .positive(&edge.start)
            .ok_or(SkipReason::MissingReference)?;
        Ok(conjunction / justification)
    }

    /// Weigh every edge in parallel, then merge in input order so a later
    /// duplicate key overwrites an earlier one. The root self-loop is
    /// written last and always has weight 1.
    pub fn materialize(&self, snapshot: &ScoreTable, edges: &[Edge]) -> (EdgeWeights, NormalizeStats) {
        let weighed: Vec<Result<f64, SkipReason>> = edges
            .par_iter()
            .map(|edge| self.weigh(snapshot, edge))
            .collect();

        let mut weights = EdgeWeights::new();
        let mut stats = NormalizeStats::default();
        for (edge, outcome) in edges.iter().zip(weighed) {
            match outcome {
                Ok(weight) => weights.insert(edge.key(), weight),
                Err(reason) => stats.record(reason),
            }
        }
        weights.insert(Edge::root_loop().key(), 1.0);
        stats.materialized = weights.len();
        (weights, stats)
    }
}
