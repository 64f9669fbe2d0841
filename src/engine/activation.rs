//! Aggregation stages of a round.
//!
//! Both stages are map + group-by-key folds over a frozen snapshot; each
//! rayon worker folds into its own map and the maps are merged afterwards.

use hashbrown::HashMap;
use rayon::prelude::*;
use serde::Serialize;

use super::conjunction::Premises;
use super::normalize::EdgeWeights;
use crate::model::{Edge, EdgeKey, NodeId, ScoreMap, ScoreTable};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActivationStats {
    /// Contributions summed into ordinary nodes.
    pub contributions: usize,
    /// Edges whose source had no positive value.
    pub missing_source: usize,
    /// Non-root self-loops ignored.
    pub self_loops: usize,
    /// Contributions aimed at conjunction nodes (AND rule owns those).
    pub into_conjunctions: usize,
}

impl ActivationStats {
    fn merge(mut self, other: Self) -> Self {
        self.contributions += other.contributions;
        self.missing_source += other.missing_source;
        self.self_loops += other.self_loops;
        self.into_conjunctions += other.into_conjunctions;
        self
    }
}

enum Contribution {
    Sum(NodeId, f64),
    MissingSource,
    SelfLoop,
    IntoConjunction,
    Root,
}

fn contribution(snapshot: &ScoreTable, key: &EdgeKey, weight: f64) -> Option<Contribution> {
    if weight <= 0.0 {
        return None;
    }
    if key.is_self_loop() && !key.start.is_root() {
        return Some(Contribution::SelfLoop);
    }
    if key.end.is_root() {
        return Some(Contribution::Root);
    }
    if key.end.is_conjunction() {
        return Some(Contribution::IntoConjunction);
    }
    match snapshot.positive(&key.start) {
        Some(value) => Some(Contribution::Sum(key.end.clone(), value * weight)),
        None => Some(Contribution::MissingSource),
    }
}

/// OR aggregation: `Σ value(start) * weight` per ordinary target.
///
/// The root is excluded; its value is pinned by the caller.
pub(crate) fn activate(snapshot: &ScoreTable, weights: &EdgeWeights) -> (ScoreMap, ActivationStats) {
    weights
        .entries()
        .par_iter()
        .filter_map(|(key, weight)| contribution(snapshot, key, *weight))
        .fold(
            || (ScoreMap::new(), ActivationStats::default()),
            |(mut sums, mut stats), c| {
                match c {
                    Contribution::Sum(end, amount) => {
                        *sums.entry(end).or_insert(0.0) += amount;
                        stats.contributions += 1;
                    }
                    Contribution::MissingSource => stats.missing_source += 1,
                    Contribution::SelfLoop => stats.self_loops += 1,
                    Contribution::IntoConjunction => stats.into_conjunctions += 1,
                    Contribution::Root => {}
                }
                (sums, stats)
            },
        )
        .reduce(
            || (ScoreMap::new(), ActivationStats::default()),
            |(mut left, ls), (right, rs)| {
                for (id, amount) in right {
                    *left.entry(id).or_insert(0.0) += amount;
                }
                (left, ls.merge(rs))
            },
        )
}

/// AND aggregation input: premise values grouped by conjunction.
///
/// A premise present in the snapshot with value 0 is kept (it zeroes the
/// conjunction); an absent premise is a missing reference and dropped.
pub(crate) fn gather_premises(snapshot: &ScoreTable, edges: &[Edge]) -> HashMap<NodeId, Premises> {
    edges
        .par_iter()
        .filter(|edge| edge.edge_type.is_conjunct() && edge.end.is_conjunction())
        .filter_map(|edge| snapshot.get(&edge.start).map(|v| (edge.end.clone(), v.max(0.0))))
        .fold(HashMap::new, |mut groups: HashMap<NodeId, Premises>, (end, value)| {
            groups.entry(end).or_default().push(value);
            groups
        })
        .reduce(HashMap::new, |mut left, right| {
            for (id, premises) in right {
                left.entry(id).or_default().extend(premises);
            }
            left
        })
}
