//! Scoring pass: turn committed justification values into sortable node
//! and edge scores, plus the index keys that make them range-queryable.
//!
//! Scores carry a tiny random jitter so that ties still sort in a stable,
//! unique order. The jitter never flows back into the canonical value, and
//! its source is injectable so tests can seed it.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::codec::{ScoreCode, ScoreCodec};
use crate::engine::fuzzy_truth;
use crate::index::ScoreKey;
use crate::model::{Edge, NodeId, ScoreMap};
use crate::Result;

// ============================================================================
// Jitter sources
// ============================================================================

/// Source of raw jitter in `[0, 1)`; callers scale it.
pub trait JitterSource {
    fn next_unit(&mut self) -> f64;
}

/// Reproducible jitter from a seeded ChaCha stream.
#[derive(Debug, Clone)]
pub struct SeededJitter {
    rng: ChaCha8Rng,
}

impl SeededJitter {
    pub fn new(seed: u64) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(seed) }
    }
}

impl JitterSource for SeededJitter {
    fn next_unit(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

/// Non-reproducible jitter from the thread-local generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadJitter;

impl JitterSource for ThreadJitter {
    fn next_unit(&mut self) -> f64 {
        rand::rng().random::<f64>()
    }
}

/// No jitter at all. Ties stay ties.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl JitterSource for NoJitter {
    fn next_unit(&mut self) -> f64 {
        0.0
    }
}

// ============================================================================
// Scored records
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredNode {
    pub id: NodeId,
    pub value: f64,
    pub jitter: f64,
    /// `value + jitter`
    pub score: f64,
}

impl ScoredNode {
    pub fn code(&self) -> ScoreCode {
        ScoreCodec::descending().encode(self.score)
    }

    pub fn truth(&self) -> f64 {
        fuzzy_truth(self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredEdge {
    pub edge: Edge,
    pub jitter: f64,
    /// `(1 + jitter) * f(start) * f(end)`
    pub score: f64,
}

impl ScoredEdge {
    /// The four index keys (`Aout`, `Ain`, `Bout`, `Bin`) for this edge.
    pub fn index_keys(&self) -> Result<[ScoreKey; 4]> {
        ScoreKey::all_for_edge(&self.edge.start, &self.edge.end, &self.edge.edge_type, self.score)
    }
}

// ============================================================================
// Scorer
// ============================================================================

/// Applies the scoring formulas with a given jitter scale and stand-in for
/// absent endpoints.
#[derive(Debug, Clone, Copy)]
pub struct Scorer {
    pub jitter_scale: f64,
    pub missing_score: f64,
}

impl Default for Scorer {
    fn default() -> Self {
        Self { jitter_scale: 1e-6, missing_score: 0.001 }
    }
}

impl Scorer {
    pub fn new(jitter_scale: f64, missing_score: f64) -> Self {
        Self { jitter_scale, missing_score }
    }

    fn jitter(&self, source: &mut dyn JitterSource) -> f64 {
        source.next_unit() * self.jitter_scale
    }

    /// One scored node per entry, best first.
    pub fn score_nodes(&self, scores: &ScoreMap, jitter: &mut dyn JitterSource) -> Vec<ScoredNode> {
        // Draw in id order so a seeded source is reproducible regardless of
        // hash iteration order.
        let mut entries: Vec<(&NodeId, f64)> = scores.iter().map(|(id, v)| (id, *v)).collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let mut scored: Vec<ScoredNode> = entries
            .into_iter()
            .map(|(id, value)| {
                let j = self.jitter(jitter);
                ScoredNode { id: id.clone(), value, jitter: j, score: value + j }
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored
    }

    /// Score every edge by the product of its endpoint values.
    ///
    /// `scores` is the committed justification table; an absent endpoint
    /// counts as `missing_score`.
    pub fn score_edges(
        &self,
        edges: &[Edge],
        scores: &ScoreMap,
        jitter: &mut dyn JitterSource,
    ) -> Vec<ScoredEdge> {
        let endpoint = |id: &NodeId| scores.get(id).copied().unwrap_or(self.missing_score);
        edges
            .iter()
            .map(|edge| {
                let j = self.jitter(jitter);
                let score = (1.0 + j) * endpoint(&edge.start) * endpoint(&edge.end);
                ScoredEdge { edge: edge.clone(), jitter: j, score }
            })
            .collect()
    }
}
