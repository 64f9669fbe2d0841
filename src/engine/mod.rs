//! # Propagation Engine
//!
//! Bulk-synchronous rounds over a frozen score snapshot:
//!
//! ```text
//!   snapshot(n) ──► materialize edge weights ──┬─► OR  sums (ordinary)  ──┐
//!   (root pinned)                              └─► AND premises (conj.) ──┴─► snapshot(n+1)
//! ```
//!
//! No stage reads the table it is building; the new table replaces the old
//! one only once both aggregations are complete. There is no fixed-point
//! detection: `EngineConfig::rounds` is the only termination rule.
//!
//! Stages run on rayon, either on the global pool or on a dedicated one
//! when `worker_threads` is set.

pub mod activation;
pub mod config;
pub mod conjunction;
pub mod normalize;

use std::sync::Arc;

use serde::Serialize;

use crate::model::{Edge, NodeId, NodeKind, ScoreTable};
use crate::{Error, Result};

pub use activation::ActivationStats;
pub use config::EngineConfig;
pub use conjunction::{ConjunctionResolver, Premises, fuzzy_truth};
pub use normalize::{EdgeWeightNormalizer, EdgeWeights, NormalizeStats, SkipReason};

// ============================================================================
// Round results
// ============================================================================

/// Counters for one completed round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoundStats {
    pub round: usize,
    pub edges: usize,
    pub normalize: NormalizeStats,
    pub activation: ActivationStats,
    pub ordinary_scored: usize,
    pub conjunctions_resolved: usize,
    /// Conjunctions with no premises this round, value kept from before.
    pub conjunctions_carried: usize,
}

/// Everything one round produces. Nothing is visible until this is
/// returned.
#[derive(Debug, Clone)]
pub struct RoundOutcome {
    pub table: ScoreTable,
    pub edge_weights: EdgeWeights,
    pub stats: RoundStats,
}

/// Result of a full in-memory run.
#[derive(Debug, Clone)]
pub struct Propagation {
    pub table: ScoreTable,
    pub edge_weights: EdgeWeights,
    pub rounds: Vec<RoundStats>,
}

// ============================================================================
// PropagationEngine
// ============================================================================

pub struct PropagationEngine {
    config: EngineConfig,
    normalizer: EdgeWeightNormalizer,
    resolver: ConjunctionResolver,
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl PropagationEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let pool = match config.worker_threads {
            Some(threads) => Some(Arc::new(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("justify-round-{i}"))
                    .build()
                    .map_err(|e| Error::Config(format!("worker pool: {e}")))?,
            )),
            None => None,
        };
        Ok(Self {
            config,
            normalizer: EdgeWeightNormalizer,
            resolver: ConjunctionResolver,
            pool,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run round `round` (1-based) against `snapshot`.
    ///
    /// Pure: neither `snapshot` nor `edges` is modified. The root is pinned
    /// to 1 before anything reads the snapshot and again in the result.
    pub fn run_round(&self, round: usize, snapshot: &ScoreTable, edges: &[Edge]) -> RoundOutcome {
        let outcome = match &self.pool {
            Some(pool) => pool.install(|| self.round_inner(round, snapshot, edges)),
            None => self.round_inner(round, snapshot, edges),
        };

        let s = &outcome.stats;
        tracing::debug!(
            round,
            missing_reference = s.normalize.missing_reference,
            invalid_weight = s.normalize.invalid_weight,
            undefined_conjunction = s.normalize.undefined_conjunction,
            missing_source = s.activation.missing_source,
            self_loops = s.activation.self_loops,
            "round skips"
        );
        tracing::info!(
            round,
            nodes = outcome.table.len(),
            edge_weights = outcome.edge_weights.len(),
            conjunctions = s.conjunctions_resolved,
            "round complete"
        );
        outcome
    }

    fn round_inner(&self, round: usize, snapshot: &ScoreTable, edges: &[Edge]) -> RoundOutcome {
        let snapshot = snapshot.with_root_pinned();

        // 1. materialize
        let (edge_weights, normalize) = self.normalizer.materialize(&snapshot, edges);

        // 2 + 3. OR and AND aggregation side by side
        let ((mut values, activation), premises) = rayon::join(
            || activation::activate(&snapshot, &edge_weights),
            || activation::gather_premises(&snapshot, edges),
        );
        let ordinary_scored = values.len();

        let mut conjunctions_resolved = 0;
        for (id, group) in &premises {
            if let Some(value) = self.resolver.resolve(group) {
                values.insert(id.clone(), value);
                conjunctions_resolved += 1;
            }
        }

        let mut conjunctions_carried = 0;
        for (id, previous) in snapshot.of_kind(NodeKind::Conjunction) {
            if !premises.contains_key(id) {
                values.insert(id.clone(), previous);
                conjunctions_carried += 1;
            }
        }

        values.insert(NodeId::root(), 1.0);

        // 4. swap: the successor is sealed only now
        let table = snapshot.successor(values);
        RoundOutcome {
            table,
            edge_weights,
            stats: RoundStats {
                round,
                edges: edges.len(),
                normalize,
                activation,
                ordinary_scored,
                conjunctions_resolved,
                conjunctions_carried,
            },
        }
    }

    /// Run all configured rounds in memory, starting from `seed`.
    pub fn run(&self, seed: &ScoreTable, edges: &[Edge]) -> Propagation {
        let mut table = seed.with_root_pinned();
        let mut edge_weights = EdgeWeights::new();
        let mut rounds = Vec::with_capacity(self.config.rounds);

        for round in 1..=self.config.rounds {
            let outcome = self.run_round(round, &table, edges);
            table = outcome.table;
            edge_weights.merge(&outcome.edge_weights);
            rounds.push(outcome.stats);
        }

        Propagation { table, edge_weights, rounds }
    }
}

impl std::fmt::Debug for PropagationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropagationEngine")
            .field("config", &self.config)
            .field("dedicated_pool", &self.pool.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-9)
    }

    fn chain() -> Vec<Edge> {
        vec![
            Edge::new("/", "/c/en/a", "justifies", 0.5),
            Edge::new("/c/en/a", "/c/en/b", "justifies", 0.4),
        ]
    }

    #[test]
    fn chain_needs_two_rounds() {
        let engine = PropagationEngine::new(EngineConfig::default()).unwrap();
        let edges = chain();

        let r1 = engine.run_round(1, &ScoreTable::rooted(), &edges);
        assert!(approx(r1.table.get(&NodeId::new("/c/en/a")), 0.5));
        assert_eq!(r1.table.get(&NodeId::new("/c/en/b")), None);

        let r2 = engine.run_round(2, &r1.table, &edges);
        assert!(approx(r2.table.get(&NodeId::new("/c/en/a")), 0.5));
        assert!(approx(r2.table.get(&NodeId::new("/c/en/b")), 0.2));
        assert_eq!(r2.table.version(), 2);
    }

    #[test]
    fn root_stays_pinned() {
        let engine = PropagationEngine::new(EngineConfig::default().with_rounds(3)).unwrap();
        let edges = vec![
            Edge::new("/", "/c/en/a", "justifies", 0.5),
            Edge::new("/c/en/a", "/", "justifies", 10.0),
        ];
        let seed: ScoreTable = [(NodeId::root(), 0.25)].into_iter().collect();
        let result = engine.run(&seed, &edges);
        assert_eq!(result.table.get(&NodeId::root()), Some(1.0));
        assert_eq!(result.rounds.len(), 3);
    }

    #[test]
    fn conjunction_takes_parallel_value_not_sum() {
        let conj = "/and/[/x/,/y/]";
        let engine = PropagationEngine::new(EngineConfig::default()).unwrap();
        let seed: ScoreTable = [
            (NodeId::root(), 1.0),
            (NodeId::new("/x"), 0.8),
            (NodeId::new("/y"), 0.4),
        ]
        .into_iter()
        .collect();
        let edges = vec![Edge::conjunct("/x", conj), Edge::conjunct("/y", conj)];
        let r1 = engine.run_round(1, &seed, &edges);
        assert!(approx(r1.table.get(&NodeId::new(conj)), 1.0 / 3.75));
        assert_eq!(r1.stats.conjunctions_resolved, 1);
    }

    #[test]
    fn conjunction_without_premises_carries_over() {
        let conj = NodeId::new("/and/[/p/,/q/]");
        let engine = PropagationEngine::new(EngineConfig::default()).unwrap();
        let seed: ScoreTable = [(NodeId::root(), 1.0), (conj.clone(), 0.3)].into_iter().collect();
        let r1 = engine.run_round(1, &seed, &[]);
        assert_eq!(r1.table.get(&conj), Some(0.3));
        assert_eq!(r1.stats.conjunctions_carried, 1);
    }

    #[test]
    fn zero_rounds_is_identity_plus_root() {
        let engine = PropagationEngine::new(EngineConfig::default().with_rounds(0)).unwrap();
        let result = engine.run(&ScoreTable::default(), &chain());
        assert_eq!(result.table.get(&NodeId::root()), Some(1.0));
        assert_eq!(result.table.len(), 1);
        assert!(result.rounds.is_empty());
    }

    #[test]
    fn dedicated_pool_gives_same_scores() {
        let global = PropagationEngine::new(EngineConfig::default()).unwrap();
        let pooled = PropagationEngine::new(EngineConfig::default().with_worker_threads(2)).unwrap();
        let a = global.run(&ScoreTable::rooted(), &chain());
        let b = pooled.run(&ScoreTable::rooted(), &chain());
        for (id, v) in a.table.iter() {
            assert!(approx(b.table.get(id), v));
        }
        assert_eq!(a.table.len(), b.table.len());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = EngineConfig::default();
        config.jitter_scale = f64::NAN;
        assert!(PropagationEngine::new(config).is_err());
    }
}
