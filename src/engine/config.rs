//! Engine configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Settings for propagation and scoring passes.
///
/// Every field has a default, so `{}` is a valid JSON config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Number of rounds. There is no fixed-point test; this cap is the only
    /// termination rule.
    pub rounds: usize,
    /// Stand-in for an absent endpoint value when scoring edges.
    pub missing_score: f64,
    /// Upper bound (exclusive) of tie-breaking jitter.
    pub jitter_scale: f64,
    /// Dedicated worker pool size; `None` runs on rayon's global pool.
    pub worker_threads: Option<usize>,
    /// Persist each round's materialized edge weights.
    pub commit_edge_weights: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rounds: 2,
            missing_score: 0.001,
            jitter_scale: 1e-6,
            worker_threads: None,
            commit_edge_weights: true,
        }
    }
}

impl EngineConfig {
    pub fn with_rounds(mut self, rounds: usize) -> Self {
        self.rounds = rounds;
        self
    }

    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads);
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.missing_score.is_finite() || self.missing_score < 0.0 {
            return Err(Error::Config(format!(
                "missing_score must be finite and non-negative, got {}",
                self.missing_score
            )));
        }
        if !self.jitter_scale.is_finite() || self.jitter_scale < 0.0 {
            return Err(Error::Config(format!(
                "jitter_scale must be finite and non-negative, got {}",
                self.jitter_scale
            )));
        }
        if self.worker_threads == Some(0) {
            return Err(Error::Config("worker_threads must be at least 1".into()));
        }
        Ok(())
    }
}
