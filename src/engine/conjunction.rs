//! AND-combination of premises.
//!
//! Premises combine like resistors in parallel:
//!
//! ```text
//! combined = 1 / Σ (1 / vᵢ)        combined ≤ min(vᵢ)
//! ```
//!
//! A single zero premise zeroes the whole conjunction. That case takes an
//! explicit branch and never relies on `1 / 0 = ∞` arithmetic.

use smallvec::SmallVec;

/// Premise values gathered for one conjunction in one round.
pub type Premises = SmallVec<[f64; 4]>;

/// Combines premise values into a conjunction value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConjunctionResolver;

impl ConjunctionResolver {
    /// `None` when there are no premises: the conjunction is undefined this
    /// round and keeps its previous value.
    pub fn resolve(&self, premises: &[f64]) -> Option<f64> {
        if premises.is_empty() {
            return None;
        }
        if premises.iter().any(|v| *v <= 0.0) {
            return Some(0.0);
        }
        let inverse_sum: f64 = premises.iter().map(|v| 1.0 / v).sum();
        Some(1.0 / inverse_sum)
    }
}

/// Map an unbounded summed score onto a fuzzy truth value in `[0, 1)`.
///
/// On this scale the two-premise conjunction becomes the Hamacher product
/// `ab / (a + b - ab)`.
pub fn fuzzy_truth(score: f64) -> f64 {
    if score < 0.0 {
        return 0.0;
    }
    score / (1.0 + score)
}
