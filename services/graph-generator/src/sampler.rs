//! Weighted status sampling
//!
//! Builds the cumulative step function over `[0, total)` in map order and
//! returns the first label whose upper bound exceeds a uniform draw.

use rand::Rng;

use bizgraph_models::{LifecycleStatus, StatusWeights};

/// Draw one label with probability `weight / total`.
///
/// Panics when `entries` is empty or the weights do not sum to a positive
/// finite number; both are programmer errors.
pub fn sample_weighted<L: Copy, R: Rng>(entries: &[(L, f64)], rng: &mut R) -> L {
    assert!(!entries.is_empty(), "weighted sampling needs at least one label");

    let total: f64 = entries.iter().map(|(_, weight)| *weight).sum();
    assert!(
        total.is_finite() && total > 0.0,
        "weights must sum to a positive finite number, got {}",
        total
    );

    let draw = rng.gen_range(0.0..total);
    let mut cumulative = 0.0;
    for (label, weight) in entries {
        cumulative += weight;
        if draw < cumulative {
            return *label;
        }
    }

    // Rounding left the draw past every bound
    entries
        .iter()
        .find(|(_, weight)| *weight > 0.0)
        .map(|(label, _)| *label)
        .unwrap_or(entries[0].0)
}

pub fn sample_status<S: LifecycleStatus, R: Rng>(
    weights: &StatusWeights<S>,
    rng: &mut R,
) -> S {
    sample_weighted(weights.entries(), rng)
}
