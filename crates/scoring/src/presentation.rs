//! Chart fallback estimates.
//!
//! Charts that have no category breakdown for a country show the
//! deterministic estimate plus a bounded random jitter, so the bars do not
//! look machine-flat. This module is display-only; gap analysis and SWOT
//! always use [`score_categories`] directly.

use common::Country;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::categories::{score_categories, CategoryScores};

/// Maximum absolute jitter added to each category, in score points.
pub const JITTER: f64 = 5.0;

/// Produces jittered category scores for chart display.
#[derive(Debug, Clone)]
pub struct ChartEstimator {
    rng: StdRng,
}

impl ChartEstimator {
    /// Unseeded: repeated calls give different values for the same country.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Seeded: the same seed and inputs always give the same values.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn estimate(&mut self, country: &Country) -> CategoryScores {
        let base = score_categories(country);
        CategoryScores::from_fn(|category| {
            let jitter = self.rng.gen_range(-JITTER..=JITTER);
            (base.get(category) + jitter).clamp(0.0, 100.0)
        })
    }
}

impl Default for ChartEstimator {
    fn default() -> Self {
        Self::new()
    }
}
