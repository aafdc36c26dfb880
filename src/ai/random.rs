//! Seedable randomness for wander sampling and avoidance jitter

use rand::SeedableRng;
use rand::rngs::StdRng;

/// Source of uniform samples for steering decisions.
///
/// Implemented for every [`rand::Rng`], so a seeded [`StdRng`] reproduces an
/// agent's trajectory exactly.
pub trait SteeringRng {
    /// Uniform sample in `[low, high)`; returns `low` for an empty range
    fn uniform(&mut self, low: f32, high: f32) -> f32;
}

impl<R: rand::Rng> SteeringRng for R {
    fn uniform(&mut self, low: f32, high: f32) -> f32 {
        if high > low {
            self.gen_range(low..high)
        } else {
            low
        }
    }
}

/// Deterministic generator for one agent
#[must_use]
pub fn seeded(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}
