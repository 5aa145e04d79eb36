//! Segment mutation strategies

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::params::MutationParams;
use crate::course::SegmentParams;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A strategy perturbing the parameters of one segment.
///
/// Implementations must only modify `vector[index]`, keep every component within a bounded
/// range, and perturb with zero mean.
pub trait Mutator {
    fn mutate(&mut self, vector: &mut [SegmentParams], index: usize);
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Adds independent uniform noise in `[-step, step]` to each component, then clamps it to the
/// bounds.
#[derive(Debug, Clone)]
pub struct BoundedNoiseMutator {
    params: MutationParams,
    rng: ChaCha8Rng,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl BoundedNoiseMutator {
    pub fn new(params: MutationParams, seed: u64) -> Self {
        Self {
            params,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn perturb(&mut self, value: f64, step: f64, min: f64, max: f64) -> f64 {
        let step = step.abs();
        let noisy = value + self.rng.gen_range(-step..=step);

        noisy.max(min).min(max)
    }
}

impl Mutator for BoundedNoiseMutator {
    fn mutate(&mut self, vector: &mut [SegmentParams], index: usize) {
        let p = self.params;

        if let Some(seg) = vector.get_mut(index) {
            seg.v_ms = self.perturb(seg.v_ms, p.step.v_ms, p.min.v_ms, p.max.v_ms);
            seg.a_mss = self.perturb(seg.a_mss, p.step.a_mss, p.min.a_mss, p.max.a_mss);
            seg.d_m = self.perturb(seg.d_m, p.step.d_m, p.min.d_m, p.max.d_m);
        }
    }
}
