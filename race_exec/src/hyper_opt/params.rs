//! Optimiser parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Serialize, Deserialize};

// Internal
use crate::course::SegmentParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the segment optimiser
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Params {

    /// A slower segment time within this much of the best is a soft regression
    pub tolerance_s: f64,

    /// Segment time meaning the segment wasn't reached
    pub sentinel_s: f64,

    /// Probability of drawing the mutation start index from before the breakpoint
    pub p_explore: f64,

    /// Seed of the optimiser's and mutator's random number generators
    pub seed: u64,

    /// Parameters every segment starts from
    pub initial: SegmentParams,

    pub mutation: MutationParams,
}

/// Bounds of the mutation applied to a segment.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct MutationParams {
    /// Largest perturbation of each component
    pub step: SegmentParams,

    /// Lower bound of each component
    pub min: SegmentParams,

    /// Upper bound of each component
    pub max: SegmentParams,
}

impl Params {
    /// The initial parameter vector for a course with the given number of segments.
    pub fn initial_vector(&self, num_segments: usize) -> Vec<SegmentParams> {
        vec![self.initial; num_segments]
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            tolerance_s: 0.5,
            sentinel_s: 1000.0,
            p_explore: 0.3,
            seed: 0,
            initial: SegmentParams {
                v_ms: 10.0,
                a_mss: 5.0,
                d_m: 1.0,
            },
            mutation: MutationParams::default(),
        }
    }
}

impl Default for MutationParams {
    fn default() -> Self {
        Self {
            step: SegmentParams {
                v_ms: 1.0,
                a_mss: 1.0,
                d_m: 0.5,
            },
            min: SegmentParams {
                v_ms: 2.0,
                a_mss: 1.0,
                d_m: 0.5,
            },
            max: SegmentParams {
                v_ms: 30.0,
                a_mss: 50.0,
                d_m: 5.0,
            },
        }
    }
}
