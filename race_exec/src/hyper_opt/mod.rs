//! # Segment hyperparameter optimiser
//!
//! The optimiser tunes the motion parameters of every segment of the course between episodes,
//! using only the cumulative time at which each gate was reached. After each episode the lap
//! record is scanned from the first segment:
//!
//! - A segment reached faster than ever before is accepted, its parameters become the last known
//!   good ones.
//! - A segment reached within the tolerance of its best time is soft regressed, its last known
//!   good parameters are restored and the scan continues.
//! - Otherwise (a hard regression or a missed segment) every segment from this one onwards is
//!   rolled back and the scan stops. This index is the breakpoint.
//!
//! Every segment from the mutation start index onwards is then perturbed by the [`Mutator`]. The
//! start index is normally the breakpoint, but with a fixed probability it is drawn from the
//! segments before it, so that earlier segments keep being explored.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod mutation;
mod optimiser;
pub mod params;
mod record;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;

use crate::course::SegmentParams;

pub use mutation::*;
pub use optimiser::*;
pub use params::Params;
pub use record::*;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Cumulative race time at which each gate of the course was reached, in seconds.
///
/// Segments which were not reached hold the sentinel time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LapRecord {
    pub times_s: Vec<f64>,
}

/// The outcome of one optimiser update.
#[derive(Debug, Clone)]
pub struct OptimiserStep {
    /// Number of the episode the update was made for, starting at 0
    pub iteration: u64,

    /// What happened to each segment
    pub decisions: Vec<SegmentDecision>,

    /// Index of the first hard regressed or missed segment, or the finish index if there was
    /// none
    pub breakpoint: usize,

    /// Index of the first mutated segment
    pub start_idx: usize,

    /// The start index was drawn by exploration rather than set to the breakpoint
    pub explored: bool,

    /// Parameters to fly the next episode with
    pub next_params: Vec<SegmentParams>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The optimiser's decision on a single segment.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub enum SegmentDecision {
    /// New best time, the parameters were kept
    Accepted,

    /// Slower but within the tolerance, the last known good parameters were restored
    SoftRegressed,

    /// Slower than the tolerance allows, this and all later segments were rolled back
    HardRegressed,

    /// The segment wasn't reached, this and all later segments were rolled back
    Missed,

    /// After the breakpoint
    RolledBack,
}

#[derive(Debug, thiserror::Error)]
pub enum HyperOptError {
    #[error("The initial parameter vector is empty")]
    EmptyVector,

    #[error("Expected a lap record with {expected} segments, found {found}")]
    LapLength { expected: usize, found: usize },

    #[error("Exploration probability must be in [0, 1], found {0}")]
    InvalidExploreProbability(f64),

    #[error("Could not write the run log: {0}")]
    RunLogError(std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl LapRecord {
    pub fn new(times_s: Vec<f64>) -> Self {
        Self { times_s }
    }

    pub fn len(&self) -> usize {
        self.times_s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times_s.is_empty()
    }

    /// Time at which the finish gate was reached, `None` if the race wasn't completed.
    pub fn race_time_s(&self, sentinel_s: f64) -> Option<f64> {
        match self.times_s.last() {
            Some(&t) if t < sentinel_s => Some(t),
            _ => None,
        }
    }
}

impl SegmentDecision {
    /// The segment's parameters survive into the next episode unmutated, unless exploration
    /// reaches back past it.
    pub fn is_kept(&self) -> bool {
        matches!(self, SegmentDecision::Accepted | SegmentDecision::SoftRegressed)
    }
}
