//! # Course module
//!
//! The course is the ordered list of gates the vehicle must fly through, captured once from the
//! simulator when the level is set up. The finish index marks the gate whose passing ends the
//! race, and determines the length of the per-segment parameter vector.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Serialize, Deserialize};

use comms_if::eqpt::race::GatePose;
use util::convert::Convert;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single gate of the course.
#[derive(Debug, Clone, PartialEq)]
pub struct Gate {
    /// Position of the gate in the course order
    pub index: usize,

    /// Position of the gate centre in the world frame
    pub position_m: Vector3<f64>,

    /// Attitude of the gate in the world frame
    pub orientation: UnitQuaternion<f64>,
}

/// All gates of the course and the index of the finish gate.
#[derive(Debug, Clone)]
pub struct Course {
    gates: Vec<Gate>,

    finish_idx: usize,
}

/// Motion parameters for one segment, the flight from one gate to the next.
///
/// Segment `i` ends at gate `i`.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentParams {
    /// Maximum velocity used for trajectory commands flown in this segment
    pub v_ms: f64,

    /// Maximum acceleration used for trajectory commands flown in this segment
    pub a_mss: f64,

    /// Distance to the gate under which the gate is considered passed
    pub d_m: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CourseError {
    #[error("The course has no gates")]
    Empty,

    #[error("Finish gate index {finish_idx} is outside of the course ({num_gates} gates)")]
    FinishOutOfRange {
        finish_idx: usize,
        num_gates: usize,
    },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Gate {
    /// Build a gate from its ground truth pose.
    pub fn from_pose(index: usize, pose: &GatePose) -> Self {
        Self {
            index,
            position_m: pose.position_m.convert(),
            orientation: pose.orientation_q.convert(),
        }
    }

    /// A pose reading is only usable if every component is finite. The simulator reports NaNs
    /// for gates whose objects haven't finished spawning.
    pub fn is_valid(&self) -> bool {
        self.position_m.iter().all(|v| v.is_finite())
            && self.orientation.coords.iter().all(|v| v.is_finite())
    }

    /// Distance between the gate centre and the given point.
    pub fn distance_m(&self, point_m: &Vector3<f64>) -> f64 {
        (self.position_m - point_m).norm()
    }
}

impl Course {
    /// Create a new course.
    ///
    /// If `finish_idx` is `None` the last gate of the course is the finish gate.
    pub fn new(gates: Vec<Gate>, finish_idx: Option<usize>) -> Result<Self, CourseError> {
        if gates.is_empty() {
            return Err(CourseError::Empty);
        }

        let finish_idx = finish_idx.unwrap_or(gates.len() - 1);

        if finish_idx >= gates.len() {
            return Err(CourseError::FinishOutOfRange {
                finish_idx,
                num_gates: gates.len(),
            });
        }

        Ok(Self { gates, finish_idx })
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    pub fn gate(&self, idx: usize) -> Option<&Gate> {
        self.gates.get(idx)
    }

    pub fn finish_idx(&self) -> usize {
        self.finish_idx
    }

    /// Number of segments raced, which is also the length of the segment parameter vector.
    pub fn num_segments(&self) -> usize {
        self.finish_idx + 1
    }
}
