//! # Perception module
//!
//! Perception turns the boxes returned by the gate detector into at most one [`Detection`], the
//! gate the vehicle should servo on. The [`PerceptionService`] owns the detector and polls it in
//! a background loop, publishing each result into a single slot mailbox read by the control loop.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod select;
mod service;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

pub use select::select_detection;
pub use service::*;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A detected gate, in normalised image coordinates.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Horizontal position of the box centre, 0 at the left edge of the image
    pub mx: f64,

    /// Vertical position of the box centre, 0 at the top edge of the image
    pub my: f64,

    /// Box width
    pub w: f64,

    /// Box height
    pub h: f64,

    pub score: f64,
}

/// Perception policy parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {
    /// Boxes with a lower score are discarded
    pub min_confidence: f64,

    /// Smallest box area reported as a detection, smaller boxes are usually the gate after the
    /// one being approached
    pub min_area: f64,

    /// Largest box area reported as a detection, larger boxes fill the frame as the vehicle flies
    /// through the gate
    pub max_area: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            min_confidence: 0.97,
            min_area: 0.01,
            max_area: 0.98,
        }
    }
}
