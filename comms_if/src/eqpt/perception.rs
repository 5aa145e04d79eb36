//! # Gate Detector Equipment Communications Module
//!
//! The gate detector runs on the simulator side, next to the camera, and returns every box it
//! found in the latest first-person-view frame. Choosing which box (if any) to servo on is done
//! by the racer.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc, serde::ts_milliseconds};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A detected gate bounding box.
///
/// Coordinates are normalised to the image size, so that `(0, 0)` is the top left corner and
/// `(1, 1)` the bottom right corner.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq)]
pub struct GateBox {
    pub y_min: f64,
    pub x_min: f64,
    pub y_max: f64,
    pub x_max: f64,

    /// Detector confidence, between 0 and 1
    pub score: f64,
}

/// All boxes detected in one frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionFrame {
    /// UTC timestamp at which the frame was acquired
    #[serde(with = "ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    pub boxes: Vec<GateBox>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum PerceptionRequest {
    /// Acquire a frame and run the detector on it
    Detect,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum PerceptionResponse {
    Frame(DetectionFrame),

    Error(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl GateBox {
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Centre of the box as `(x, y)`.
    pub fn centre(&self) -> (f64, f64) {
        (
            (self.x_max + self.x_min) / 2.0,
            (self.y_max + self.y_min) / 2.0
        )
    }
}
