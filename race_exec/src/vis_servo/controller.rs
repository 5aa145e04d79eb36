//! # Visual servo control laws
//!
//! Stateless parts of the visual servo: error extraction from a detection, gain scheduling and
//! the magnitude filter.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use super::Params;
use crate::perception::Detection;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Errors extracted from a single detection.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct ServoErrors {
    /// Estimated depth to the gate
    pub depth_m: f64,

    /// Forward speed demand
    pub forward_ms: f64,

    /// Lateral error, positive when the gate is to the right
    pub lat_y: f64,

    /// Vertical error, positive when the gate is below the aim point
    pub lat_z: f64,

    /// Yaw towards the gate, positive to the right
    pub yaw_deg: f64,
}

/// PD gains for one tick.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Gains {
    pub lat_p: f64,
    pub lat_d: f64,
    pub vert_p: f64,
    pub vert_d: f64,
    pub yaw_p: f64,
    pub yaw_d: f64,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Estimate the depth to a gate from the normalised width of its box.
///
/// Strictly decreasing in `w` for a negative `depth_b`. A zero width gives the model's maximum
/// depth rather than an error, callers must reject zero sized boxes themselves.
pub fn estimate_depth(params: &Params, w: f64) -> f64 {
    params.depth_a_m * (params.depth_b * w).exp()
}

/// Extract the servo errors from a detection. The box must have non-zero width and height.
pub fn servo_errors(params: &Params, det: &Detection) -> ServoErrors {
    let depth_m = estimate_depth(params, det.w);

    let lat_y = params.error_scale * (det.mx - params.centre_x) / det.w;
    let lat_z = params.error_scale * (det.my - params.centre_y) / det.h;

    let forward_ms = params.base_speed_ms
        + (depth_m - params.standoff_m) * params.k_depth
        - lat_y.abs() * params.k_lat_damp;

    let yaw_deg = lat_y.atan2(depth_m).to_degrees();

    ServoErrors {
        depth_m,
        forward_ms,
        lat_y,
        lat_z,
        yaw_deg,
    }
}

/// Gains scheduled on the forward speed.
pub fn scheduled_gains(params: &Params, forward_ms: f64) -> Gains {
    Gains {
        lat_p: forward_ms * params.lat_k_p,
        lat_d: forward_ms * params.lat_k_d,
        vert_p: forward_ms * params.vert_k_p,
        vert_d: forward_ms * params.vert_k_d,
        yaw_p: forward_ms * params.yaw_k_p,
        yaw_d: params.yaw_k_d,
    }
}

/// Factor to scale a raw velocity by so its magnitude becomes a blend of the raw magnitude and
/// the previous one.
///
/// `raw_mag` must be positive.
pub fn smoothing_factor(smoothing: f64, raw_mag: f64, prev_mag: f64) -> f64 {
    ((1.0 - smoothing) * raw_mag + smoothing * prev_mag) / raw_mag
}
