//! Visual servo parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Serialize, Deserialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the visual servo
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Params {

    /// Depth model scale, `depth = depth_a_m * exp(depth_b * w)`
    pub depth_a_m: f64,

    /// Depth model exponent, must be negative so that wider boxes are nearer
    pub depth_b: f64,

    /// Forward speed when the gate is at the standoff depth and centred
    pub base_speed_ms: f64,

    /// Depth at which the forward speed equals the base speed
    pub standoff_m: f64,

    /// Forward speed gained per metre of depth beyond the standoff
    pub k_depth: f64,

    /// Forward speed lost per unit of lateral error
    pub k_lat_damp: f64,

    /// Scale applied to the normalised box centre offsets
    pub error_scale: f64,

    /// Horizontal image position the box centre is driven towards
    pub centre_x: f64,

    /// Vertical image position the box centre is driven towards. Not the image centre, as the
    /// camera is mounted above the vehicle's thrust axis.
    pub centre_y: f64,

    /// Lateral proportional gain, per m/s of forward speed
    pub lat_k_p: f64,

    /// Lateral derivative gain, per m/s of forward speed
    pub lat_k_d: f64,

    /// Vertical proportional gain, per m/s of forward speed
    pub vert_k_p: f64,

    /// Vertical derivative gain, per m/s of forward speed
    pub vert_k_d: f64,

    /// Yaw proportional gain, per m/s of forward speed
    pub yaw_k_p: f64,

    /// Yaw derivative gain. Not scheduled.
    pub yaw_k_d: f64,

    /// Weight of the previous magnitude in the velocity magnitude filter
    pub smoothing: f64,

    /// Duration of each velocity command
    pub cmd_duration_s: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            depth_a_m: 13.401,
            depth_b: -1.976,
            base_speed_ms: 3.0,
            standoff_m: 3.0,
            k_depth: 0.187,
            k_lat_damp: 0.2,
            error_scale: 1.5,
            centre_x: 0.5,
            centre_y: 0.48,
            lat_k_p: 0.62,
            lat_k_d: 0.17,
            vert_k_p: 0.62,
            vert_k_d: 0.09,
            yaw_k_p: 0.7,
            yaw_k_d: 0.07,
            smoothing: 0.3,
            cmd_duration_s: 0.05,
        }
    }
}
