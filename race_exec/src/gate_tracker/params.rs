//! Gate tracker parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Serialize, Deserialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the gate tracker
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Params {

    /// Where the blend approach aims, as a fraction of the way from the vehicle to the target
    /// gate
    pub blend_eta: f64,

    /// Trajectory command flags used by the blend approach
    pub spline_add_position_constraint: bool,
    pub spline_add_velocity_constraint: bool,
    pub spline_add_acceleration_constraint: bool,
    pub spline_replan_from_lookahead: bool,

    /// Speed under which a finishing vehicle is considered settled
    pub settle_speed_ms: f64,

    /// Duration of the stop command issued when finishing
    pub stop_duration_s: f64,

    /// End the episode if the vehicle stops moving
    pub terminate_on_stuck: bool,

    /// Speed under which the vehicle is stuck
    pub stuck_speed_ms: f64,

    /// Number of en route ticks before the stuck check is armed, gives the first command time to
    /// get the vehicle moving
    pub stuck_grace_ticks: u64,

    /// End the episode once the race time exceeds the best complete race time
    pub terminate_on_slower_than_best: bool,

    /// End the episode if the referee reports a missed gate
    pub terminate_on_gate_missed: bool,

    /// End the episode if the referee reports a collision
    pub terminate_on_collision: bool,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            blend_eta: 0.5,
            spline_add_position_constraint: true,
            spline_add_velocity_constraint: false,
            spline_add_acceleration_constraint: false,
            spline_replan_from_lookahead: false,
            settle_speed_ms: 0.5,
            stop_duration_s: 1.0,
            terminate_on_stuck: true,
            stuck_speed_ms: 0.05,
            stuck_grace_ticks: 3,
            terminate_on_slower_than_best: true,
            terminate_on_gate_missed: true,
            terminate_on_collision: false,
        }
    }
}
