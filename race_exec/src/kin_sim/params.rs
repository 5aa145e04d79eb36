//! Kinematic simulation parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Serialize, Deserialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the kinematic simulation.
///
/// The world frame is north-east-down, the ground is at `z = 0`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Params {

    /// Level name reported for the course
    pub level_name: String,

    /// Gates in course order
    pub gates: Vec<GateParams>,

    pub start_position_m: [f64; 3],

    pub start_yaw_deg: f64,

    pub clock: Clock,

    /// A gate is passed when its plane is crossed within this distance of its centre
    pub gate_radius_m: f64,

    /// Side length of the square gate, used for the camera projection
    pub gate_size_m: f64,

    /// Camera field of view
    pub hfov_deg: f64,
    pub vfov_deg: f64,

    /// Gates further away than this are not detected
    pub detection_range_m: f64,

    /// Time constant of the vehicle's velocity tracking
    pub vel_time_constant_s: f64,

    /// Distance at which a trajectory waypoint is considered reached
    pub waypoint_tolerance_m: f64,

    /// Number of gate pose queries which return invalid readings after a level is loaded, as the
    /// simulator does while gates are spawning
    pub invalid_pose_reads: u32,
}

/// A gate of the simulated course.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct GateParams {
    pub position_m: [f64; 3],

    /// Heading of the gate's normal, the direction it is meant to be flown through
    pub yaw_deg: f64,
}

/// How simulated time advances.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Clock {
    /// Every kinematics query advances the simulation by one fixed step.
    Stepped { step_s: f64 },

    /// The simulation follows the wall clock, scaled by the given factor.
    RealTime { time_scale: f64 },
}

impl Default for Params {
    fn default() -> Self {
        Self {
            level_name: String::from("kin_sim_straight"),
            gates: vec![
                GateParams { position_m: [10.0, 0.0, -2.0], yaw_deg: 0.0 },
                GateParams { position_m: [20.0, 2.0, -2.5], yaw_deg: 0.0 },
                GateParams { position_m: [30.0, 0.0, -2.0], yaw_deg: 0.0 },
            ],
            start_position_m: [0.0, 0.0, 0.0],
            start_yaw_deg: 0.0,
            clock: Clock::Stepped { step_s: 0.05 },
            gate_radius_m: 1.5,
            gate_size_m: 3.0,
            hfov_deg: 90.0,
            vfov_deg: 90.0,
            detection_range_m: 30.0,
            vel_time_constant_s: 0.6,
            waypoint_tolerance_m: 0.5,
            invalid_pose_reads: 0,
        }
    }
}
