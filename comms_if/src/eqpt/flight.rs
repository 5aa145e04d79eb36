//! # Flight Controller Equipment Communications Module
//!
//! Commands for the simulated vehicle's own flight controller. The flight controller executes
//! trajectories asynchronously: a `MoveOnSpline` or `MoveByVelocity` request returns as soon as
//! the task has been started, and a new task supersedes whatever task is still running.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Fly a smooth trajectory through an ordered list of waypoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SplineCmd {
    /// Waypoints to pass through, in order, world frame
    pub waypoints_m: Vec<[f64; 3]>,

    /// Maximum velocity along the trajectory
    pub vel_max_ms: f64,

    /// Maximum acceleration along the trajectory
    pub acc_max_mss: f64,

    /// Require the trajectory to pass exactly through the waypoints
    pub add_position_constraint: bool,

    /// Constrain the velocity at each waypoint
    pub add_velocity_constraint: bool,

    /// Constrain the acceleration at each waypoint
    pub add_acceleration_constraint: bool,

    /// Plan the new trajectory from the lookahead point of the current one rather than from the
    /// vehicle's current position
    pub replan_from_lookahead: bool,
}

/// Fly at a constant world-frame velocity for a fixed duration.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq)]
pub struct VelocityCmd {
    /// Velocity demand in the world frame
    pub vel_ms: [f64; 3],

    /// How long the demand is held before the flight controller stops
    pub duration_s: f64,

    /// Yaw behaviour while the command executes
    pub yaw_mode: YawMode,
}

/// Kinematic state of the vehicle as estimated by the flight controller.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Kinematics {
    /// Position in the world frame
    pub position_m: [f64; 3],

    /// Linear velocity in the world frame
    pub linear_velocity_ms: [f64; 3],

    /// Attitude of the vehicle body in the world frame, `[w, x, y, z]`
    pub orientation_q: [f64; 4],
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Yaw behaviour of a velocity command.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq)]
pub enum YawMode {
    /// Rotate at the given rate in degrees/second
    RateDegs(f64),

    /// Hold the given absolute yaw in degrees
    AngleDeg(f64),
}

/// Requests sent to the flight controller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum FlightRequest {
    /// Give the API control of the vehicle
    EnableApiControl { vehicle: String },

    /// Hand control of the vehicle back to the simulator
    DisableApiControl { vehicle: String },

    Arm { vehicle: String },

    Disarm { vehicle: String },

    /// Take off to the given height above the current position. The response is only sent once
    /// the vehicle has reached it.
    Takeoff { vehicle: String, height_m: f64 },

    MoveOnSpline { vehicle: String, cmd: SplineCmd },

    MoveByVelocity { vehicle: String, cmd: VelocityCmd },

    GetKinematics { vehicle: String },
}

/// Responses from the flight controller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum FlightResponse {
    /// The request was executed
    Ok,

    /// An asynchronous task was started with the given id
    TaskStarted(u64),

    /// Kinematic state of the vehicle
    Kinematics(Kinematics),

    /// The request could not be executed
    Error(String),
}
