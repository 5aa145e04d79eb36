//! # External interfaces
//!
//! The racer reaches the simulator only through the traits in this module. Two implementations
//! are provided: [`crate::sim_client::SimClient`], which talks to the simulator bridge over the
//! network, and [`crate::kin_sim::KinSim`], an in-process kinematic simulation used for offline
//! runs and tests.
//!
//! All calls are synchronous. Trajectory and velocity commands return as soon as the flight
//! controller has accepted them and keep executing in the background, a later command replaces
//! an earlier one.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::{
    flight::{SplineCmd, VelocityCmd},
    perception::DetectionFrame,
    race::SegmentScore,
};

use crate::{
    course::Gate,
    drone::DroneState,
    kin_sim::KinSimError,
    sim_client::SimClientError,
};

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

pub type BackendResult<T> = Result<T, BackendError>;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Error raised by an interface implementation.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Simulator bridge error: {0}")]
    SimClient(#[from] SimClientError),

    #[error("Kinematic simulation error: {0}")]
    KinSim(#[from] KinSimError),
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Lifecycle of the simulation session.
///
/// Scene affecting calls return before the scene has settled, callers are expected to wait a
/// fixed settle delay afterwards.
pub trait SimSession {
    fn load_level(&mut self, name: &str) -> BackendResult<()>;

    fn start_race(&mut self, tier: u8) -> BackendResult<()>;

    fn reset_race(&mut self) -> BackendResult<()>;

    fn pause(&mut self) -> BackendResult<()>;

    fn unpause(&mut self) -> BackendResult<()>;

    fn reset(&mut self) -> BackendResult<()>;

    /// Ground truth gates in course order.
    ///
    /// Individual readings may be invalid while the level is still spawning, see
    /// [`Gate::is_valid`].
    fn gate_poses(&mut self) -> BackendResult<Vec<Gate>>;
}

/// The vehicle's flight controller.
pub trait FlightCtrl {
    fn enable_control(&mut self) -> BackendResult<()>;

    fn arm(&mut self) -> BackendResult<()>;

    fn disarm(&mut self) -> BackendResult<()>;

    /// Take off to the given height, returning once it has been reached.
    fn takeoff(&mut self, height_m: f64) -> BackendResult<()>;

    /// Start flying a trajectory through the command's waypoints.
    fn move_on_spline(&mut self, cmd: &SplineCmd) -> BackendResult<()>;

    /// Start flying at a constant velocity for the command's duration.
    fn move_by_velocity(&mut self, cmd: &VelocityCmd) -> BackendResult<()>;

    fn kinematics(&mut self) -> BackendResult<DroneState>;
}

/// Race telemetry from the simulator's referee.
///
/// Gate numbers are 1-based, gate number `n` is gate index `n - 1`.
pub trait Telemetry {
    /// Score of the segment ending at the given gate, `None` if it hasn't been scored.
    fn segment_score(&mut self, gate_number: usize) -> BackendResult<Option<SegmentScore>>;

    fn gate_passed(&mut self, gate_number: usize) -> BackendResult<bool>;

    fn gate_missed(&mut self) -> BackendResult<bool>;

    fn collision(&mut self) -> BackendResult<bool>;

    fn race_time_s(&mut self) -> BackendResult<f64>;
}

/// A gate detector working on the vehicle's first person camera.
pub trait GateDetector {
    /// Acquire a frame and return every box detected in it.
    fn detect(&mut self) -> BackendResult<DetectionFrame>;
}

/// Everything the episode orchestrator needs from the simulator, apart from perception which
/// runs on its own link.
pub trait RaceBackend: SimSession + FlightCtrl + Telemetry {}

impl<T: SimSession + FlightCtrl + Telemetry> RaceBackend for T {}
