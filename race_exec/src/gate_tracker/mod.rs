//! # Gate tracker module
//!
//! The gate tracker decides which gate the vehicle is flying towards and how. It is stepped once
//! per control tick by the episode orchestrator, and moves through the following states:
//!
//! ```text
//! Idle -> AwaitingTakeoff -> EnRoute(gate 0) -> ... -> EnRoute(gate K) -> Finishing -> Finished
//! ```
//!
//! The target gate advances by one when the vehicle comes within the gate passed threshold of
//! the current segment. Within `EnRoute` the approach mode is chosen every tick:
//!
//! - `VisualServo`: a gate is detected this tick, the visual servo computes a velocity command.
//! - `BlendApproach`: no gate is detected, a trajectory is flown towards a point between the
//!   vehicle and the target gate to bring the gate back into view. The trajectory command is only
//!   issued when the mode is entered or the target gate advances, so it isn't restarted every
//!   tick.
//!
//! The race is finished when the finish gate has been passed, either according to telemetry or
//! to the tracker's own distance check. Early termination causes (stuck, slower than the best
//! race, missed gate, collision) lead down the same path. A single stop command is issued on
//! entering `Finishing`, and the tracker is `Finished` once the vehicle has slowed down.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod params;
pub mod state;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt;
use serde::Serialize;

use crate::{drone::DroneState, perception::Detection};

pub use params::Params;
pub use state::*;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telemetry read at the start of a control tick.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    /// The referee has seen the finish gate passed
    pub finish_gate_passed: bool,

    pub gate_missed: bool,

    pub collision: bool,

    pub race_time_s: f64,
}

/// Input to one tick of the tracker.
#[derive(Debug, Copy, Clone)]
pub struct InputData {
    /// Monotonic time of the tick
    pub time_s: f64,

    pub drone: DroneState,

    /// The gate selected by perception, if any
    pub detection: Option<Detection>,

    pub telemetry: TelemetrySnapshot,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// State of the tracker.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum TrackerState {
    /// No episode loaded
    Idle,

    AwaitingTakeoff,

    /// Flying towards a gate. The approach mode is `None` until the first tick after takeoff.
    EnRoute(Option<ApproachMode>),

    /// A stop command has been issued, waiting for the vehicle to settle
    Finishing,

    Finished,
}

/// How the target gate is approached.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub enum ApproachMode {
    VisualServo,
    BlendApproach,
}

/// Why an episode ended.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub enum FinishCause {
    /// The finish gate was passed
    Finished,

    /// The vehicle stopped moving
    Stuck,

    /// The race time exceeded the best complete race time
    SlowerThanBest,

    GateMissed,

    Collision,

    /// The orchestrator stopped the episode
    Aborted,
}

#[derive(Debug, thiserror::Error)]
pub enum GateTrackerError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Could not create the archive: {0}")]
    ArchiveError(util::archive::ArchiveError),

    #[error("Expected {expected} segment parameters for the course, found {found}")]
    SegmentParamsLength { expected: usize, found: usize },

    #[error("Cannot {0} while the tracker is {1}")]
    InvalidTransition(&'static str, &'static str),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TrackerState {
    pub fn name(&self) -> &'static str {
        match self {
            TrackerState::Idle => "Idle",
            TrackerState::AwaitingTakeoff => "AwaitingTakeoff",
            TrackerState::EnRoute(None) => "EnRoute",
            TrackerState::EnRoute(Some(ApproachMode::VisualServo)) => "VisualServo",
            TrackerState::EnRoute(Some(ApproachMode::BlendApproach)) => "BlendApproach",
            TrackerState::Finishing => "Finishing",
            TrackerState::Finished => "Finished",
        }
    }
}

impl fmt::Display for FinishCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FinishCause::Finished => "finished",
            FinishCause::Stuck => "stuck",
            FinishCause::SlowerThanBest => "slower than best",
            FinishCause::GateMissed => "gate missed",
            FinishCause::Collision => "collision",
            FinishCause::Aborted => "aborted",
        };

        write!(f, "{}", s)
    }
}
