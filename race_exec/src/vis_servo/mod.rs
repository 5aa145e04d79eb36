//! # Visual servo module
//!
//! The visual servo steers the vehicle towards the centre of the detected gate. It works directly
//! on the detection's bounding box, without reconstructing the gate's pose:
//!
//! - The box width gives an estimate of the depth to the gate through a calibrated exponential
//!   model. The forward speed grows with that depth, and is reduced when the gate is off to the
//!   side.
//! - The offset of the box centre from the image centre, scaled by the box size, gives a lateral
//!   and a vertical error. A yaw error is derived from the lateral error and the depth.
//! - A PD controller acts on each error. Its gains are scheduled on the forward speed so the
//!   vehicle corrects harder the faster it flies. The first tick after (re)acquiring a gate only
//!   uses the proportional terms.
//! - The magnitude of the resulting body velocity is smoothed against the previously commanded
//!   magnitude, before it is rotated into the world frame and sent with a yaw rate demand.
//!
//! A degenerate input (zero sized box or no time elapsed since the previous tick) produces no
//! command and leaves the controller memory untouched, so the previous command keeps executing.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod controller;
pub mod params;
pub mod state;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

pub use controller::*;
pub use params::Params;
pub use state::*;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Inputs the controller refuses to process. None of these alter the controller's memory.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum VisServoError {
    #[error("Degenerate detection box ({w} x {h})")]
    DegenerateBox { w: f64, h: f64 },

    #[error("No time has elapsed since the previous tick (dt = {dt_s} s)")]
    ZeroTimeDelta { dt_s: f64 },

    #[error("The commanded velocity has no magnitude")]
    ZeroMagnitude,
}
