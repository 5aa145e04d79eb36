//! # Drone state
//!
//! Kinematic state of the vehicle, refreshed from telemetry every control tick. A new reading
//! overwrites the previous one as a whole.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{UnitQuaternion, Vector3};

use comms_if::eqpt::flight::Kinematics;
use util::convert::Convert;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Kinematic state of the vehicle in the world frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DroneState {
    pub position_m: Vector3<f64>,

    pub velocity_ms: Vector3<f64>,

    /// Rotation from the body frame into the world frame
    pub attitude: UnitQuaternion<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DroneState {
    /// Magnitude of the linear velocity.
    pub fn speed_ms(&self) -> f64 {
        self.velocity_ms.norm()
    }

    /// Yaw of the body in the world frame, in radians.
    pub fn yaw_rad(&self) -> f64 {
        self.attitude.euler_angles().2
    }
}

impl Default for DroneState {
    fn default() -> Self {
        Self {
            position_m: Vector3::zeros(),
            velocity_ms: Vector3::zeros(),
            attitude: UnitQuaternion::identity(),
        }
    }
}

impl From<&Kinematics> for DroneState {
    fn from(k: &Kinematics) -> Self {
        Self {
            position_m: k.position_m.convert(),
            velocity_ms: k.linear_velocity_ms.convert(),
            attitude: k.orientation_q.convert(),
        }
    }
}

impl From<&DroneState> for Kinematics {
    fn from(s: &DroneState) -> Self {
        Self {
            position_m: s.position_m.convert(),
            linear_velocity_ms: s.velocity_ms.convert(),
            orientation_q: s.attitude.convert(),
        }
    }
}
