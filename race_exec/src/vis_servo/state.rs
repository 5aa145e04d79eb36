//! Visual servo state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use nalgebra::Vector3;
use serde::Serialize;

// Internal
use super::*;
use crate::{drone::DroneState, perception::Detection};
use comms_if::eqpt::flight::{VelocityCmd, YawMode};
use util::convert::Convert;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The visual servo controller.
#[derive(Debug, Clone)]
pub struct VisServo {
    params: Params,

    state: ControlState,

    /// Errors of the last processed tick
    errors: ServoErrors,
}

/// Memory of the controller between ticks.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct ControlState {
    pub prev_lat_y: f64,

    pub prev_lat_z: f64,

    pub prev_yaw_deg: f64,

    pub prev_time_s: f64,

    /// Magnitude of the previously commanded velocity
    pub prev_mag_ms: f64,

    /// True until the first tick after a reset has been processed
    pub first_tick: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VisServo {
    pub fn new(params: Params) -> Self {
        Self {
            params,
            state: ControlState {
                first_tick: true,
                ..Default::default()
            },
            errors: ServoErrors::default(),
        }
    }

    /// Reset the controller when visual servoing is (re)entered.
    ///
    /// The magnitude filter is seeded with the vehicle's current speed so that picking up a
    /// gate doesn't cut the thrust.
    pub fn reset(&mut self, current_speed_ms: f64) {
        self.state = ControlState {
            prev_mag_ms: current_speed_ms,
            first_tick: true,
            ..Default::default()
        };
    }

    /// Process one tick.
    ///
    /// `time_s` is a monotonic time in seconds, only differences between ticks are used.
    pub fn step(
        &mut self,
        det: &Detection,
        drone: &DroneState,
        time_s: f64
    ) -> Result<VelocityCmd, VisServoError> {
        if !(det.w > 0.0 && det.h > 0.0) {
            return Err(VisServoError::DegenerateBox { w: det.w, h: det.h });
        }

        let dt_s = time_s - self.state.prev_time_s;
        if !self.state.first_tick && !(dt_s > 0.0) {
            return Err(VisServoError::ZeroTimeDelta { dt_s });
        }

        let errors = servo_errors(&self.params, det);
        let gains = scheduled_gains(&self.params, errors.forward_ms);

        let mut vel_body = Vector3::new(
            errors.forward_ms,
            errors.lat_y * gains.lat_p,
            errors.lat_z * gains.vert_p,
        );
        let mut yaw_rate_degs = errors.yaw_deg * gains.yaw_p;

        if !self.state.first_tick {
            vel_body.y += (errors.lat_y - self.state.prev_lat_y) / dt_s * gains.lat_d;
            vel_body.z += (errors.lat_z - self.state.prev_lat_z) / dt_s * gains.vert_d;
            yaw_rate_degs += (errors.yaw_deg - self.state.prev_yaw_deg) / dt_s * gains.yaw_d;
        }

        let raw_mag = vel_body.norm();
        if !(raw_mag > 0.0) || !raw_mag.is_finite() {
            return Err(VisServoError::ZeroMagnitude);
        }

        vel_body *= smoothing_factor(self.params.smoothing, raw_mag, self.state.prev_mag_ms);

        let vel_world = drone.attitude * vel_body;

        debug!(
            "VisServo: depth {:.2} m, lat ({:.3}, {:.3}), yaw {:.2} deg, vel {:.2} m/s",
            errors.depth_m,
            errors.lat_y,
            errors.lat_z,
            errors.yaw_deg,
            vel_world.norm()
        );

        self.state = ControlState {
            prev_lat_y: errors.lat_y,
            prev_lat_z: errors.lat_z,
            prev_yaw_deg: errors.yaw_deg,
            prev_time_s: time_s,
            prev_mag_ms: vel_world.norm(),
            first_tick: false,
        };
        self.errors = errors;

        Ok(VelocityCmd {
            vel_ms: vel_world.convert(),
            duration_s: self.params.cmd_duration_s,
            yaw_mode: YawMode::RateDegs(yaw_rate_degs),
        })
    }

    pub fn control_state(&self) -> &ControlState {
        &self.state
    }

    /// Errors computed on the last successful tick.
    pub fn errors(&self) -> &ServoErrors {
        &self.errors
    }

    pub fn params(&self) -> &Params {
        &self.params
    }
}
