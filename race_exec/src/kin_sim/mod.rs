//! # Kinematic simulation
//!
//! An in-process stand in for the simulator, used for offline runs and tests. The vehicle is a
//! point mass which:
//!
//! - follows trajectory commands in straight lines between their waypoints, limited by the
//!   command's maximum velocity and acceleration, and stops on the last waypoint,
//! - tracks velocity commands with a first order lag for the command's duration, after which it
//!   slows to a hover,
//! - turns its nose along the direction of travel on trajectories, and as commanded otherwise.
//!
//! A built-in referee scores a gate when the vehicle crosses the gate's plane within the gate
//! radius, and reports the gate as missed when the plane is crossed outside of it. The camera is
//! a pin-hole projection of the next two gates' outlines.
//!
//! With a stepped clock every kinematics query advances the simulation by one step, so a control
//! loop runs as fast as it is polled. With a real time clock the simulation follows the wall
//! clock.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod params;
mod sim;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::{Arc, Mutex, MutexGuard};
use chrono::Utc;
use log::{debug, info};
use nalgebra::Vector3;

use comms_if::eqpt::{
    flight::{SplineCmd, VelocityCmd},
    perception::DetectionFrame,
    race::SegmentScore,
};
use util::convert::Convert;

use crate::{
    course::Gate,
    drone::DroneState,
    interface::{BackendResult, FlightCtrl, GateDetector, SimSession, Telemetry},
};
use sim::{Command, Sim};

pub use params::{Clock, GateParams, Params};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The kinematic simulation.
pub struct KinSim {
    sim: Arc<Mutex<Sim>>,
}

/// Gate detector looking through the simulated vehicle's camera.
pub struct KinSimDetector {
    sim: Arc<Mutex<Sim>>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum KinSimError {
    #[error("No level has been loaded")]
    NoLevelLoaded,

    #[error("API control is not enabled")]
    ControlNotEnabled,

    #[error("The vehicle is not armed")]
    NotArmed,

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Gate number {0} is not part of the course")]
    GateOutOfRange(usize),

    #[error("The simulation state is poisoned")]
    Poisoned,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl KinSim {
    pub fn new(params: Params) -> Self {
        Self {
            sim: Arc::new(Mutex::new(Sim::new(params))),
        }
    }

    /// A detector sharing this simulation.
    pub fn detector(&self) -> KinSimDetector {
        KinSimDetector {
            sim: self.sim.clone(),
        }
    }

    /// Name of the level described by the parameters.
    pub fn level_name(&self) -> BackendResult<String> {
        Ok(lock(&self.sim)?.params.level_name.clone())
    }

    /// Require the vehicle to be ready to accept flight commands.
    fn ready(sim: &Sim) -> Result<(), KinSimError> {
        if !sim.control_enabled {
            Err(KinSimError::ControlNotEnabled)
        }
        else if !sim.armed {
            Err(KinSimError::NotArmed)
        }
        else {
            Ok(())
        }
    }
}

impl SimSession for KinSim {
    fn load_level(&mut self, name: &str) -> BackendResult<()> {
        lock(&self.sim)?.load_level(name);
        Ok(())
    }

    fn start_race(&mut self, tier: u8) -> BackendResult<()> {
        let mut sim = lock(&self.sim)?;
        if sim.level.is_none() {
            return Err(KinSimError::NoLevelLoaded.into());
        }

        sim.start_race();
        info!("KinSim race started (tier {})", tier);
        Ok(())
    }

    fn reset_race(&mut self) -> BackendResult<()> {
        let mut sim = lock(&self.sim)?;
        sim.race = Default::default();
        sim.reset_vehicle();
        Ok(())
    }

    fn pause(&mut self) -> BackendResult<()> {
        let mut sim = lock(&self.sim)?;
        sim.sync();
        sim.paused = true;
        Ok(())
    }

    fn unpause(&mut self) -> BackendResult<()> {
        let mut sim = lock(&self.sim)?;
        sim.sync();
        sim.paused = false;
        Ok(())
    }

    fn reset(&mut self) -> BackendResult<()> {
        let mut sim = lock(&self.sim)?;
        sim.race = Default::default();
        sim.reset_vehicle();
        sim.control_enabled = false;
        sim.armed = false;
        sim.paused = false;
        Ok(())
    }

    fn gate_poses(&mut self) -> BackendResult<Vec<Gate>> {
        let mut sim = lock(&self.sim)?;
        if sim.level.is_none() {
            return Err(KinSimError::NoLevelLoaded.into());
        }

        sim.pose_reads += 1;

        // Gates still spawning report NaN poses
        if sim.pose_reads <= sim.params.invalid_pose_reads {
            let mut gates = sim.gates.clone();
            if let Some(g) = gates.last_mut() {
                g.position_m = Vector3::repeat(std::f64::NAN);
            }
            return Ok(gates);
        }

        Ok(sim.gates.clone())
    }
}

impl FlightCtrl for KinSim {
    fn enable_control(&mut self) -> BackendResult<()> {
        lock(&self.sim)?.control_enabled = true;
        Ok(())
    }

    fn arm(&mut self) -> BackendResult<()> {
        let mut sim = lock(&self.sim)?;
        if !sim.control_enabled {
            return Err(KinSimError::ControlNotEnabled.into());
        }
        sim.armed = true;
        Ok(())
    }

    fn disarm(&mut self) -> BackendResult<()> {
        let mut sim = lock(&self.sim)?;
        sim.armed = false;
        sim.velocity_ms = Vector3::zeros();
        sim.command = Command::Hover;
        Ok(())
    }

    fn takeoff(&mut self, height_m: f64) -> BackendResult<()> {
        let mut sim = lock(&self.sim)?;
        Self::ready(&sim)?;

        sim.sync();
        sim.position_m.z = -height_m.abs();
        sim.velocity_ms = Vector3::zeros();
        sim.command = Command::Hover;

        debug!("KinSim takeoff to {:.2} m", -sim.position_m.z);
        Ok(())
    }

    fn move_on_spline(&mut self, cmd: &SplineCmd) -> BackendResult<()> {
        let mut sim = lock(&self.sim)?;
        Self::ready(&sim)?;

        if cmd.waypoints_m.is_empty() {
            return Err(KinSimError::InvalidCommand("trajectory has no waypoints".into()).into());
        }
        if !(cmd.vel_max_ms > 0.0 && cmd.acc_max_mss > 0.0) {
            return Err(KinSimError::InvalidCommand(format!(
                "non-positive trajectory limits (v {}, a {})",
                cmd.vel_max_ms, cmd.acc_max_mss
            )).into());
        }

        sim.sync();
        sim.command = Command::Spline {
            waypoints_m: cmd.waypoints_m.iter().map(|w| w.convert()).collect(),
            wp_idx: 0,
            vel_max_ms: cmd.vel_max_ms,
            acc_max_mss: cmd.acc_max_mss,
        };
        Ok(())
    }

    fn move_by_velocity(&mut self, cmd: &VelocityCmd) -> BackendResult<()> {
        let mut sim = lock(&self.sim)?;
        Self::ready(&sim)?;

        if !cmd.vel_ms.iter().all(|v| v.is_finite()) {
            return Err(KinSimError::InvalidCommand("non-finite velocity".into()).into());
        }

        sim.sync();
        let until_s = sim.time_s + cmd.duration_s;
        sim.command = Command::Velocity {
            vel_ms: cmd.vel_ms.convert(),
            until_s,
            yaw_mode: cmd.yaw_mode,
        };
        Ok(())
    }

    fn kinematics(&mut self) -> BackendResult<DroneState> {
        let mut sim = lock(&self.sim)?;
        sim.tick();
        Ok(sim.drone_state())
    }
}

impl Telemetry for KinSim {
    fn segment_score(&mut self, gate_number: usize) -> BackendResult<Option<SegmentScore>> {
        let mut sim = lock(&self.sim)?;
        sim.sync();

        let idx = gate_index(&sim, gate_number)?;

        Ok(sim.race.passed_at_s
            .get(idx)
            .copied()
            .flatten()
            .map(|time_s| SegmentScore { time_s, penalty_s: 0.0 }))
    }

    fn gate_passed(&mut self, gate_number: usize) -> BackendResult<bool> {
        let mut sim = lock(&self.sim)?;
        sim.sync();

        let idx = gate_index(&sim, gate_number)?;

        Ok(matches!(sim.race.passed_at_s.get(idx), Some(Some(_))))
    }

    fn gate_missed(&mut self) -> BackendResult<bool> {
        let mut sim = lock(&self.sim)?;
        sim.sync();
        Ok(sim.race.gate_missed)
    }

    fn collision(&mut self) -> BackendResult<bool> {
        let mut sim = lock(&self.sim)?;
        sim.sync();
        Ok(sim.race.collision)
    }

    fn race_time_s(&mut self) -> BackendResult<f64> {
        let mut sim = lock(&self.sim)?;
        sim.sync();
        Ok(sim.race_time_s())
    }
}

impl GateDetector for KinSimDetector {
    fn detect(&mut self) -> BackendResult<DetectionFrame> {
        let mut sim = lock(&self.sim)?;
        sim.sync();

        Ok(DetectionFrame {
            timestamp: Utc::now(),
            boxes: sim.detect(),
        })
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn lock(sim: &Arc<Mutex<Sim>>) -> Result<MutexGuard<'_, Sim>, KinSimError> {
    sim.lock().map_err(|_| KinSimError::Poisoned)
}

/// Index of a 1-based gate number.
fn gate_index(sim: &Sim, gate_number: usize) -> Result<usize, KinSimError> {
    match gate_number {
        n if n >= 1 && n <= sim.gates.len() => Ok(n - 1),
        n => Err(KinSimError::GateOutOfRange(n)),
    }
}
