//! # Flight commands
//!
//! Trajectory and velocity commands are fire-and-forget: the flight controller starts executing
//! them and returns straight away. Issuing a new command implicitly replaces the one in flight.
//! The [`FlightCommander`] makes that replacement visible by handing out a [`CommandHandle`] per
//! command, which reports itself as superseded once a newer command has been issued. Handles
//! never need to be joined and can be dropped at any time.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::{Arc, atomic::{AtomicU64, Ordering}};
use log::trace;

use comms_if::eqpt::flight::{SplineCmd, VelocityCmd, YawMode};

use crate::interface::{BackendResult, FlightCtrl};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A command for the flight controller.
#[derive(Debug, Clone, PartialEq)]
pub enum FlightAction {
    Spline(SplineCmd),
    Velocity(VelocityCmd),
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Issues commands to the flight controller and tracks which one is current.
#[derive(Debug, Default)]
pub struct FlightCommander {
    /// Generation of the most recently issued command, 0 if none has been issued
    generation: Arc<AtomicU64>,
}

/// Handle to an issued command.
#[derive(Debug, Clone)]
pub struct CommandHandle {
    generation: u64,

    current: Arc<AtomicU64>,

    is_spline: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FlightAction {
    /// A velocity command holding the vehicle still for the given duration.
    pub fn stop(duration_s: f64) -> Self {
        FlightAction::Velocity(VelocityCmd {
            vel_ms: [0.0; 3],
            duration_s,
            yaw_mode: YawMode::RateDegs(0.0),
        })
    }

    pub fn is_spline(&self) -> bool {
        matches!(self, FlightAction::Spline(_))
    }
}

impl FlightCommander {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a command, superseding the previous one.
    ///
    /// If the flight controller rejects the command the previous command stays current.
    pub fn issue<F: FlightCtrl + ?Sized>(
        &self,
        flight: &mut F,
        action: &FlightAction
    ) -> BackendResult<CommandHandle> {
        match action {
            FlightAction::Spline(cmd) => flight.move_on_spline(cmd)?,
            FlightAction::Velocity(cmd) => flight.move_by_velocity(cmd)?,
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        trace!("Issued command {}: {:?}", generation, action);

        Ok(CommandHandle {
            generation,
            current: self.generation.clone(),
            is_spline: action.is_spline(),
        })
    }

    /// Number of commands issued so far.
    pub fn num_issued(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

impl CommandHandle {
    /// True while no newer command has been issued.
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.generation
    }

    pub fn is_superseded(&self) -> bool {
        !self.is_current()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_spline(&self) -> bool {
        self.is_spline
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{drone::DroneState, interface::BackendError, kin_sim::KinSimError};

    /// Records commands, rejecting velocity commands when asked to.
    #[derive(Default)]
    struct Recorder {
        splines: usize,
        velocities: usize,
        reject_velocity: bool,
    }

    impl FlightCtrl for Recorder {
        fn enable_control(&mut self) -> BackendResult<()> { Ok(()) }
        fn arm(&mut self) -> BackendResult<()> { Ok(()) }
        fn disarm(&mut self) -> BackendResult<()> { Ok(()) }
        fn takeoff(&mut self, _: f64) -> BackendResult<()> { Ok(()) }

        fn move_on_spline(&mut self, _: &SplineCmd) -> BackendResult<()> {
            self.splines += 1;
            Ok(())
        }

        fn move_by_velocity(&mut self, _: &VelocityCmd) -> BackendResult<()> {
            if self.reject_velocity {
                return Err(BackendError::KinSim(KinSimError::NotArmed));
            }
            self.velocities += 1;
            Ok(())
        }

        fn kinematics(&mut self) -> BackendResult<DroneState> {
            Ok(DroneState::default())
        }
    }

    fn spline() -> FlightAction {
        FlightAction::Spline(SplineCmd {
            waypoints_m: vec![[1.0, 0.0, -2.0]],
            vel_max_ms: 5.0,
            acc_max_mss: 3.0,
            add_position_constraint: true,
            add_velocity_constraint: false,
            add_acceleration_constraint: false,
            replan_from_lookahead: false,
        })
    }

    #[test]
    fn test_new_command_supersedes() {
        let commander = FlightCommander::new();
        let mut rec = Recorder::default();

        let first = commander.issue(&mut rec, &spline()).unwrap();
        assert!(first.is_current());
        assert!(first.is_spline());

        let second = commander.issue(&mut rec, &FlightAction::stop(1.0)).unwrap();
        assert!(first.is_superseded());
        assert!(second.is_current());
        assert_eq!(second.generation(), 2);

        // Dropping handles has no effect on the commander
        drop(first);
        drop(second);
        assert_eq!(commander.num_issued(), 2);
        assert_eq!((rec.splines, rec.velocities), (1, 1));
    }

    #[test]
    fn test_rejected_command_keeps_current() {
        let commander = FlightCommander::new();
        let mut rec = Recorder {
            reject_velocity: true,
            ..Default::default()
        };

        let first = commander.issue(&mut rec, &spline()).unwrap();
        assert!(commander.issue(&mut rec, &FlightAction::stop(1.0)).is_err());
        assert!(first.is_current());
        assert_eq!(commander.num_issued(), 1);
    }
}
