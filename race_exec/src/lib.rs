//! # Racer library.
//!
//! This library allows the racer executables, benches and other crates in the workspace to access
//! items defined inside the racer crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Command line arguments shared by the executables
pub mod cli;

/// Course description - gates and per-segment motion parameters
pub mod course;

/// Kinematic state of the vehicle
pub mod drone;

/// Episode orchestrator - flies episodes and feeds their lap records to the optimiser
pub mod episode;

/// Flight commands and their supersession
pub mod flight_cmd;

/// Gate tracker - decides which gate is targeted and how it is approached
pub mod gate_tracker;

/// Segment hyperparameter optimiser
pub mod hyper_opt;

/// Interfaces to the simulator
pub mod interface;

/// Kinematic simulation - an in-process simulator for offline runs and tests
pub mod kin_sim;

/// Single slot, latest wins mailbox
pub mod mailbox;

/// Perception - selects the gate to servo on from the detector's boxes
pub mod perception;

/// Periodic background loops
pub mod poll_loop;

/// Simulator bridge client
pub mod sim_client;

/// Visual servo controller
pub mod vis_servo;
