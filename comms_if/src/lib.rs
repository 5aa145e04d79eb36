//! # Communications interface crate.
//!
//! Provides the interface structures exchanged with the simulator bridge, and the network client
//! used to exchange them.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Request and response definitions for the simulator equipment (flight controller, gate
/// detector, race session and telemetry)
pub mod eqpt;

/// Network module
pub mod net;
