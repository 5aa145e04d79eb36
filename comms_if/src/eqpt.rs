//! # Equipment Interface
//!
//! This module defines the interface structures which are sent to and received from the
//! simulator bridge. All vectors are plain arrays in the simulator's world frame (NED), and all
//! quaternions are `[w, x, y, z]`.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod flight;
pub mod perception;
pub mod race;
