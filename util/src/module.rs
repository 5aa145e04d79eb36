//! Cyclic module interface
//!
//! Modules stepped once per control cycle by `race_exec` (such as the gate tracker) implement
//! [`State`], so that the orchestrator can initialise, step and stop them uniformly.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// MODULE STATE
// ---------------------------------------------------------------------------

/// The internal state of a cyclic module.
pub trait State {
    /// Name of the module, used as a prefix in logs and archive paths.
    const NAME: &'static str;

    /// Data required during initialisation, usually the parameter file path.
    type InitData;
    /// Error raised by initialisation.
    type InitError;

    /// Data consumed by one cycle.
    type InputData;
    /// Data produced by one cycle.
    type OutputData;
    /// Monitoring quantities produced by one cycle.
    type StatusReport;
    /// Error raised by cyclic processing.
    type ProcError;

    /// Initialise the module, loading parameters and creating any archives inside the session.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>;

    /// Run one cycle of the module.
    ///
    /// Returns the cycle's output and status report, or a `ProcError` if the cycle could not
    /// be processed. A failed cycle must leave the module in a state where the next cycle can
    /// still run.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;

    /// Stop commanding motion. Called when the orchestrator aborts an episode.
    fn make_safe(&mut self);
}
