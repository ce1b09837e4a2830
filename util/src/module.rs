//! Control module interface
//!
//! The planner in `arm_exec` is written as a module: it is initialised once from a parameter
//! file at startup and then processed once per request.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::session::Session;

// ---------------------------------------------------------------------------
// MODULE STATE
// ---------------------------------------------------------------------------

/// A control module's state.
///
/// Processing takes the module's input and returns an output together with a status report.
/// Normal outcomes, including refusals, belong in the output. `ProcError` is for input the
/// module cannot work with at all.
pub trait State {
    /// Usually the name of the module's parameter file.
    type InitData;
    type InitError;

    type InputData;
    type OutputData;

    /// Diagnostics of the last `proc` call.
    type StatusReport;
    type ProcError;

    /// Load parameters and reset the module to its starting state. The session is available for
    /// modules which record what they were initialised with.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>;

    /// Process one input.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;
}
