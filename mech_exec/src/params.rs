//! # Mechanisms Executable Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct MechExecParams {
    /// Endpoint for the demands socket
    pub demands_endpoint: String,

    /// Position the arm rests in at startup and returns to on the home gesture.
    ///
    /// Units: meters,
    /// Frame: Robot base
    pub home_pos_m: [f64; 3],

    /// Time without demands after which the arm is held in safe mode.
    ///
    /// Units: milliseconds
    pub safe_mode_timeout_ms: u64,
}
