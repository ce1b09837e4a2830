//! Arm control module
//!
//! Turns a perception-frame target into one bounded step of the end effector, checking the final
//! destination against the workspace envelope and the arm's kinematics before anything moves.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod frame;
pub mod inverse_kinematics;
mod params;
mod state;
pub mod workspace;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use inverse_kinematics::{JointAngles, Unreachable};
pub use params::*;
pub use state::*;
pub use workspace::{Validation, Violation};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The number of rotational axes on the arm.
pub const NUM_ROT_AXES: usize = comms_if::eqpt::arm::NUM_ARM_JOINTS;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during ArmCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum ArmCtrlError {
    #[error("The target position {0:?} contains a non-finite value")]
    NonFiniteTarget([f64; 3]),
}
