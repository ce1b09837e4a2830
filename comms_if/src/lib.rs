//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the software.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Requests from command sources and the responses sent back to them
pub mod cmd;

/// Command and response definitions for equipment (the arm actuator and the perception source)
pub mod eqpt;

/// Network module
pub mod net;

// ------------------------------------------------------------------------------------------------
// REEXPORTS
// ------------------------------------------------------------------------------------------------

pub use cmd::Unit;
