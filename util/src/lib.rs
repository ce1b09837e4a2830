//! Utility library for the arm software

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod host;
pub mod logger;
pub mod maths;
pub mod module;
pub mod params;
pub mod session;
pub mod script_interpreter;

// ---------------------------------------------------------------------------
// REEXPORTS
// ---------------------------------------------------------------------------

pub use comms_if;
