//! # Arm library.
//!
//! This library allows other crates in the workspace to access items defined inside the arm
//! crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Arm control module - validates targets, plans steps and solves joint angles
pub mod arm_ctrl;

/// Command processor - handles a single request from a command source
pub mod cmd_processor;

/// Command server - recieves requests from command sources
pub mod cmd_server;

/// Actuation dispatcher - sends poses and gestures to the simulated or real arm
pub mod dispatch;

/// Executable parameters
pub mod params;

/// Perception snapshot - latest detected objects
pub mod perception;
