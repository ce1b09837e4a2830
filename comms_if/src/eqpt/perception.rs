//! # Perception Equipment Interface
//!
//! Records published by the perception source (camera + object detector). The core only ever
//! reads the latest frame, it never subscribes to the detector directly.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{serde::ts_milliseconds, DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cmd::Unit;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single detected object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    /// Class name given by the detector, for example `"cup"`.
    pub name: String,

    /// Detection confidence in `[0, 1]`.
    pub confidence: f64,

    /// Position of the object's centre.
    ///
    /// Units: `unit`,
    /// Frame: Perception (camera) frame, X right, Y down, Z forward
    pub position: [f64; 3],

    /// Unit of `position`.
    pub unit: Unit,
}

/// One frame's worth of detections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionFrame {
    /// UTC timestamp at which the frame was acquired
    #[serde(with = "ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    /// Objects found in the frame
    pub objects: Vec<DetectedObject>,
}
