//! # Arm command interface
//!
//! Defines the requests a command source (an agent loop, a script, or the `arm_cmd` CLI) sends to
//! the arm executable, and the structured responses it gets back.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use structopt::StructOpt;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single request from a command source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmRequest {
    /// Free-form action token, for example `"grab"`, `"wave"`, or an empty string for pure
    /// positioning.
    #[serde(default)]
    pub command: String,

    /// Where to move to, or `None` for a gesture.
    #[serde(default)]
    pub target: Option<Target>,
}

/// Structured response to an [`ArmRequest`].
///
/// Narrative formatting is left to the command source, the `Display` impl gives a concise status
/// line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmResponse {
    /// True if the request was carried out.
    pub ok: bool,

    /// What happened.
    pub status: ResponseStatus,

    /// Human readable reason or acknowledgement.
    pub reason: String,

    /// Software-tracked end effector position after this request.
    ///
    /// Units: meters,
    /// Frame: Robot base
    pub pose_m_rb: Option<[f64; 3]>,

    /// Joint angles for `pose_m_rb`, rounded to one decimal place, if the pose is reachable.
    ///
    /// Units: degrees
    pub joints_deg: Option<[f64; 5]>,

    /// Remaining straight-line distance to the target after this request.
    ///
    /// Units: meters
    pub remaining_m: Option<f64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Unit a perception-frame position is expressed in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Cm,
    Mm,
    M,
}

/// The target of a positioning request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// An explicit point in the perception frame.
    Point { x: f64, y: f64, z: f64, unit: Unit },

    /// A detected object, resolved against the latest perception snapshot.
    Object { name: String },
}

/// Outcome category of an [`ArmResponse`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseStatus {
    /// A gesture was dispatched (or rejected as unknown).
    Gesture,

    /// One step was taken towards the target. Re-sense and send the request again.
    Step,

    /// The arm is at the target. Do not send the request again.
    Arrived,

    /// The target can never be reached. Do not send the request again.
    Aborted,

    /// The request could not be carried out, for example the actuator did not respond.
    Failed,
}

/// The fixed gesture vocabulary of the arm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gesture {
    Wave,
    Grab,
    Push,
    Home,
    Unrecognised(String),
}

/// Command line form of a request, used by the `arm_cmd` tool.
#[derive(Debug, Clone, StructOpt)]
pub enum ArmCmd {
    /// Step the arm towards a point in the camera frame.
    #[structopt(name = "goto")]
    Goto {
        /// Camera-frame X (right)
        x: f64,

        /// Camera-frame Y (down)
        y: f64,

        /// Camera-frame Z (forward, depth)
        z: f64,

        /// Unit of the coordinates: cm, mm or m
        #[structopt(long, default_value = "cm")]
        unit: Unit,

        /// Action token to send with the positioning demand
        #[structopt(long, default_value = "")]
        command: String,
    },

    /// Step the arm towards a detected object.
    #[structopt(name = "object")]
    Object {
        /// Name of the detected object, for example `cup`
        name: String,

        /// Action token to send with the positioning demand
        #[structopt(long, default_value = "")]
        command: String,
    },

    /// Perform a canned gesture (wave, grab, push, home).
    #[structopt(name = "gesture")]
    Gesture {
        /// Gesture text
        text: String,
    },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ArmRequest {
    /// A request with no target, dispatched as a gesture.
    pub fn gesture(command: &str) -> Self {
        Self {
            command: command.into(),
            target: None,
        }
    }

    /// A positioning request towards a perception-frame point.
    pub fn point(command: &str, x: f64, y: f64, z: f64, unit: Unit) -> Self {
        Self {
            command: command.into(),
            target: Some(Target::Point { x, y, z, unit }),
        }
    }
}

impl ArmResponse {
    /// Build a response which carries no pose information.
    pub fn without_pose(ok: bool, status: ResponseStatus, reason: String) -> Self {
        Self {
            ok,
            status,
            reason,
            pose_m_rb: None,
            joints_deg: None,
            remaining_m: None,
        }
    }

    /// True if the command source should stop re-sending this request.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, ResponseStatus::Arrived | ResponseStatus::Aborted)
    }
}

impl fmt::Display for ArmResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:?}{}] {}",
            self.status,
            if self.ok { "" } else { ", FAILED" },
            self.reason
        )?;

        if let Some(p) = self.pose_m_rb {
            write!(
                f,
                " | pose ({:.1}, {:.1}, {:.1}) cm",
                p[0] * 100.0,
                p[1] * 100.0,
                p[2] * 100.0
            )?;
        }
        if let Some(j) = self.joints_deg {
            write!(f, " | joints {:?} deg", j)?;
        }
        if let Some(r) = self.remaining_m {
            write!(f, " | remaining {:.1} cm", r * 100.0)?;
        }

        Ok(())
    }
}

impl Unit {
    /// Multiplier converting a value in this unit into meters.
    pub fn to_m(&self) -> f64 {
        match self {
            Unit::Cm => 0.01,
            Unit::Mm => 0.001,
            Unit::M => 1.0,
        }
    }
}

impl FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cm" => Ok(Unit::Cm),
            "mm" => Ok(Unit::Mm),
            "m" => Ok(Unit::M),
            other => Err(format!("Unknown unit \"{}\", expected cm, mm or m", other)),
        }
    }
}

impl Gesture {
    /// Match free text against the gesture vocabulary.
    ///
    /// Matching is by keyword anywhere in the text, case-insensitive, and accepts the Korean
    /// keywords used by the voice front-end.
    pub fn from_text(text: &str) -> Self {
        let lower = text.to_lowercase();

        if lower.contains("wave") {
            Gesture::Wave
        } else if lower.contains("grab") || lower.contains("잡") {
            Gesture::Grab
        } else if lower.contains("push") || lower.contains("밀") {
            Gesture::Push
        } else if lower.contains("home") || lower.contains("돌아가") {
            Gesture::Home
        } else {
            Gesture::Unrecognised(text.to_string())
        }
    }

    /// Acknowledgement text for the gesture.
    pub fn acknowledgement(&self) -> String {
        match self {
            Gesture::Wave => "The arm waves (wave)".into(),
            Gesture::Grab => "The arm grabs the object (grab)".into(),
            Gesture::Push => "The arm pushes the object (push)".into(),
            Gesture::Home => "The arm returns to its home position (home)".into(),
            Gesture::Unrecognised(t) => {
                format!("Unknown command \"{}\" (expected wave, grab, push or home)", t)
            }
        }
    }
}

impl ArmCmd {
    /// Convert the command line form into a request.
    pub fn into_request(self) -> ArmRequest {
        match self {
            ArmCmd::Goto {
                x,
                y,
                z,
                unit,
                command,
            } => ArmRequest::point(&command, x, y, z, unit),
            ArmCmd::Object { name, command } => ArmRequest {
                command,
                target: Some(Target::Object { name }),
            },
            ArmCmd::Gesture { text } => ArmRequest::gesture(&text),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
