//! # Actuation dispatcher
//!
//! Sends a planned pose, or a named gesture, to the arm actuator and relays its answer. Exactly
//! one demand is sent per dispatch and failures are never retried, the caller decides what to do
//! next.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Mechanisms client - sends arm demands to the mechanisms server
pub mod mech_client;

/// In-process simulated actuator
pub mod sim;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, warn};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use comms_if::{
    cmd::Gesture,
    eqpt::arm::{ArmDems, ArmDemsResponse, NUM_ARM_JOINTS},
};

pub use mech_client::{MechClient, MechClientError};
pub use sim::SimActuator;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Something that can move the arm.
pub trait Actuator: Send {
    /// Send one set of demands and wait for the actuator's response.
    fn send_demands(&mut self, demands: &ArmDems) -> Result<ArmDemsResponse, ActuatorError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A pose produced by the planner, ready to be sent to the actuator.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPose {
    /// Units: meters,
    /// Frame: Robot base
    pub position_m_rb: Vector3<f64>,

    /// Rounded joint angles for the position, if it is reachable.
    ///
    /// Units: degrees
    pub joints_deg: Option<[f64; NUM_ARM_JOINTS]>,
}

/// Outcome of a dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResult {
    pub ok: bool,
    pub message: String,
}

pub struct Dispatcher {
    actuator: Box<dyn Actuator>,

    /// Speed sent with pose demands.
    speed_pct: u8,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Which actuator backend the dispatcher talks to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActuatorBackend {
    /// In-process simulated arm
    Sim,

    /// The mechanisms server, which drives the real arm
    Real,
}

#[derive(Debug, thiserror::Error)]
pub enum ActuatorError {
    #[error(transparent)]
    MechClient(#[from] MechClientError),

    #[error("The actuator rejected the demands before sending: {0}")]
    InvalidDemands(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Dispatcher {
    pub fn new(actuator: Box<dyn Actuator>, speed_pct: u8) -> Self {
        Self {
            actuator,
            speed_pct,
        }
    }

    /// Dispatch a command.
    ///
    /// With no pose the command is matched against the gesture vocabulary, an unknown gesture is
    /// reported back without contacting the actuator. With a pose the command is sent along as
    /// the action token of a pose demand.
    pub fn dispatch(&mut self, command: &str, pose: Option<&PlannedPose>) -> DispatchResult {
        match pose {
            None => self.dispatch_gesture(command),
            Some(p) => self.dispatch_pose(command, p),
        }
    }

    fn dispatch_gesture(&mut self, command: &str) -> DispatchResult {
        let gesture = Gesture::from_text(command);

        if let Gesture::Unrecognised(_) = gesture {
            debug!("Unrecognised gesture \"{}\", nothing sent", command);
            return DispatchResult {
                ok: false,
                message: gesture.acknowledgement(),
            };
        }

        let ack = gesture.acknowledgement();
        self.send(&ArmDems::Gesture(gesture), ack)
    }

    fn dispatch_pose(&mut self, command: &str, pose: &PlannedPose) -> DispatchResult {
        let p = &pose.position_m_rb;
        let dems = ArmDems::Pose {
            position_m: [p.x, p.y, p.z],
            joints_deg: pose.joints_deg,
            action: command.to_string(),
            speed_pct: self.speed_pct,
        };

        let summary = format!(
            "Moving to ({:.1}, {:.1}, {:.1}) cm",
            p.x * 100.0,
            p.y * 100.0,
            p.z * 100.0
        );
        self.send(&dems, summary)
    }

    fn send(&mut self, dems: &ArmDems, summary: String) -> DispatchResult {
        match self.actuator.send_demands(dems) {
            Ok(r) if r.is_ok() => DispatchResult {
                ok: true,
                message: format!("{}: {}", summary, r.message()),
            },
            Ok(r) => {
                warn!("Actuator did not accept {:?}: {:?}", dems, r);
                DispatchResult {
                    ok: false,
                    message: format!("{}, but the actuator refused: {}", summary, r.message()),
                }
            }
            Err(e) => {
                warn!("Could not send demands to the actuator: {}", e);
                DispatchResult {
                    ok: false,
                    message: format!("{}, but the actuator could not be reached: {}", summary, e),
                }
            }
        }
    }
}
