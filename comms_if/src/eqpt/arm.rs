//! # Arm Equipment Commands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::cmd::Gesture;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of rotational joints on the arm (base, shoulder, elbow, wrist, gripper roll).
pub const NUM_ARM_JOINTS: usize = 5;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Demands that are sent from the arm executable to the arm actuator server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ArmDems {
    /// Move the end effector to a position.
    Pose {
        /// The demanded end effector position.
        ///
        /// Units: meters,
        /// Frame: Robot base
        position_m: [f64; 3],

        /// Joint angles solved for `position_m`, if the position is reachable.
        ///
        /// Units: degrees
        joints_deg: Option<[f64; NUM_ARM_JOINTS]>,

        /// Action token from the command source.
        action: String,

        /// Speed of the motion as a percentage of the actuator's maximum.
        speed_pct: u8,
    },

    /// Perform a canned gesture.
    Gesture(Gesture),
}

/// Response from the arm actuator server based on the demands sent by the client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ArmDemsResponse {
    /// Demands were valid and will be executed
    DemsOk {
        /// Identifier of the motion task started by the demand
        task_id: u64,

        /// Message from the actuator
        message: String,
    },

    /// Demands were invalid and have been rejected
    DemsInvalid(String),

    /// Equipment is invalid so demands cannot be actuated
    EqptInvalid(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ArmDems {
    /// Check that every number in the demand is finite.
    pub fn is_finite(&self) -> bool {
        match self {
            ArmDems::Pose {
                position_m,
                joints_deg,
                ..
            } => {
                position_m.iter().all(|v| v.is_finite())
                    && joints_deg
                        .map(|j| j.iter().all(|v| v.is_finite()))
                        .unwrap_or(true)
            }
            ArmDems::Gesture(_) => true,
        }
    }
}

impl ArmDemsResponse {
    /// True if the actuator accepted the demands.
    pub fn is_ok(&self) -> bool {
        matches!(self, ArmDemsResponse::DemsOk { .. })
    }

    /// Human readable form of the response.
    pub fn message(&self) -> String {
        match self {
            ArmDemsResponse::DemsOk { task_id, message } => {
                format!("{} (task {})", message, task_id)
            }
            ArmDemsResponse::DemsInvalid(m) => format!("demands rejected: {}", m),
            ArmDemsResponse::EqptInvalid(m) => format!("actuator unavailable: {}", m),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_dems_finite() {
        let mut dems = ArmDems::Pose {
            position_m: [0.1, 0.0, 0.1],
            joints_deg: Some([0.0; NUM_ARM_JOINTS]),
            action: String::new(),
            speed_pct: 50,
        };
        assert!(dems.is_finite());

        if let ArmDems::Pose { position_m, .. } = &mut dems {
            position_m[1] = std::f64::NAN;
        }
        assert!(!dems.is_finite());

        assert!(ArmDems::Gesture(Gesture::Wave).is_finite());
    }

    #[test]
    fn test_response_message() {
        let ok = ArmDemsResponse::DemsOk {
            task_id: 4,
            message: "moving".into(),
        };
        assert!(ok.is_ok());
        assert_eq!(ok.message(), "moving (task 4)");

        let bad = ArmDemsResponse::DemsInvalid("NaN in position".into());
        assert!(!bad.is_ok());
        assert_eq!(bad.message(), "demands rejected: NaN in position");
    }
}
