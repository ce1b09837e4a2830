//! Parameters structure for ArmCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use util::params::LoadError;

use super::NUM_ROT_AXES;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Tolerance on `axes * axes^T == I` when checking the mounting matrix.
const ORTHONORMAL_TOLERANCE: f64 = 1e-6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for Arm control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {
    // ---- SAFETY ----
    /// Declared safe operating region of the end effector.
    pub envelope: WorkspaceEnvelope,

    // ---- GEOMETRY ----
    pub geometry: ArmGeometry,

    /// Mounting of the perception sensor relative to the arm base.
    pub mounting: MountingParams,

    pub calibration: Calibration,

    // ---- PLANNER ----
    /// Position the arm is assumed to be in at startup.
    ///
    /// Units: meters,
    /// Frame: Robot base
    pub home_pos_m_rb: [f64; 3],

    /// Distance below which the end effector is considered to be at the target.
    ///
    /// Units: meters
    pub arrival_threshold_m: f64,

    /// How far along the remaining distance each step moves.
    pub step_policy: StepPolicy,
}

/// Horizontal radius and height bounds of the safe region, bounds are inclusive.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceEnvelope {
    /// Units: meters
    pub radius_min_m: f64,

    /// Units: meters
    pub radius_max_m: f64,

    /// Height above the base.
    ///
    /// Units: meters
    pub z_min_m: f64,

    /// Height above the base.
    ///
    /// Units: meters
    pub z_max_m: f64,
}

/// Lengths of the serial segments of the arm.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmGeometry {
    /// Shoulder to elbow.
    ///
    /// Units: meters
    pub link1_length_m: f64,

    /// Elbow to wrist.
    ///
    /// Units: meters
    pub link2_length_m: f64,

    /// Wrist to the tip of the gripper.
    ///
    /// Units: meters
    pub gripper_length_m: f64,

    /// Height of the shoulder joint above the base origin.
    ///
    /// Units: meters
    pub base_height_m: f64,
}

/// Fixed transform from the perception sensor frame to the robot base frame.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct MountingParams {
    /// Axis correspondence matrix. Row `i` gives robot axis `i` in terms of the sensor axes, so
    /// `p_rb = axes * p_pf + offset`. Must be orthonormal.
    pub axes: [[f64; 3]; 3],

    /// Position of the sensor origin in the robot base frame.
    ///
    /// Units: meters
    pub offset_m: [f64; 3],
}

/// Mechanical zero-point corrections and reporting limits of the joints.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Kinematic angle at which each joint's servo reads zero. Subtracted from the kinematic
    /// angle before reporting. The shoulder and elbow servos are mounted a quarter turn round
    /// from the kinematic zero on the rig.
    ///
    /// Units: degrees
    pub joint_zero_offset_deg: [f64; NUM_ROT_AXES],

    /// Lowest reported angle of each joint. Exceeding this raises a flag, it does not limit.
    ///
    /// Units: degrees
    pub min_joint_deg: [f64; NUM_ROT_AXES],

    /// Highest reported angle of each joint. Exceeding this raises a flag, it does not limit.
    ///
    /// Units: degrees
    pub max_joint_deg: [f64; NUM_ROT_AXES],
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Step length policy of the planner.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPolicy {
    /// Move a fixed fraction of the remaining distance each step.
    FixedRatio {
        /// Must be in `(0, 1]`.
        ratio: f64,
    },

    /// Move a fixed length each step, chosen by how far away the target is. A step never goes
    /// past the target.
    Bracketed {
        /// Step length when further than `bracket_m` from the target.
        far_step_m: f64,

        /// Step length when within `bracket_m` of the target.
        near_step_m: f64,

        bracket_m: f64,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            envelope: WorkspaceEnvelope {
                radius_min_m: 0.06,
                radius_max_m: 0.22,
                z_min_m: 0.02,
                z_max_m: 0.18,
            },
            geometry: ArmGeometry {
                link1_length_m: 0.08,
                link2_length_m: 0.08,
                gripper_length_m: 0.19,
                base_height_m: 0.12,
            },
            mounting: MountingParams {
                // Robot X is the sensor depth axis, robot Y is sensor left (-X), robot Z is
                // sensor up (-Y).
                axes: [[0.0, 0.0, 1.0], [-1.0, 0.0, 0.0], [0.0, -1.0, 0.0]],
                offset_m: [-0.05, 0.0, 0.10],
            },
            calibration: Calibration {
                joint_zero_offset_deg: [0.0, 90.0, 90.0, 0.0, 0.0],
                min_joint_deg: [0.0, 35.0, 25.0, 0.0, 0.0],
                max_joint_deg: [180.0, 145.0, 155.0, 180.0, 180.0],
            },
            home_pos_m_rb: [0.05, 0.0, 0.12],
            arrival_threshold_m: 0.005,
            step_policy: StepPolicy::FixedRatio { ratio: 0.4 },
        }
    }
}

impl Params {
    /// Check the parameters are self-consistent.
    pub fn validate(&self) -> Result<(), LoadError> {
        let e = &self.envelope;
        if !(e.radius_min_m >= 0.0 && e.radius_min_m <= e.radius_max_m) {
            return Err(LoadError::InvalidValue(format!(
                "envelope radius bounds [{}, {}] are not ordered",
                e.radius_min_m, e.radius_max_m
            )));
        }
        if !(e.z_min_m <= e.z_max_m) {
            return Err(LoadError::InvalidValue(format!(
                "envelope height bounds [{}, {}] are not ordered",
                e.z_min_m, e.z_max_m
            )));
        }

        let g = &self.geometry;
        if [g.link1_length_m, g.link2_length_m, g.gripper_length_m]
            .iter()
            .any(|l| !(*l > 0.0))
        {
            return Err(LoadError::InvalidValue(format!(
                "arm link lengths must be positive, got {:?}",
                g
            )));
        }

        let axes = self.mounting.axes_matrix();
        if !(axes * axes.transpose()).relative_eq(
            &Matrix3::identity(),
            ORTHONORMAL_TOLERANCE,
            ORTHONORMAL_TOLERANCE,
        ) {
            return Err(LoadError::InvalidValue(format!(
                "mounting axes {:?} are not orthonormal",
                self.mounting.axes
            )));
        }

        if !(self.arrival_threshold_m > 0.0) {
            return Err(LoadError::InvalidValue(
                "arrival_threshold_m must be positive".into(),
            ));
        }

        match self.step_policy {
            StepPolicy::FixedRatio { ratio } if !(ratio > 0.0 && ratio <= 1.0) => {
                Err(LoadError::InvalidValue(format!(
                    "fixed step ratio must be in (0, 1], got {}",
                    ratio
                )))
            }
            StepPolicy::Bracketed {
                far_step_m,
                near_step_m,
                ..
            } if !(far_step_m > 0.0 && near_step_m > 0.0) => Err(LoadError::InvalidValue(
                "bracketed step lengths must be positive".into(),
            )),
            _ => Ok(()),
        }
    }

    /// The home position as a vector.
    pub fn home_pos_m_rb(&self) -> Vector3<f64> {
        Vector3::from(self.home_pos_m_rb)
    }
}

impl ArmGeometry {
    /// Distance from the shoulder to the gripper tip with the arm fully extended.
    pub fn total_reach_m(&self) -> f64 {
        self.link1_length_m + self.link2_length_m + self.gripper_length_m
    }
}

impl MountingParams {
    pub fn axes_matrix(&self) -> Matrix3<f64> {
        let a = &self.axes;
        Matrix3::new(
            a[0][0], a[0][1], a[0][2], a[1][0], a[1][1], a[1][2], a[2][0], a[2][1], a[2][2],
        )
    }

    pub fn offset_m(&self) -> Vector3<f64> {
        Vector3::from(self.offset_m)
    }
}

impl StepPolicy {
    /// Fraction of the remaining distance to move this step, always in `(0, 1]` for a positive
    /// distance.
    pub fn step_fraction(&self, distance_m: f64) -> f64 {
        match *self {
            StepPolicy::FixedRatio { ratio } => ratio,
            StepPolicy::Bracketed {
                far_step_m,
                near_step_m,
                bracket_m,
            } => {
                let step_m = if distance_m > bracket_m {
                    far_step_m
                } else {
                    near_step_m
                };
                (step_m / distance_m).min(1.0)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_params_valid() {
        let p = Params::default();
        p.validate().unwrap();

        // The envelope must lie inside the reach of the arm
        assert!(p.geometry.total_reach_m() >= p.envelope.radius_max_m);
    }

    #[test]
    fn test_invalid_params() {
        let mut p = Params::default();
        p.mounting.axes[0] = [0.0, 0.0, 2.0];
        assert!(matches!(p.validate(), Err(LoadError::InvalidValue(_))));

        let mut p = Params::default();
        p.step_policy = StepPolicy::FixedRatio { ratio: 1.5 };
        assert!(p.validate().is_err());

        let mut p = Params::default();
        p.envelope.radius_min_m = 0.3;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_step_fraction() {
        let fixed = StepPolicy::FixedRatio { ratio: 0.4 };
        assert_eq!(fixed.step_fraction(1.0), 0.4);

        let bracketed = StepPolicy::Bracketed {
            far_step_m: 0.05,
            near_step_m: 0.01,
            bracket_m: 0.10,
        };
        assert!((bracketed.step_fraction(0.20) - 0.25).abs() < 1e-12);
        assert!((bracketed.step_fraction(0.05) - 0.2).abs() < 1e-12);
        // Never past the target
        assert_eq!(bracketed.step_fraction(0.004), 1.0);
    }

    #[test]
    fn test_params_from_toml() {
        let p: Params = util::params::from_str(
            r#"
            home_pos_m_rb = [0.1, 0.0, 0.1]
            arrival_threshold_m = 0.01

            [envelope]
            radius_min_m = 0.06
            radius_max_m = 0.22
            z_min_m = 0.02
            z_max_m = 0.18

            [geometry]
            link1_length_m = 0.08
            link2_length_m = 0.08
            gripper_length_m = 0.19
            base_height_m = 0.12

            [mounting]
            axes = [[0.0, 0.0, 1.0], [-1.0, 0.0, 0.0], [0.0, -1.0, 0.0]]
            offset_m = [-0.05, 0.0, 0.10]

            [calibration]
            joint_zero_offset_deg = [0.0, 90.0, 90.0, 0.0, 0.0]
            min_joint_deg = [0.0, 35.0, 25.0, 0.0, 0.0]
            max_joint_deg = [180.0, 145.0, 155.0, 180.0, 180.0]

            [step_policy.bracketed]
            far_step_m = 0.05
            near_step_m = 0.01
            bracket_m = 0.10
            "#,
        )
        .unwrap();

        p.validate().unwrap();
        assert_eq!(
            p.step_policy,
            StepPolicy::Bracketed {
                far_step_m: 0.05,
                near_step_m: 0.01,
                bracket_m: 0.10
            }
        );
    }
}
