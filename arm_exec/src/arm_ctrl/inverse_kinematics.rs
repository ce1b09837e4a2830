//! Arm inverse kinematics calculations
//!
//! The arm is a yawing base (J1) carrying a planar chain: shoulder (J2), elbow (J3) and wrist
//! (J4) joints, followed by the gripper, with a gripper roll joint (J5) that does not affect the
//! tip position.
//!
//! The planar chain is solved in the vertical plane through the base axis and the target, with
//! `r` the horizontal distance from the base axis and `z'` the height above the shoulder. The
//! gripper is pointed along the line from the shoulder to the target (the approach angle `phi`),
//! which fixes the wrist position, and the two-link shoulder/elbow chain is then solved for the
//! wrist by the law of cosines, taking the elbow-up solution.
//!
//! Angle conventions, in the vertical plane:
//! - J2 is the elevation of the upper arm above horizontal,
//! - J3 is the flexion of the forearm relative to the upper arm (zero when straight, positive
//!   bending downwards),
//! - J4 is the flexion of the gripper relative to the forearm, same sense as J3.
//!
//! So the forearm heading is `J2 - J3` and the gripper heading is `J2 - J3 - J4`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use util::maths::{clamp, round_dp};

use super::{ArmGeometry, Calibration, NUM_ROT_AXES};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Slack allowed on the two-link reach checks, absorbs rounding in the wrist back-out.
const REACH_TOLERANCE_M: f64 = 1e-9;

/// Number of decimal places joint angles are reported to.
const REPORT_DECIMAL_PLACES: i32 = 1;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Calibrated angles of each joint, base first.
///
/// Units: degrees
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointAngles(pub [f64; NUM_ROT_AXES]);

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Reasons a target cannot be reached by the arm.
#[derive(Debug, Copy, Clone, PartialEq, thiserror::Error)]
pub enum Unreachable {
    #[error("the target is not a finite position")]
    NonFinite,

    #[error(
        "target is {:.1} cm from the shoulder, beyond the arm's reach of {:.1} cm",
        (.distance_m * 100.0), (.reach_m * 100.0)
    )]
    BeyondReach { distance_m: f64, reach_m: f64 },

    #[error(
        "wrist would be {:.1} cm from the shoulder, beyond the reach of the upper arm and \
        forearm ({:.1} cm)",
        (.distance_m * 100.0), (.reach_m * 100.0)
    )]
    WristBeyondReach { distance_m: f64, reach_m: f64 },

    #[error(
        "wrist would be {:.1} cm from the shoulder, closer than the upper arm and forearm can \
        fold ({:.1} cm)",
        (.distance_m * 100.0), (.min_m * 100.0)
    )]
    WristTooClose { distance_m: f64, min_m: f64 },
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Solve the joint angles placing the gripper tip at `target_m_rb`.
///
/// Returns the calibrated angles at full precision, use [`JointAngles::rounded`] for reporting.
pub fn solve(
    geometry: &ArmGeometry,
    calibration: &Calibration,
    target_m_rb: &Vector3<f64>,
) -> Result<JointAngles, Unreachable> {
    if !target_m_rb.iter().all(|v| v.is_finite()) {
        return Err(Unreachable::NonFinite);
    }

    let l1 = geometry.link1_length_m;
    let l2 = geometry.link2_length_m;
    let grip = geometry.gripper_length_m;

    // Base yaw towards the target
    let base_rad = target_m_rb.y.atan2(target_m_rb.x);

    // Target in the arm plane, relative to the shoulder
    let r = target_m_rb.x.hypot(target_m_rb.y);
    let z = target_m_rb.z - geometry.base_height_m;

    let reach_m = geometry.total_reach_m();
    let distance_m = r.hypot(z);
    if distance_m > reach_m {
        return Err(Unreachable::BeyondReach {
            distance_m,
            reach_m,
        });
    }

    // Back the wrist out from the target along the approach angle
    let phi = z.atan2(r);
    let wrist_r = r - grip * phi.cos();
    let wrist_z = z - grip * phi.sin();
    let wrist_m = wrist_r.hypot(wrist_z);

    if wrist_m > l1 + l2 + REACH_TOLERANCE_M {
        return Err(Unreachable::WristBeyondReach {
            distance_m: wrist_m,
            reach_m: l1 + l2,
        });
    }
    if wrist_m < (l1 - l2).abs() - REACH_TOLERANCE_M {
        return Err(Unreachable::WristTooClose {
            distance_m: wrist_m,
            min_m: (l1 - l2).abs(),
        });
    }

    // Law of cosines on the shoulder/elbow chain. Arguments are clamped since they can stray
    // just outside [-1, 1] at the edge of the reach.
    let elbow_rad = clamp(
        (wrist_m.powi(2) - l1.powi(2) - l2.powi(2)) / (2.0 * l1 * l2),
        -1.0,
        1.0,
    )
    .acos();

    let shoulder_offset_rad = if wrist_m > 0.0 {
        clamp(
            (l1.powi(2) + wrist_m.powi(2) - l2.powi(2)) / (2.0 * l1 * wrist_m),
            -1.0,
            1.0,
        )
        .acos()
    } else {
        0.0
    };
    let shoulder_rad = wrist_z.atan2(wrist_r) + shoulder_offset_rad;

    // Wrist flexion bringing the gripper back onto the approach angle
    let wrist_rad = shoulder_rad - elbow_rad - phi;

    let kinematic_deg = [
        base_rad.to_degrees(),
        shoulder_rad.to_degrees(),
        elbow_rad.to_degrees(),
        wrist_rad.to_degrees(),
        0.0,
    ];

    let mut calibrated_deg = [0.0; NUM_ROT_AXES];
    for i in 0..NUM_ROT_AXES {
        calibrated_deg[i] = kinematic_deg[i] - calibration.joint_zero_offset_deg[i];
    }

    Ok(JointAngles(calibrated_deg))
}

/// Position of the gripper tip for the given calibrated joint angles.
pub fn forward_kinematics(
    geometry: &ArmGeometry,
    calibration: &Calibration,
    joints: &JointAngles,
) -> Vector3<f64> {
    let mut rad = [0.0; NUM_ROT_AXES];
    for i in 0..NUM_ROT_AXES {
        rad[i] = (joints.0[i] + calibration.joint_zero_offset_deg[i]).to_radians();
    }

    let upper_arm = rad[1];
    let forearm = rad[1] - rad[2];
    let gripper = rad[1] - rad[2] - rad[3];

    let r = geometry.link1_length_m * upper_arm.cos()
        + geometry.link2_length_m * forearm.cos()
        + geometry.gripper_length_m * gripper.cos();
    let z = geometry.link1_length_m * upper_arm.sin()
        + geometry.link2_length_m * forearm.sin()
        + geometry.gripper_length_m * gripper.sin();

    Vector3::new(
        r * rad[0].cos(),
        r * rad[0].sin(),
        z + geometry.base_height_m,
    )
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl JointAngles {
    /// Angles rounded for reporting.
    pub fn rounded(&self) -> [f64; NUM_ROT_AXES] {
        let mut r = self.0;
        for a in r.iter_mut() {
            *a = round_dp(*a, REPORT_DECIMAL_PLACES);
        }
        r
    }

    /// Flags for joints whose angle is outside the calibrated report limits.
    pub fn limit_flags(&self, calibration: &Calibration) -> [bool; NUM_ROT_AXES] {
        let mut flags = [false; NUM_ROT_AXES];
        for i in 0..NUM_ROT_AXES {
            flags[i] =
                self.0[i] < calibration.min_joint_deg[i] || self.0[i] > calibration.max_joint_deg[i];
        }
        flags
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::arm_ctrl::Params;

    fn setup() -> (ArmGeometry, Calibration) {
        let p = Params::default();
        (p.geometry, p.calibration)
    }

    #[test]
    fn test_fk_reproduces_target() {
        let (geom, cal) = setup();

        let targets = [
            Vector3::new(0.20, 0.0, 0.10),
            Vector3::new(0.05, 0.0, 0.12),
            Vector3::new(0.10, -0.15, 0.02),
            Vector3::new(-0.12, 0.08, 0.18),
            Vector3::new(0.0, 0.0, 0.40),
            Vector3::new(0.30, 0.1, 0.25),
        ];

        for t in targets.iter() {
            let joints = solve(&geom, &cal, t).unwrap();
            let p = forward_kinematics(&geom, &cal, &joints);
            assert!(
                (p - t).norm() < 1e-9,
                "FK of {:?} gave {:?}",
                t,
                p
            );
            assert_eq!(joints.0[4], 0.0);
        }
    }

    #[test]
    fn test_reach_boundary() {
        let (geom, cal) = setup();
        let reach = geom.total_reach_m();

        // Along a bearing in the horizontal plane of the shoulder, and along a raised diagonal
        let bearings = [
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 1.0).normalize(),
        ];

        for b in bearings.iter() {
            let shoulder = Vector3::new(0.0, 0.0, geom.base_height_m);

            let inside = shoulder + b * (reach - 1e-6);
            let joints = solve(&geom, &cal, &inside).unwrap();
            assert!(joints.0.iter().all(|a| a.is_finite()));

            let outside = shoulder + b * (reach + 1e-6);
            assert!(matches!(
                solve(&geom, &cal, &outside),
                Err(Unreachable::BeyondReach { .. })
            ));
        }
    }

    #[test]
    fn test_exact_reach_is_finite() {
        let (geom, cal) = setup();

        // Fully stretched out, cosine arguments sit right on 1
        let target = Vector3::new(geom.total_reach_m(), 0.0, geom.base_height_m);
        match solve(&geom, &cal, &target) {
            Ok(j) => assert!(j.0.iter().all(|a| a.is_finite())),
            Err(e) => panic!("Exact reach should be solvable, got {}", e),
        }
    }

    #[test]
    fn test_straight_arm_angles() {
        let (geom, _) = setup();

        // No calibration offsets so the kinematic angles are reported directly
        let cal = Calibration {
            joint_zero_offset_deg: [0.0; NUM_ROT_AXES],
            min_joint_deg: [-180.0; NUM_ROT_AXES],
            max_joint_deg: [180.0; NUM_ROT_AXES],
        };

        let target = Vector3::new(0.0, geom.total_reach_m() - 1e-9, geom.base_height_m);
        let j = solve(&geom, &cal, &target).unwrap().rounded();

        assert_eq!(j, [90.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_calibration_offsets() {
        let (geom, cal) = setup();
        let uncal = Calibration {
            joint_zero_offset_deg: [0.0; NUM_ROT_AXES],
            ..cal
        };

        let t = Vector3::new(0.15, 0.05, 0.08);
        let a = solve(&geom, &cal, &t).unwrap();
        let b = solve(&geom, &uncal, &t).unwrap();

        for i in 0..NUM_ROT_AXES {
            assert!((b.0[i] - a.0[i] - cal.joint_zero_offset_deg[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_limit_flags() {
        let (_, cal) = setup();

        let j = JointAngles([90.0, 200.0, 30.0, -5.0, 0.0]);
        assert_eq!(j.limit_flags(&cal), [false, true, false, true, false]);
    }

    #[test]
    fn test_non_finite() {
        let (geom, cal) = setup();
        assert_eq!(
            solve(&geom, &cal, &Vector3::new(std::f64::NAN, 0.0, 0.1)),
            Err(Unreachable::NonFinite)
        );
    }

    #[test]
    fn test_wrist_too_close() {
        let (_, cal) = setup();

        // Unequal links cannot fold the wrist onto the shoulder
        let geom = ArmGeometry {
            link1_length_m: 0.10,
            link2_length_m: 0.04,
            gripper_length_m: 0.19,
            base_height_m: 0.12,
        };

        assert!(matches!(
            solve(&geom, &cal, &Vector3::new(0.18, 0.0, 0.12)),
            Err(Unreachable::WristTooClose { .. })
        ));
    }
}
