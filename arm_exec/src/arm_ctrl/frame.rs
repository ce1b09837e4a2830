//! # Frame transforms
//!
//! Conversion between the perception (camera) frame and the robot base frame. The perception
//! frame has X right, Y down and Z forward along the optical axis.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::Unit;
use nalgebra::Vector3;

use super::MountingParams;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Transform a perception-frame point given in `unit` into the robot base frame, in meters.
pub fn to_robot_frame(mounting: &MountingParams, point_pf: &Vector3<f64>, unit: Unit) -> Vector3<f64> {
    mounting.axes_matrix() * (point_pf * unit.to_m()) + mounting.offset_m()
}

/// Transform a robot-frame point in meters back into the perception frame, in `unit`.
///
/// The axes matrix is orthonormal so its transpose is its inverse.
pub fn to_perception_frame(
    mounting: &MountingParams,
    point_m_rb: &Vector3<f64>,
    unit: Unit,
) -> Vector3<f64> {
    mounting.axes_matrix().transpose() * (point_m_rb - mounting.offset_m()) / unit.to_m()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::arm_ctrl::Params;

    #[test]
    fn test_default_mounting() {
        let mounting = Params::default().mounting;

        // 30 cm in front of the camera, 2 cm right and 4 cm below its centre
        let p_rb = to_robot_frame(&mounting, &Vector3::new(2.0, 4.0, 30.0), Unit::Cm);

        assert!((p_rb - Vector3::new(0.25, -0.02, 0.06)).norm() < 1e-12);
    }

    #[test]
    fn test_round_trip() {
        let mut mounting = Params::default().mounting;
        mounting.offset_m = [0.013, -0.21, 0.4];

        let p_pf = Vector3::new(-12.5, 3.25, 41.0);

        for unit in [Unit::Cm, Unit::Mm, Unit::M].iter() {
            let p_rb = to_robot_frame(&mounting, &p_pf, *unit);
            let back = to_perception_frame(&mounting, &p_rb, *unit);
            assert!(
                (back - p_pf).norm() < 1e-9,
                "round trip in {:?} gave {:?}",
                unit,
                back
            );
        }
    }

    #[test]
    fn test_units_scale() {
        let mounting = Params::default().mounting;
        let p_cm = to_robot_frame(&mounting, &Vector3::new(1.0, 2.0, 3.0), Unit::Cm);
        let p_mm = to_robot_frame(&mounting, &Vector3::new(10.0, 20.0, 30.0), Unit::Mm);
        let p_m = to_robot_frame(&mounting, &Vector3::new(0.01, 0.02, 0.03), Unit::M);

        assert!((p_cm - p_mm).norm() < 1e-12);
        assert!((p_cm - p_m).norm() < 1e-12);
    }
}
