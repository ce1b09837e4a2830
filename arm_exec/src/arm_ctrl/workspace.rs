//! # Workspace validation
//!
//! The envelope is a cylinder shell around the base axis: a horizontal radius band and a height
//! band. It approximates the reachable volume of the arm, inverse kinematics has the final say on
//! whether a point can actually be reached.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;
use std::fmt;

use super::WorkspaceEnvelope;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Result of checking a point against the envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Validation {
    Ok,
    Violated(Violation),
}

/// The first envelope bound a point breaks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Violation {
    RadiusBelowMin { radius_m: f64, min_m: f64 },
    RadiusAboveMax { radius_m: f64, max_m: f64 },
    HeightBelowMin { z_m: f64, min_m: f64 },
    HeightAboveMax { z_m: f64, max_m: f64 },
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Check a robot-frame point against the envelope.
///
/// Radius is checked before height. A point exactly on a bound is inside.
pub fn validate(envelope: &WorkspaceEnvelope, point_m_rb: &Vector3<f64>) -> Validation {
    let radius_m = point_m_rb.x.hypot(point_m_rb.y);
    let z_m = point_m_rb.z;

    if radius_m < envelope.radius_min_m {
        return Validation::Violated(Violation::RadiusBelowMin {
            radius_m,
            min_m: envelope.radius_min_m,
        });
    }
    if radius_m > envelope.radius_max_m {
        return Validation::Violated(Violation::RadiusAboveMax {
            radius_m,
            max_m: envelope.radius_max_m,
        });
    }
    if z_m < envelope.z_min_m {
        return Validation::Violated(Violation::HeightBelowMin {
            z_m,
            min_m: envelope.z_min_m,
        });
    }
    if z_m > envelope.z_max_m {
        return Validation::Violated(Violation::HeightAboveMax {
            z_m,
            max_m: envelope.z_max_m,
        });
    }

    Validation::Ok
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Validation {
    pub fn is_ok(&self) -> bool {
        matches!(self, Validation::Ok)
    }
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validation::Ok => write!(f, "inside the workspace envelope"),
            Validation::Violated(v) => v.fmt(f),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Violation::RadiusBelowMin { radius_m, min_m } => write!(
                f,
                "radius {:.1} cm is below the minimum of {:.1} cm",
                radius_m * 100.0,
                min_m * 100.0
            ),
            Violation::RadiusAboveMax { radius_m, max_m } => write!(
                f,
                "radius {:.1} cm exceeds the maximum of {:.1} cm",
                radius_m * 100.0,
                max_m * 100.0
            ),
            Violation::HeightBelowMin { z_m, min_m } => write!(
                f,
                "height {:.1} cm is below the minimum of {:.1} cm",
                z_m * 100.0,
                min_m * 100.0
            ),
            Violation::HeightAboveMax { z_m, max_m } => write!(
                f,
                "height {:.1} cm exceeds the maximum of {:.1} cm",
                z_m * 100.0,
                max_m * 100.0
            ),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::arm_ctrl::Params;

    fn envelope() -> WorkspaceEnvelope {
        Params::default().envelope
    }

    #[test]
    fn test_inside() {
        let env = envelope();
        assert_eq!(validate(&env, &Vector3::new(0.20, 0.0, 0.10)), Validation::Ok);
        assert_eq!(validate(&env, &Vector3::new(0.0, -0.1, 0.05)), Validation::Ok);
    }

    #[test]
    fn test_bounds_inclusive() {
        let env = envelope();

        for p in [
            Vector3::new(env.radius_min_m, 0.0, env.z_min_m),
            Vector3::new(env.radius_max_m, 0.0, env.z_max_m),
            Vector3::new(0.0, env.radius_max_m, env.z_min_m),
            Vector3::new(0.0, -env.radius_min_m, env.z_max_m),
        ]
        .iter()
        {
            assert!(validate(&env, p).is_ok(), "{:?} should be inside", p);
        }
    }

    #[test]
    fn test_violations() {
        let env = envelope();

        assert!(matches!(
            validate(&env, &Vector3::new(0.30, 0.0, 0.10)),
            Validation::Violated(Violation::RadiusAboveMax { .. })
        ));
        assert!(matches!(
            validate(&env, &Vector3::new(0.03, 0.03, 0.10)),
            Validation::Violated(Violation::RadiusBelowMin { .. })
        ));
        assert!(matches!(
            validate(&env, &Vector3::new(0.10, 0.0, 0.0199)),
            Validation::Violated(Violation::HeightBelowMin { .. })
        ));
        assert!(matches!(
            validate(&env, &Vector3::new(0.10, 0.0, 0.1801)),
            Validation::Violated(Violation::HeightAboveMax { .. })
        ));

        // Radius is reported before height
        assert!(matches!(
            validate(&env, &Vector3::new(0.30, 0.0, 0.50)),
            Validation::Violated(Violation::RadiusAboveMax { .. })
        ));
    }

    #[test]
    fn test_reason() {
        let v = validate(&envelope(), &Vector3::new(0.30, 0.0, 0.10));
        assert_eq!(
            v.to_string(),
            "radius 30.0 cm exceeds the maximum of 22.0 cm"
        );
    }
}
