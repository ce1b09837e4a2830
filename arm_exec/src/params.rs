//! # Arm Executable Parameters
//!
//! This module provide parameters for the arm executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use util::params::LoadError;

use crate::dispatch::ActuatorBackend;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmExecParams {
    /// Which actuator the demands are sent to
    pub backend: ActuatorBackend,

    /// How long to wait for the mechanisms server to accept demands before giving up
    ///
    /// Units: milliseconds
    pub actuator_timeout_ms: i32,

    /// Speed sent with every pose demand
    ///
    /// Units: percent of the actuator's maximum
    pub speed_pct: u8,

    /// Subscribe to the detector so that named objects can be targeted
    pub use_perception: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ArmExecParams {
    /// Check the parameters are usable.
    ///
    /// The actuator timeout must be positive, zmq treats `-1` as wait forever and `0` as never
    /// wait.
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.actuator_timeout_ms <= 0 {
            return Err(LoadError::InvalidValue(format!(
                "actuator_timeout_ms must be positive, got {}",
                self.actuator_timeout_ms
            )));
        }

        if self.speed_pct == 0 || self.speed_pct > 100 {
            return Err(LoadError::InvalidValue(format!(
                "speed_pct must be in 1-100, got {}",
                self.speed_pct
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_toml() {
        let p: ArmExecParams = util::params::from_str(
            r#"
            backend = "real"
            actuator_timeout_ms = 2000
            speed_pct = 50
            use_perception = false
            "#,
        )
        .unwrap();

        assert_eq!(p.backend, ActuatorBackend::Real);
        assert_eq!(p.actuator_timeout_ms, 2000);
    }

    #[test]
    fn test_validate() {
        let mut p = ArmExecParams {
            backend: ActuatorBackend::Real,
            actuator_timeout_ms: 2000,
            speed_pct: 50,
            use_perception: false,
        };
        assert!(p.validate().is_ok());

        // Waiting forever on the actuator is not allowed
        p.actuator_timeout_ms = -1;
        assert!(matches!(p.validate(), Err(LoadError::InvalidValue(_))));

        p.actuator_timeout_ms = 0;
        assert!(matches!(p.validate(), Err(LoadError::InvalidValue(_))));

        p.actuator_timeout_ms = 2000;
        p.speed_pct = 0;
        assert!(matches!(p.validate(), Err(LoadError::InvalidValue(_))));
    }
}
