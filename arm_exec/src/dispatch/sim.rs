//! # Simulated actuator
//!
//! Stands in for the arm, either in process when no mechanisms server is used, or behind the
//! mechanisms server. Accepts any finite demand with a sensible speed and remembers where it was
//! told to go.

use log::info;

use comms_if::{
    cmd::Gesture,
    eqpt::arm::{ArmDems, ArmDemsResponse},
};

use super::{Actuator, ActuatorError};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct SimActuator {
    /// Home position of the simulated arm, returned to by the home gesture.
    home_m: [f64; 3],

    /// Last commanded position of the simulated arm.
    position_m: [f64; 3],

    next_task_id: u64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimActuator {
    pub fn new(home_m: [f64; 3]) -> Self {
        Self {
            home_m,
            position_m: home_m,
            next_task_id: 0,
        }
    }

    /// Last commanded position.
    pub fn position_m(&self) -> [f64; 3] {
        self.position_m
    }

    fn next_task(&mut self) -> u64 {
        self.next_task_id += 1;
        self.next_task_id
    }
}

impl Actuator for SimActuator {
    fn send_demands(&mut self, demands: &ArmDems) -> Result<ArmDemsResponse, ActuatorError> {
        if !demands.is_finite() {
            return Ok(ArmDemsResponse::DemsInvalid(
                "demands contain a non-finite value".into(),
            ));
        }

        let message = match demands {
            ArmDems::Pose { speed_pct, .. } if *speed_pct == 0 || *speed_pct > 100 => {
                return Ok(ArmDemsResponse::DemsInvalid(format!(
                    "speed {}% is outside 1-100%",
                    speed_pct
                )))
            }
            ArmDems::Pose { position_m, .. } => {
                self.position_m = *position_m;
                format!(
                    "simulated arm at ({:.3}, {:.3}, {:.3}) m",
                    position_m[0], position_m[1], position_m[2]
                )
            }
            ArmDems::Gesture(Gesture::Home) => {
                self.position_m = self.home_m;
                "simulated arm returned home".to_string()
            }
            ArmDems::Gesture(g) => format!("simulated arm performed {:?}", g),
        };

        info!("SimActuator: {}", message);

        Ok(ArmDemsResponse::DemsOk {
            task_id: self.next_task(),
            message,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sim_tracks_position() {
        let mut sim = SimActuator::new([0.05, 0.0, 0.12]);

        let r = sim
            .send_demands(&ArmDems::Pose {
                position_m: [0.1, 0.02, 0.1],
                joints_deg: None,
                action: "grab".into(),
                speed_pct: 50,
            })
            .unwrap();
        assert!(matches!(r, ArmDemsResponse::DemsOk { task_id: 1, .. }));
        assert_eq!(sim.position_m(), [0.1, 0.02, 0.1]);

        let r = sim.send_demands(&ArmDems::Gesture(Gesture::Home)).unwrap();
        assert!(matches!(r, ArmDemsResponse::DemsOk { task_id: 2, .. }));
        assert_eq!(sim.position_m(), [0.05, 0.0, 0.12]);
    }

    #[test]
    fn test_sim_rejects_non_finite() {
        let mut sim = SimActuator::new([0.05, 0.0, 0.12]);

        let r = sim
            .send_demands(&ArmDems::Pose {
                position_m: [std::f64::INFINITY, 0.0, 0.1],
                joints_deg: None,
                action: String::new(),
                speed_pct: 50,
            })
            .unwrap();
        assert!(!r.is_ok());
        assert_eq!(sim.position_m(), [0.05, 0.0, 0.12]);

        let r = sim
            .send_demands(&ArmDems::Pose {
                position_m: [0.1, 0.0, 0.1],
                joints_deg: None,
                action: String::new(),
                speed_pct: 0,
            })
            .unwrap();
        assert!(matches!(r, ArmDemsResponse::DemsInvalid(_)));
    }
}
