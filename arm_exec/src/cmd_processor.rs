//! # Command processor
//!
//! Handles one [`ArmRequest`] from start to finish: resolve the target, plan a step, dispatch it
//! and fold the outcome into an [`ArmResponse`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, error, info, warn};
use nalgebra::Vector3;
use std::sync::Mutex;

use comms_if::{
    cmd::{ArmRequest, ArmResponse, ResponseStatus, Target},
    Unit,
};
use util::module::State;

use crate::{
    arm_ctrl::{self, ArmCtrl, JointAngles, StepOutcome, Unreachable},
    dispatch::{Dispatcher, PlannedPose},
    perception::PerceptionStore,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The arm motion control core.
///
/// Safe to share between command sources. Planning and dispatching a step happen under the
/// planner lock so overlapping requests cannot interleave their pose updates.
pub struct ArmExec {
    ctrl: Mutex<ArmCtrl>,

    dispatcher: Mutex<Dispatcher>,

    perception: Option<PerceptionStore>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ArmExec {
    pub fn new(ctrl: ArmCtrl, dispatcher: Dispatcher, perception: Option<PerceptionStore>) -> Self {
        Self {
            ctrl: Mutex::new(ctrl),
            dispatcher: Mutex::new(dispatcher),
            perception,
        }
    }

    /// Current software-tracked end effector position, `None` if the planner lock is poisoned.
    pub fn pose(&self) -> Option<Vector3<f64>> {
        self.ctrl.lock().ok().map(|c| c.pose())
    }

    /// Handle a single request.
    ///
    /// Never panics on bad input, every failure is reported in the response.
    pub fn handle(&self, request: &ArmRequest) -> ArmResponse {
        debug!("Handling {:?}", request);

        let (target_pf, unit) = match request.target {
            None => return self.handle_gesture(&request.command),
            Some(Target::Point { x, y, z, unit }) => (Vector3::new(x, y, z), unit),
            Some(Target::Object { ref name }) => match self.resolve_object(name) {
                Ok(t) => t,
                Err(reason) => {
                    return ArmResponse::without_pose(false, ResponseStatus::Failed, reason)
                }
            },
        };

        // A target that is not a position is treated as no target at all
        if !target_pf.iter().all(|v| v.is_finite()) {
            warn!(
                "Target {:?} is not a finite position, dispatching \"{}\" as a gesture",
                target_pf, request.command
            );
            return self.handle_gesture(&request.command);
        }

        self.handle_point(&request.command, target_pf, unit)
    }

    fn handle_gesture(&self, command: &str) -> ArmResponse {
        let result = match self.dispatcher.lock() {
            Ok(mut d) => d.dispatch(command, None),
            Err(_) => return poisoned("dispatcher"),
        };

        info!("Gesture \"{}\": {}", command, result.message);

        ArmResponse::without_pose(result.ok, ResponseStatus::Gesture, result.message)
    }

    fn handle_point(&self, command: &str, target_pf: Vector3<f64>, unit: Unit) -> ArmResponse {
        let mut ctrl = match self.ctrl.lock() {
            Ok(c) => c,
            Err(_) => return poisoned("planner"),
        };

        let input = arm_ctrl::InputData { target_pf, unit };
        let (outcome, report) = match ctrl.proc(&input) {
            Ok(o) => o,
            Err(e) => {
                warn!("ArmCtrl processing error: {}", e);
                return ArmResponse::without_pose(false, ResponseStatus::Failed, e.to_string());
            }
        };

        match outcome {
            StepOutcome::Abort { reason } => ArmResponse {
                ok: false,
                status: ResponseStatus::Aborted,
                reason: format!("{}. Do not retry this target.", reason),
                pose_m_rb: Some(to_array(&ctrl.pose())),
                joints_deg: None,
                remaining_m: Some(report.remaining_m),
            },
            StepOutcome::Arrived { pose_m_rb, joints } => {
                let joints_deg = joints.ok().map(|j| j.rounded());

                // Pure positioning is done, but an action still has to be carried out where the
                // arm now is
                let (ok, reason) = match command.trim().is_empty() {
                    true => (true, "Arrived at the target".to_string()),
                    false => {
                        let planned = PlannedPose {
                            position_m_rb: pose_m_rb,
                            joints_deg,
                        };
                        let result = match self.dispatcher.lock() {
                            Ok(mut d) => d.dispatch(command, Some(&planned)),
                            Err(_) => return poisoned("dispatcher"),
                        };
                        info!("Arrived, \"{}\": {}", command, result.message);

                        (
                            result.ok,
                            format!("Arrived at the target, {}: {}", command, result.message),
                        )
                    }
                };

                ArmResponse {
                    ok,
                    status: match ok {
                        true => ResponseStatus::Arrived,
                        false => ResponseStatus::Failed,
                    },
                    reason,
                    pose_m_rb: Some(to_array(&pose_m_rb)),
                    joints_deg,
                    remaining_m: Some(report.remaining_m),
                }
            }
            StepOutcome::Step {
                pose_m_rb,
                remaining_m,
                joints,
            } => {
                let planned = PlannedPose {
                    position_m_rb: pose_m_rb,
                    joints_deg: joints.as_ref().ok().map(|j| j.rounded()),
                };

                // Dispatch while still holding the planner so the actuator sees poses in the
                // order they were planned
                let result = match self.dispatcher.lock() {
                    Ok(mut d) => d.dispatch(command, Some(&planned)),
                    Err(_) => return poisoned("dispatcher"),
                };
                drop(ctrl);

                let mut reason = match result.ok {
                    true => format!(
                        "{}. {:.1} cm remaining, re-sense the target and send the request again",
                        result.message,
                        remaining_m * 100.0
                    ),
                    false => result.message,
                };
                if let Some(w) = unreachable_warning(&joints) {
                    reason.push_str(&w);
                }

                ArmResponse {
                    ok: result.ok,
                    status: match result.ok {
                        true => ResponseStatus::Step,
                        false => ResponseStatus::Failed,
                    },
                    reason,
                    pose_m_rb: Some(to_array(&pose_m_rb)),
                    joints_deg: planned.joints_deg,
                    remaining_m: Some(remaining_m),
                }
            }
        }
    }

    /// Look a named object up in the latest detections.
    fn resolve_object(&self, name: &str) -> Result<(Vector3<f64>, Unit), String> {
        let store = match self.perception {
            Some(ref s) => s,
            None => return Err("Object targets need perception, which is disabled".into()),
        };

        match store.find(name) {
            Some(o) => {
                debug!("Resolved \"{}\" to {:?}", name, o);
                Ok((Vector3::from(o.position), o.unit))
            }
            None => Err(format!("No object named \"{}\" is currently detected", name)),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn to_array(v: &Vector3<f64>) -> [f64; 3] {
    [v.x, v.y, v.z]
}

fn unreachable_warning(joints: &Result<JointAngles, Unreachable>) -> Option<String> {
    match joints {
        Ok(_) => None,
        Err(e) => Some(format!(" (warning: joint angles unavailable for this step, {})", e)),
    }
}

fn poisoned(what: &str) -> ArmResponse {
    error!("The {} lock is poisoned", what);
    ArmResponse::without_pose(
        false,
        ResponseStatus::Failed,
        format!("Internal error: the {} is unavailable", what),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        arm_ctrl::Params,
        dispatch::{Actuator, ActuatorError, SimActuator},
    };
    use comms_if::eqpt::{
        arm::{ArmDems, ArmDemsResponse},
        perception::DetectedObject,
    };
    use std::{
        sync::{Arc, Mutex},
        thread,
    };

    fn exec(perception: Option<PerceptionStore>) -> ArmExec {
        let params = Params::default();
        let sim = SimActuator::new(params.home_pos_m_rb);
        ArmExec::new(
            ArmCtrl::new(params),
            Dispatcher::new(Box::new(sim), 50),
            perception,
        )
    }

    #[test]
    fn test_wave_gesture() {
        let exec = exec(None);
        let before = exec.pose();

        let r = exec.handle(&ArmRequest::gesture("wave"));
        assert!(r.ok);
        assert_eq!(r.status, ResponseStatus::Gesture);
        assert!(r.reason.contains("wave"));
        assert!(r.pose_m_rb.is_none());
        assert_eq!(exec.pose(), before);
    }

    #[test]
    fn test_unknown_gesture() {
        let r = exec(None).handle(&ArmRequest::gesture("dance"));
        assert!(!r.ok);
        assert_eq!(r.status, ResponseStatus::Gesture);
    }

    #[test]
    fn test_point_step_then_arrive() {
        let exec = exec(None);

        // Robot frame (0.20, 0.0, 0.10)
        let req = ArmRequest::point("grab", 0.0, 0.0, 250.0, Unit::Mm);

        let r = exec.handle(&req);
        assert!(r.ok, "{}", r);
        assert_eq!(r.status, ResponseStatus::Step);
        assert!(r.joints_deg.is_some());
        assert!(!r.is_terminal());

        let mut num_requests = 1;
        loop {
            let r = exec.handle(&req);
            num_requests += 1;
            if r.status == ResponseStatus::Arrived {
                assert!(r.remaining_m.unwrap() < 0.005);
                break;
            }
            assert_eq!(r.status, ResponseStatus::Step);
            assert!(num_requests < 50);
        }
    }

    #[test]
    fn test_point_abort() {
        let exec = exec(None);
        let before = exec.pose();

        // 40 cm in front of the camera is robot radius 0.35 m
        let r = exec.handle(&ArmRequest::point("", 0.0, 0.0, 0.40, Unit::M));
        assert!(!r.ok);
        assert_eq!(r.status, ResponseStatus::Aborted);
        assert!(r.is_terminal());
        assert!(r.reason.contains("Do not retry"));
        assert_eq!(exec.pose(), before);
    }

    #[test]
    fn test_non_finite_target_is_gesture() {
        let exec = exec(None);
        let before = exec.pose();

        let r = exec.handle(&ArmRequest::point("wave", std::f64::NAN, 0.0, 25.0, Unit::Cm));
        assert_eq!(r.status, ResponseStatus::Gesture);
        assert!(r.ok);
        assert_eq!(exec.pose(), before);
    }

    #[test]
    fn test_object_target() {
        let store = PerceptionStore::default();
        store.update(vec![DetectedObject {
            name: "cup".into(),
            confidence: 0.9,
            position: [2.0, 4.0, 30.0],
            unit: Unit::Cm,
        }]);
        let exec = exec(Some(store));

        let r = exec.handle(&ArmRequest {
            command: "grab".into(),
            target: Some(Target::Object { name: "Cup".into() }),
        });
        assert_eq!(r.status, ResponseStatus::Step, "{}", r);

        let r = exec.handle(&ArmRequest {
            command: "grab".into(),
            target: Some(Target::Object {
                name: "bottle".into(),
            }),
        });
        assert_eq!(r.status, ResponseStatus::Failed);

        let r = self::exec(None).handle(&ArmRequest {
            command: "grab".into(),
            target: Some(Target::Object { name: "cup".into() }),
        });
        assert_eq!(r.status, ResponseStatus::Failed);
    }

    struct DeadActuator;

    impl Actuator for DeadActuator {
        fn send_demands(&mut self, _: &ArmDems) -> Result<ArmDemsResponse, ActuatorError> {
            Err(ActuatorError::InvalidDemands("no route to arm".into()))
        }
    }

    #[test]
    fn test_actuator_failure() {
        let exec = ArmExec::new(
            ArmCtrl::default(),
            Dispatcher::new(Box::new(DeadActuator), 50),
            None,
        );

        let r = exec.handle(&ArmRequest::point("", 0.0, 0.0, 25.0, Unit::Cm));
        assert!(!r.ok);
        assert_eq!(r.status, ResponseStatus::Failed);
        assert!(r.reason.contains("no route to arm"));
        assert!(r.pose_m_rb.is_some());
    }

    /// Accepts everything and keeps a copy of each demand.
    struct RecordingActuator {
        sent: Arc<Mutex<Vec<ArmDems>>>,
    }

    impl Actuator for RecordingActuator {
        fn send_demands(&mut self, demands: &ArmDems) -> Result<ArmDemsResponse, ActuatorError> {
            let mut sent = self.sent.lock().unwrap();
            sent.push(demands.clone());
            Ok(ArmDemsResponse::DemsOk {
                task_id: sent.len() as u64,
                message: "ok".into(),
            })
        }
    }

    #[test]
    fn test_action_at_arrival_is_sent() {
        let mut params = Params::default();
        params.home_pos_m_rb = [0.20, 0.0, 0.10];
        let sent = Arc::new(Mutex::new(Vec::new()));
        let exec = ArmExec::new(
            ArmCtrl::new(params),
            Dispatcher::new(
                Box::new(RecordingActuator { sent: sent.clone() }),
                50,
            ),
            None,
        );

        // Robot frame (0.20, 0.0, 0.10), where the arm already is
        let r = exec.handle(&ArmRequest::point("", 0.0, 0.0, 25.0, Unit::Cm));
        assert_eq!(r.status, ResponseStatus::Arrived);
        assert!(r.ok);
        assert!(sent.lock().unwrap().is_empty());

        let r = exec.handle(&ArmRequest::point("grab", 0.0, 0.0, 25.0, Unit::Cm));
        assert_eq!(r.status, ResponseStatus::Arrived, "{}", r);
        assert!(r.ok);
        assert!(r.reason.contains("grab"));

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        match sent[0] {
            ArmDems::Pose {
                position_m,
                ref action,
                ..
            } => {
                assert_eq!(action, "grab");
                assert!((Vector3::from(position_m) - Vector3::new(0.20, 0.0, 0.10)).norm() < 1e-12);
            }
            ref d => panic!("Expected a pose demand, got {:?}", d),
        }
    }

    #[test]
    fn test_action_at_arrival_failure() {
        let mut params = Params::default();
        params.home_pos_m_rb = [0.20, 0.0, 0.10];
        let exec = ArmExec::new(
            ArmCtrl::new(params),
            Dispatcher::new(Box::new(DeadActuator), 50),
            None,
        );

        let r = exec.handle(&ArmRequest::point("grab", 0.0, 0.0, 25.0, Unit::Cm));
        assert!(!r.ok);
        assert_eq!(r.status, ResponseStatus::Failed);
        assert!(r.reason.contains("no route to arm"));
    }

    /// Handle the request until it arrives, returning the number of steps taken.
    fn steps_to_arrival(exec: &ArmExec, req: &ArmRequest) -> usize {
        let mut num_steps = 0;
        loop {
            let r = exec.handle(req);
            match r.status {
                ResponseStatus::Step => num_steps += 1,
                ResponseStatus::Arrived => return num_steps,
                _ => panic!("Unexpected response: {}", r),
            }
            assert!(num_steps < 100, "Planner did not converge");
        }
    }

    #[test]
    fn test_concurrent_sources_share_one_pose() {
        const NUM_SOURCES: usize = 8;

        let req = ArmRequest::point("", 0.0, 0.0, 25.0, Unit::Cm);
        let target = Vector3::new(0.20, 0.0, 0.10);
        let threshold = Params::default().arrival_threshold_m;

        let expected_steps = steps_to_arrival(&exec(None), &req);
        assert!(expected_steps > 1);

        let shared = Arc::new(exec(None));
        let handles: Vec<_> = (0..NUM_SOURCES)
            .map(|_| {
                let exec = shared.clone();
                let req = req.clone();
                thread::spawn(move || steps_to_arrival(&exec, &req))
            })
            .collect();

        let total_steps: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        // Every step was taken exactly once from one shared pose
        assert_eq!(total_steps, expected_steps);
        assert!((shared.pose().unwrap() - target).norm() < threshold);
    }
}
