//! Implementations for the ArmCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

// Internal
use super::{
    frame, inverse_kinematics, workspace, ArmCtrlError, JointAngles, Params, Unreachable,
    Validation, NUM_ROT_AXES,
};
use comms_if::Unit;
use util::{module::State, params, session::Session};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Targets closer together than this are treated as the same goal when counting steps.
const SAME_GOAL_TOLERANCE_M: f64 = 1e-6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Arm control module state.
///
/// Holds the software-tracked end effector position, the only mutable state of the planner.
/// There is no position feedback, the pose is where the arm has been told to go.
pub struct ArmCtrl {
    pub(crate) params: Params,

    pub(crate) report: StatusReport,

    /// Current end effector position.
    ///
    /// Units: meters,
    /// Frame: Robot base
    pose_m_rb: Vector3<f64>,

    /// The goal the step counter refers to.
    current_goal_m_rb: Option<Vector3<f64>>,

    num_steps: u64,
}

/// Input data to Arm Control.
#[derive(Debug, Clone, Copy)]
pub struct InputData {
    /// Target position, as seen by the perception sensor.
    ///
    /// Units: `unit`,
    /// Frame: Perception
    pub target_pf: Vector3<f64>,

    pub unit: Unit,
}

/// Status report for ArmCtrl processing.
#[derive(Clone, Copy, Default, Serialize, Deserialize, Debug)]
pub struct StatusReport {
    /// Distance from the pose to the target after processing.
    ///
    /// Units: meters
    pub remaining_m: f64,

    /// Number of steps taken towards the current goal.
    pub num_steps: u64,

    /// True if the joint angles of the pose could not be solved.
    pub pose_unreachable: bool,

    /// Joints outside their report limits in the pose.
    pub joint_limited: [bool; NUM_ROT_AXES],
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Result of one planning invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The destination can never be reached. The pose was not changed and the request should
    /// not be retried.
    Abort { reason: String },

    /// The pose is already at the target. The pose was not changed.
    Arrived {
        pose_m_rb: Vector3<f64>,
        joints: Result<JointAngles, Unreachable>,
    },

    /// The pose moved one step towards the target. The caller should re-sense the target and
    /// invoke the planner again.
    Step {
        pose_m_rb: Vector3<f64>,
        remaining_m: f64,
        joints: Result<JointAngles, Unreachable>,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for ArmCtrl {
    fn default() -> Self {
        Self::new(Params::default())
    }
}

impl State for ArmCtrl {
    type InitData = &'static str;
    type InitError = params::LoadError;

    type InputData = InputData;
    type OutputData = StepOutcome;
    type StatusReport = StatusReport;
    type ProcError = ArmCtrlError;

    /// Initialise the ArmCtrl module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(
        &mut self,
        init_data: Self::InitData,
        session: &Session,
    ) -> Result<(), Self::InitError> {
        // Load the parameters
        let params: Params = params::load(init_data)?;
        params.validate()?;

        // Keep the parameters this run planned with alongside its log
        match session.save_record("arm_ctrl_params", &params) {
            Ok(p) => debug!("ArmCtrl parameters recorded in {:?}", p),
            Err(e) => warn!("Could not record the ArmCtrl parameters: {}", e),
        }

        *self = Self::new(params);

        Ok(())
    }

    /// Plan one step towards the target.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let target_m_rb =
            frame::to_robot_frame(&self.params.mounting, &input_data.target_pf, input_data.unit);

        debug!(
            "ArmCtrl target {:?} {:?} (perception) -> {:?} m (robot)",
            input_data.target_pf, input_data.unit, target_m_rb
        );

        let outcome = self.plan_step(&target_m_rb)?;

        Ok((outcome, self.report))
    }
}

impl ArmCtrl {
    /// Create a new planner with the arm at the home position.
    pub fn new(params: Params) -> Self {
        let pose_m_rb = params.home_pos_m_rb();

        Self {
            params,
            report: StatusReport::default(),
            pose_m_rb,
            current_goal_m_rb: None,
            num_steps: 0,
        }
    }

    /// The current software-tracked end effector position in the robot frame.
    pub fn pose(&self) -> Vector3<f64> {
        self.pose_m_rb
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Joint angles for a robot-frame point using this planner's geometry and calibration.
    pub fn solve_joints(&self, point_m_rb: &Vector3<f64>) -> Result<JointAngles, Unreachable> {
        inverse_kinematics::solve(&self.params.geometry, &self.params.calibration, point_m_rb)
    }

    /// Plan one step towards a robot-frame target.
    ///
    /// The destination is checked before anything else: first against the workspace envelope,
    /// then against the arm's kinematics. Only if both pass is the pose allowed to move.
    pub fn plan_step(&mut self, target_m_rb: &Vector3<f64>) -> Result<StepOutcome, ArmCtrlError> {
        // Clear the status report
        self.report = StatusReport::default();

        if !target_m_rb.iter().all(|v| v.is_finite()) {
            return Err(ArmCtrlError::NonFiniteTarget([
                target_m_rb.x,
                target_m_rb.y,
                target_m_rb.z,
            ]));
        }

        // ---- DESTINATION CHECK ----

        if let Validation::Violated(v) = workspace::validate(&self.params.envelope, target_m_rb) {
            info!("Target {:?} m rejected: {}", target_m_rb, v);
            return Ok(self.abort(target_m_rb, format!("Target outside the workspace: {}", v)));
        }

        if let Err(e) = self.solve_joints(target_m_rb) {
            info!("Target {:?} m rejected: {}", target_m_rb, e);
            return Ok(self.abort(target_m_rb, format!("Target physically unreachable: {}", e)));
        }

        // ---- STEP COMPUTATION ----

        // Reset the step counter for a new goal
        let same_goal = self
            .current_goal_m_rb
            .map(|g| (g - target_m_rb).norm() < SAME_GOAL_TOLERANCE_M)
            .unwrap_or(false);
        if !same_goal {
            self.current_goal_m_rb = Some(*target_m_rb);
            self.num_steps = 0;
        }

        let diff = target_m_rb - self.pose_m_rb;
        let distance_m = diff.norm();

        if distance_m < self.params.arrival_threshold_m {
            let joints = self.solve_joints(&self.pose_m_rb);
            self.fill_report(distance_m, &joints);

            info!(
                "Arrived at target after {} steps ({:.4} m away)",
                self.num_steps, distance_m
            );

            return Ok(StepOutcome::Arrived {
                pose_m_rb: self.pose_m_rb,
                joints,
            });
        }

        let fraction = self.params.step_policy.step_fraction(distance_m);
        self.pose_m_rb += diff * fraction;
        self.num_steps += 1;

        let remaining_m = (target_m_rb - self.pose_m_rb).norm();

        // The destination is reachable but an intermediate point might not be, the step is
        // still taken and the caller is told.
        let joints = self.solve_joints(&self.pose_m_rb);
        if let Err(ref e) = joints {
            warn!("Step {} pose is not reachable: {}", self.num_steps, e);
        }
        self.fill_report(remaining_m, &joints);

        debug!(
            "Step {} to {:?} m, {:.4} m remaining",
            self.num_steps, self.pose_m_rb, remaining_m
        );

        Ok(StepOutcome::Step {
            pose_m_rb: self.pose_m_rb,
            remaining_m,
            joints,
        })
    }

    fn abort(&mut self, target_m_rb: &Vector3<f64>, reason: String) -> StepOutcome {
        self.report.remaining_m = (target_m_rb - self.pose_m_rb).norm();
        self.report.num_steps = self.num_steps;

        StepOutcome::Abort { reason }
    }

    fn fill_report(&mut self, remaining_m: f64, joints: &Result<JointAngles, Unreachable>) {
        self.report.remaining_m = remaining_m;
        self.report.num_steps = self.num_steps;

        match joints {
            Ok(j) => {
                self.report.joint_limited = j.limit_flags(&self.params.calibration);
                if self.report.joint_limited.iter().any(|f| *f) {
                    debug!("Joint report limits exceeded: {:?}", self.report.joint_limited);
                }
            }
            Err(_) => self.report.pose_unreachable = true,
        }
    }
}

impl StepOutcome {
    /// True if the caller should not re-invoke the planner for this target.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StepOutcome::Step { .. })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::arm_ctrl::StepPolicy;

    #[test]
    fn test_step_between_start_and_target() {
        let mut ctrl = ArmCtrl::default();
        let start = ctrl.pose();
        assert_eq!(start, Vector3::new(0.05, 0.0, 0.12));

        let target = Vector3::new(0.20, 0.0, 0.10);

        match ctrl.plan_step(&target).unwrap() {
            StepOutcome::Step {
                pose_m_rb,
                remaining_m,
                joints,
            } => {
                // Strictly between start and target, on the line joining them
                let total = (target - start).norm();
                let travelled = (pose_m_rb - start).norm();
                assert!(travelled > 0.0 && travelled < total);
                assert!(((pose_m_rb - start).normalize() - (target - start).normalize()).norm() < 1e-12);
                assert!((remaining_m - 0.6 * total).abs() < 1e-12);

                assert_eq!(ctrl.pose(), pose_m_rb);
                assert!(joints.is_ok());
            }
            o => panic!("Expected a step, got {:?}", o),
        }
    }

    #[test]
    fn test_abort_outside_envelope() {
        let mut ctrl = ArmCtrl::default();
        let before = ctrl.pose();

        let outcome = ctrl.plan_step(&Vector3::new(0.30, 0.0, 0.10)).unwrap();

        match outcome {
            StepOutcome::Abort { ref reason } => {
                assert!(reason.contains("radius"), "{}", reason);
                assert!(reason.contains("maximum"), "{}", reason);
            }
            ref o => panic!("Expected an abort, got {:?}", o),
        }
        assert!(outcome.is_terminal());
        assert_eq!(ctrl.pose(), before);

        // Repeating it changes nothing either
        ctrl.plan_step(&Vector3::new(0.0, 0.30, 0.10)).unwrap();
        ctrl.plan_step(&Vector3::new(0.10, 0.0, 0.50)).unwrap();
        assert_eq!(ctrl.pose(), before);
    }

    #[test]
    fn test_abort_kinematically_unreachable() {
        // Widen the envelope past the arm's reach, kinematics must still catch it
        let mut params = Params::default();
        params.envelope.radius_max_m = 1.0;
        let mut ctrl = ArmCtrl::new(params);
        let before = ctrl.pose();

        match ctrl.plan_step(&Vector3::new(0.50, 0.0, 0.10)).unwrap() {
            StepOutcome::Abort { reason } => assert!(reason.contains("unreachable")),
            o => panic!("Expected an abort, got {:?}", o),
        }
        assert_eq!(ctrl.pose(), before);
    }

    #[test]
    fn test_arrival_at_pose() {
        let mut params = Params::default();
        params.home_pos_m_rb = [0.15, 0.0, 0.10];
        let mut ctrl = ArmCtrl::new(params);

        let outcome = ctrl.plan_step(&Vector3::new(0.15, 0.0, 0.10)).unwrap();
        assert!(matches!(outcome, StepOutcome::Arrived { .. }));
        assert_eq!(ctrl.report.num_steps, 0);
        assert_eq!(ctrl.report.remaining_m, 0.0);
        assert_eq!(ctrl.pose(), Vector3::new(0.15, 0.0, 0.10));
    }

    #[test]
    fn test_monotonic_convergence() {
        let mut ctrl = ArmCtrl::default();
        let target = Vector3::new(0.12, -0.15, 0.04);

        let mut last_remaining = (target - ctrl.pose()).norm();
        let mut num_steps = 0;

        loop {
            match ctrl.plan_step(&target).unwrap() {
                StepOutcome::Step { remaining_m, .. } => {
                    assert!(remaining_m < last_remaining);
                    last_remaining = remaining_m;
                    num_steps += 1;
                    assert_eq!(ctrl.report.num_steps, num_steps);
                }
                StepOutcome::Arrived { .. } => break,
                StepOutcome::Abort { reason } => panic!("Unexpected abort: {}", reason),
            }
            assert!(num_steps < 100, "Planner did not converge");
        }

        assert!(last_remaining < ctrl.params.arrival_threshold_m);

        // Arrival does not move the pose
        let arrived_pose = ctrl.pose();
        assert!(ctrl.plan_step(&target).unwrap().is_terminal());
        assert_eq!(ctrl.pose(), arrived_pose);
    }

    #[test]
    fn test_bracketed_convergence() {
        let mut params = Params::default();
        params.step_policy = StepPolicy::Bracketed {
            far_step_m: 0.05,
            near_step_m: 0.01,
            bracket_m: 0.10,
        };
        let mut ctrl = ArmCtrl::new(params);
        let target = Vector3::new(0.20, 0.05, 0.15);
        let start = ctrl.pose();

        let mut last_remaining = (target - start).norm();
        loop {
            match ctrl.plan_step(&target).unwrap() {
                StepOutcome::Step { remaining_m, .. } => {
                    assert!(remaining_m < last_remaining);
                    // Never overshoots, the pose stays on the start side of the target
                    assert!((ctrl.pose() - start).dot(&(target - ctrl.pose())) >= -1e-12);
                    last_remaining = remaining_m;
                }
                StepOutcome::Arrived { .. } => break,
                StepOutcome::Abort { reason } => panic!("Unexpected abort: {}", reason),
            }
            assert!(ctrl.report.num_steps < 100, "Planner did not converge");
        }
    }

    #[test]
    fn test_new_goal_resets_steps() {
        let mut ctrl = ArmCtrl::default();

        ctrl.plan_step(&Vector3::new(0.20, 0.0, 0.10)).unwrap();
        ctrl.plan_step(&Vector3::new(0.20, 0.0, 0.10)).unwrap();
        assert_eq!(ctrl.report.num_steps, 2);

        ctrl.plan_step(&Vector3::new(0.10, 0.10, 0.10)).unwrap();
        assert_eq!(ctrl.report.num_steps, 1);
    }

    #[test]
    fn test_non_finite_target() {
        let mut ctrl = ArmCtrl::default();
        let before = ctrl.pose();

        assert!(matches!(
            ctrl.plan_step(&Vector3::new(std::f64::NAN, 0.0, 0.1)),
            Err(ArmCtrlError::NonFiniteTarget(_))
        ));
        assert_eq!(ctrl.pose(), before);
    }

    #[test]
    fn test_proc_perception_target() {
        let mut ctrl = ArmCtrl::default();

        // 25 cm in front of the camera, level with the camera and centred. Robot frame
        // (0.20, 0.0, 0.10).
        let input = InputData {
            target_pf: Vector3::new(0.0, 0.0, 25.0),
            unit: Unit::Cm,
        };

        let (outcome, report) = ctrl.proc(&input).unwrap();
        assert!(matches!(outcome, StepOutcome::Step { .. }));
        assert_eq!(report.num_steps, 1);
        assert!(!report.pose_unreachable);
    }
}
