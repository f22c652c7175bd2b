//! Planner output: result codes, planned steps, timing breakdown.

use crate::body_path::BodyPathPlanningResult;
use crate::common::{Pose3D, RobotSide};
use crate::common::PlannerError;

/// Terminal status of a footstep planning request. Search exhaustion and
/// timeouts are normal outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FootstepPlanningResult {
    Planning,
    FoundSolution,
    NoPathExists,
    TimedOut,
    SnappingFailed,
    Halted,
    InvalidRequest,
    Exception,
}

impl FootstepPlanningResult {
    /// Only full solutions may be executed; best-effort partial plans keep
    /// their terminating result code
    pub fn valid_for_execution(&self) -> bool {
        matches!(self, FootstepPlanningResult::FoundSolution)
    }
}

/// One planned footstep
#[derive(Debug, Clone)]
pub struct PlannedFootstep {
    pub side: RobotSide,
    pub sole_pose: Pose3D,
    /// Fraction of the nominal footprint in contact after snapping
    pub foothold_area_ratio: f64,
    /// Optional per-step timing: (swing duration, transfer duration) [s]
    pub timings: Option<(f64, f64)>,
}

/// Ordered sequence of planned footsteps
#[derive(Debug, Clone, Default)]
pub struct FootstepPlan {
    steps: Vec<PlannedFootstep>,
}

impl FootstepPlan {
    pub fn clear(&mut self) {
        self.steps.clear();
    }

    pub fn add_step(&mut self, step: PlannedFootstep) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[PlannedFootstep] {
        &self.steps
    }

    pub fn num_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Per-stage timing breakdown of one planning call
#[derive(Debug, Clone, Copy, Default)]
pub struct PlannerTimings {
    pub time_before_planning_seconds: f64,
    pub time_planning_body_path_seconds: f64,
    pub time_planning_steps_seconds: f64,
    pub total_elapsed_seconds: f64,
    pub step_planning_iterations: usize,
}

/// Result of one planning request. One live instance per call; `clear`
/// resets it before reuse.
#[derive(Debug, Clone)]
pub struct FootstepPlannerOutput {
    pub plan_id: u32,
    pub result: FootstepPlanningResult,
    pub body_path_result: Option<BodyPathPlanningResult>,
    pub footstep_plan: FootstepPlan,
    pub body_path_waypoints: Vec<Pose3D>,
    pub timings: PlannerTimings,
    /// Whether the plan passed dynamic-feasibility validation; None when
    /// validation was not requested
    pub dynamically_validated: Option<bool>,
    /// Captured fault when `result` is `Exception`
    pub exception: Option<String>,
}

impl Default for FootstepPlannerOutput {
    fn default() -> Self {
        Self {
            plan_id: 0,
            result: FootstepPlanningResult::Planning,
            body_path_result: None,
            footstep_plan: FootstepPlan::default(),
            body_path_waypoints: Vec::new(),
            timings: PlannerTimings::default(),
            dynamically_validated: None,
            exception: None,
        }
    }
}

impl FootstepPlannerOutput {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn set_exception(&mut self, error: &PlannerError) {
        self.result = FootstepPlanningResult::Exception;
        self.exception = Some(error.to_string());
    }
}
