//! Planning facade: sequences body-path planning, footstep search and
//! validation for one request at a time.
//!
//! At most one plan is ever in flight; a request arriving while planning
//! is rejected immediately, never queued. Every stage records its elapsed
//! time, all faults are converted to an Exception output at this boundary,
//! and callbacks fire synchronously on the planning thread in pipeline
//! order (request, body path, iterations, status).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{info, warn};

use crate::body_path::{BodyPathPlan, BodyPathPlanningResult, VisibilityGraphPathPlanner};
use crate::checkers::{
    BodyCollisionChecker, CheckerOfCheckers, CliffAvoidanceChecker, SnapBasedChecker,
};
use crate::common::{PlannerResult, Pose3D, RobotSide, SideDependent};
use crate::geometry::{ConvexPolygon2D, PlanarRegionsList};
use crate::graph::FootstepNode;
use crate::lqr::{DynamicsValidator, LqrSettings};
use crate::planner::output::{
    FootstepPlannerOutput, FootstepPlanningResult, PlannedFootstep,
};
use crate::planner::parameters::FootstepPlannerParameters;
use crate::planner::plan_then_snap::PlanThenSnapPlanner;
use crate::planner::request::FootstepPlannerRequest;
use crate::search::{
    AStarFootstepPlanner, BodyPathHeuristics, DistanceAndYawHeuristics, FootstepHeuristics,
    FootstepPlannerIterationData,
};
use crate::snapping::{FootstepSnapper, PlanarRegionFootstepSnapper, SnapperParameters};
use crate::utils::Stopwatch;
use crate::visibility::VisibilityGraphParameters;

type RequestCallback = Box<dyn Fn(&FootstepPlannerRequest) + Send>;
type BodyPathCallback = Box<dyn Fn(&BodyPathPlan, BodyPathPlanningResult) + Send>;
type StatusCallback = Box<dyn Fn(&FootstepPlannerOutput) + Send>;

pub struct FootstepPlanningModule {
    name: String,
    parameters: FootstepPlannerParameters,
    lqr_settings: LqrSettings,

    body_path_planner: VisibilityGraphPathPlanner,
    body_path_plan: BodyPathPlan,
    astar_planner: AStarFootstepPlanner,
    plan_then_snap_planner: PlanThenSnapPlanner,

    is_planning: Arc<AtomicBool>,
    output: FootstepPlannerOutput,

    request_callbacks: Vec<RequestCallback>,
    body_path_callbacks: Vec<BodyPathCallback>,
    status_callbacks: Vec<StatusCallback>,
}

/// Nominal foot sole polygon used when no robot-specific one is supplied
pub fn default_foot_polygons() -> SideDependent<ConvexPolygon2D> {
    SideDependent::both(ConvexPolygon2D::rectangle(0.22, 0.11))
}

impl FootstepPlanningModule {
    pub fn new(name: &str) -> Self {
        Self::with_parameters(
            name,
            FootstepPlannerParameters::default(),
            VisibilityGraphParameters::default(),
            LqrSettings::default(),
            default_foot_polygons(),
        )
    }

    pub fn with_parameters(
        name: &str,
        parameters: FootstepPlannerParameters,
        visibility_parameters: VisibilityGraphParameters,
        lqr_settings: LqrSettings,
        foot_polygons: SideDependent<ConvexPolygon2D>,
    ) -> Self {
        let snapper_parameters = SnapperParameters {
            wiggle_below_area_ratio: parameters.min_foothold_percent,
            ..SnapperParameters::default()
        };

        let astar_snapper = Box::new(PlanarRegionFootstepSnapper::new(
            foot_polygons.clone(),
            snapper_parameters.clone(),
        ));
        let checker = CheckerOfCheckers::new(vec![
            Box::new(SnapBasedChecker::new(&parameters)),
            Box::new(BodyCollisionChecker::new(&parameters)),
            Box::new(CliffAvoidanceChecker::new(&parameters)),
        ]);
        let astar_planner =
            AStarFootstepPlanner::new(parameters.clone(), astar_snapper, checker);

        let plan_then_snap_planner = PlanThenSnapPlanner::new(
            parameters.clone(),
            PlanarRegionFootstepSnapper::new(foot_polygons, snapper_parameters),
        );

        Self {
            name: name.to_string(),
            parameters,
            lqr_settings,
            body_path_planner: VisibilityGraphPathPlanner::new(visibility_parameters),
            body_path_plan: BodyPathPlan::default(),
            astar_planner,
            plan_then_snap_planner,
            is_planning: Arc::new(AtomicBool::new(false)),
            output: FootstepPlannerOutput::default(),
            request_callbacks: Vec::new(),
            body_path_callbacks: Vec::new(),
            status_callbacks: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &FootstepPlannerParameters {
        &self.parameters
    }

    pub fn is_planning(&self) -> bool {
        self.is_planning.load(Ordering::SeqCst)
    }

    pub fn output(&self) -> &FootstepPlannerOutput {
        &self.output
    }

    pub fn body_path_plan(&self) -> &BodyPathPlan {
        &self.body_path_plan
    }

    /// Requests cooperative cancellation of the in-flight search
    pub fn halt(&self) {
        self.astar_planner.halt();
    }

    pub fn add_request_callback(&mut self, callback: RequestCallback) {
        self.request_callbacks.push(callback);
    }

    pub fn add_body_path_callback(&mut self, callback: BodyPathCallback) {
        self.body_path_callbacks.push(callback);
    }

    pub fn add_status_callback(&mut self, callback: StatusCallback) {
        self.status_callbacks.push(callback);
    }

    pub fn add_iteration_callback(
        &mut self,
        callback: Box<dyn Fn(&FootstepPlannerIterationData) + Send>,
    ) {
        self.astar_planner.add_iteration_callback(callback);
    }

    /// Handles one planning request. Returns None without touching the
    /// in-flight request when a plan is already running.
    pub fn handle_request(
        &mut self,
        request: &FootstepPlannerRequest,
    ) -> Option<FootstepPlannerOutput> {
        if self
            .is_planning
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!(
                "{}: received planning request {} but a plan is already running",
                self.name, request.request_id
            );
            return None;
        }

        let mut stopwatch = Stopwatch::start();
        self.output.clear();
        self.output.plan_id = request.request_id;

        if let Err(error) = self.handle_request_internal(request, &mut stopwatch) {
            warn!("{}: planning request {} failed: {}", self.name, request.request_id, error);
            self.output.clear();
            self.output.plan_id = request.request_id;
            self.output.set_exception(&error);
            self.fire_status_callbacks();
        }

        self.is_planning.store(false, Ordering::SeqCst);
        Some(self.output.clone())
    }

    fn handle_request_internal(
        &mut self,
        request: &FootstepPlannerRequest,
        stopwatch: &mut Stopwatch,
    ) -> PlannerResult<()> {
        for callback in &self.request_callbacks {
            callback(request);
        }

        if !self.validate_request(request) {
            self.output.result = FootstepPlanningResult::InvalidRequest;
            self.output.timings.total_elapsed_seconds = stopwatch.total_elapsed();
            self.fire_status_callbacks();
            return Ok(());
        }

        let flat_ground_mode = request.assume_flat_ground
            || request
                .planar_regions
                .as_ref()
                .map_or(true, PlanarRegionsList::is_empty);
        let regions = if flat_ground_mode {
            None
        } else {
            request.planar_regions.clone()
        };

        self.astar_planner.set_planar_regions(regions.clone());
        self.plan_then_snap_planner.set_planar_regions(regions.clone());

        let start_mid = request.start_mid_foot_pose();
        let mut goal_mid = request.goal_mid_foot_pose();
        let mut goal_adjusted_by_horizon = false;
        let mut body_path_is_best_effort = false;

        self.output.timings.time_before_planning_seconds = stopwatch.lap();

        if request.plan_body_path && !flat_ground_mode {
            self.body_path_planner.set_planar_regions(regions.clone());
            self.body_path_planner.set_stance_foot_poses(
                request.start_foot_poses.get(RobotSide::Left),
                request.start_foot_poses.get(RobotSide::Right),
            );
            self.body_path_planner.set_goal(&goal_mid);

            let body_path_result = self.body_path_planner.plan_waypoints();

            if !body_path_result.valid_for_execution()
                || self.body_path_planner.waypoints().len() < 2
            {
                // fall back to a partial path toward the goal when allowed
                if request.return_best_effort_plan {
                    self.body_path_planner
                        .compute_best_effort_plan(request.horizon_length);
                    body_path_is_best_effort = self.body_path_planner.waypoints().len() >= 2;
                }
                if !body_path_is_best_effort {
                    self.body_path_plan.clear();
                    self.output.body_path_result = Some(body_path_result);
                    self.output.result = FootstepPlanningResult::NoPathExists;
                    self.output.timings.time_planning_body_path_seconds = stopwatch.lap();
                    self.fire_body_path_callbacks(body_path_result);
                    self.output.timings.total_elapsed_seconds = stopwatch.total_elapsed();
                    self.fire_status_callbacks();
                    return Ok(());
                }
            }

            self.body_path_plan
                .set_pose_waypoints(self.body_path_planner.waypoints().to_vec());

            if body_path_is_best_effort {
                if let Some(last) = self.body_path_plan.goal_pose() {
                    goal_mid = *last;
                    goal_adjusted_by_horizon = true;
                }
            }

            let path_length = self.body_path_plan.path_length();
            if request.horizon_length > 0.0 && request.horizon_length < path_length {
                if let Some(intermediate) = self
                    .body_path_plan
                    .point_along_path(request.horizon_length / path_length)
                {
                    goal_mid = intermediate;
                    goal_adjusted_by_horizon = true;
                }
            }

            let reported_result = if body_path_is_best_effort {
                body_path_result
            } else {
                BodyPathPlanningResult::FoundSolution
            };
            self.output.body_path_result = Some(reported_result);
            self.output.body_path_waypoints = self.body_path_plan.waypoints().to_vec();
            self.output.timings.time_planning_body_path_seconds = stopwatch.lap();
            self.fire_body_path_callbacks(reported_result);
        } else {
            self.body_path_plan
                .set_pose_waypoints(vec![start_mid, goal_mid]);

            let path_length = self.body_path_plan.path_length();
            if request.horizon_length > 0.0 && request.horizon_length < path_length {
                if let Some(intermediate) = self
                    .body_path_plan
                    .point_along_path(request.horizon_length / path_length)
                {
                    goal_mid = intermediate;
                    goal_adjusted_by_horizon = true;
                }
            }

            self.output.body_path_result = Some(BodyPathPlanningResult::FoundSolution);
            self.output.body_path_waypoints = self.body_path_plan.waypoints().to_vec();
            self.output.timings.time_planning_body_path_seconds = stopwatch.lap();
            self.fire_body_path_callbacks(BodyPathPlanningResult::FoundSolution);
        }

        if request.perform_astar_search {
            self.run_astar_stage(request, stopwatch, &goal_mid, goal_adjusted_by_horizon)?;
            // a plan toward a best-effort intermediate goal is not a full
            // solution and must never be reported as one
            if body_path_is_best_effort
                && self.output.result == FootstepPlanningResult::FoundSolution
            {
                self.output.result = FootstepPlanningResult::NoPathExists;
            }
        } else {
            let stance_side = request.initial_stance_side;
            let stance_pose = *request.start_foot_poses.get(stance_side);
            let (result, steps) =
                self.plan_then_snap_planner
                    .plan(&stance_pose, stance_side, &goal_mid);
            self.output.result = result;
            self.output.footstep_plan.clear();
            for step in steps {
                self.output.footstep_plan.add_step(step);
            }
            self.output.timings.time_planning_steps_seconds = stopwatch.lap();
        }

        if request.validate_dynamic_feasibility
            && self.output.result == FootstepPlanningResult::FoundSolution
        {
            let validator = DynamicsValidator::new(self.lqr_settings.clone());
            let validated = validator.validate_plan(&start_mid, &self.output.footstep_plan)?;
            self.output.dynamically_validated = Some(validated);
        }

        self.output.timings.total_elapsed_seconds = stopwatch.total_elapsed();
        self.fire_status_callbacks();
        Ok(())
    }

    fn run_astar_stage(
        &mut self,
        request: &FootstepPlannerRequest,
        stopwatch: &mut Stopwatch,
        goal_mid: &Pose3D,
        goal_adjusted_by_horizon: bool,
    ) -> PlannerResult<()> {
        let start_nodes = SideDependent::new(
            node_from_pose(request.start_foot_poses.get(RobotSide::Left), RobotSide::Left),
            node_from_pose(request.start_foot_poses.get(RobotSide::Right), RobotSide::Right),
        );
        // an intermediate horizon goal replaces the requested goal poses
        let goal_nodes = if goal_adjusted_by_horizon {
            foot_nodes_from_mid(goal_mid, self.parameters.ideal_step_width)
        } else {
            SideDependent::new(
                node_from_pose(request.goal_foot_poses.get(RobotSide::Left), RobotSide::Left),
                node_from_pose(request.goal_foot_poses.get(RobotSide::Right), RobotSide::Right),
            )
        };

        let heuristics: Box<dyn FootstepHeuristics> =
            if self.body_path_plan.num_waypoints() > 2 {
                Box::new(BodyPathHeuristics::new(
                    &self.parameters,
                    self.body_path_plan.clone(),
                ))
            } else {
                Box::new(DistanceAndYawHeuristics::new(&self.parameters))
            };

        let remaining_time = (request.timeout_seconds - stopwatch.total_elapsed()).max(0.0);
        let outcome = self.astar_planner.plan(
            start_nodes,
            goal_nodes,
            goal_mid,
            heuristics.as_ref(),
            remaining_time,
            request.return_best_effort_plan,
        );

        self.output.result = outcome.result;
        self.output.footstep_plan.clear();
        for node in outcome.path.iter().skip(1) {
            let snap = self.astar_planner.snapper_mut().snap(node);
            let (mut sole_pose, ratio) = match snap {
                Some(snap) => (snap.snapped_pose, snap.foothold_area_ratio),
                None => (
                    Pose3D::from_xyz_yaw(node.x(), node.y(), 0.0, node.yaw()),
                    1.0,
                ),
            };
            if !request.snap_goal_steps
                && !goal_adjusted_by_horizon
                && *node == *goal_nodes.get(node.side())
            {
                sole_pose = *request.goal_foot_poses.get(node.side());
            }
            self.output.footstep_plan.add_step(PlannedFootstep {
                side: node.side(),
                sole_pose,
                foothold_area_ratio: ratio,
                timings: None,
            });
        }

        self.output.timings.time_planning_steps_seconds = stopwatch.lap();
        self.output.timings.step_planning_iterations = outcome.iterations;
        Ok(())
    }

    fn validate_request(&self, request: &FootstepPlannerRequest) -> bool {
        if request.timeout_seconds <= 0.0 {
            warn!("{}: request {} has a non-positive timeout", self.name, request.request_id);
            return false;
        }
        for side in RobotSide::BOTH {
            let start = request.start_foot_poses.get(side);
            let goal = request.goal_foot_poses.get(side);
            let finite = [
                start.position.x,
                start.position.y,
                start.position.z,
                goal.position.x,
                goal.position.y,
                goal.position.z,
            ]
            .iter()
            .all(|v| v.is_finite());
            if !finite {
                warn!("{}: request {} has non-finite poses", self.name, request.request_id);
                return false;
            }
        }
        true
    }

    fn fire_body_path_callbacks(&self, result: BodyPathPlanningResult) {
        for callback in &self.body_path_callbacks {
            callback(&self.body_path_plan, result);
        }
    }

    fn fire_status_callbacks(&self) {
        for callback in &self.status_callbacks {
            callback(&self.output);
        }
    }

    /// Blocks until the current plan completes, polling `is_planning`
    pub fn wait_until_idle(&self) {
        while self.is_planning() {
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
    }
}

fn node_from_pose(pose: &Pose3D, side: RobotSide) -> FootstepNode {
    FootstepNode::new(pose.position.x, pose.position.y, pose.yaw(), side)
}

fn foot_nodes_from_mid(mid: &Pose3D, stance_width: f64) -> SideDependent<FootstepNode> {
    let (sin, cos) = mid.yaw().sin_cos();
    let half = 0.5 * stance_width;
    SideDependent::new(
        FootstepNode::new(
            mid.position.x - sin * half,
            mid.position.y + cos * half,
            mid.yaw(),
            RobotSide::Left,
        ),
        FootstepNode::new(
            mid.position.x + sin * half,
            mid.position.y - cos * half,
            mid.yaw(),
            RobotSide::Right,
        ),
    )
}
