//! Planning request value object.

use crate::common::{Pose3D, RobotSide, SideDependent};
use crate::geometry::PlanarRegionsList;

/// All inputs to one planning call. Value semantics; the terrain snapshot
/// is read-only for the duration of the request.
#[derive(Debug, Clone)]
pub struct FootstepPlannerRequest {
    pub request_id: u32,
    /// Current foot poses, per side
    pub start_foot_poses: SideDependent<Pose3D>,
    /// Desired final foot poses, per side
    pub goal_foot_poses: SideDependent<Pose3D>,
    /// Which foot to treat as the initial stance foot
    pub initial_stance_side: RobotSide,
    /// Terrain snapshot; None together with `assume_flat_ground` plans on
    /// an infinite flat floor
    pub planar_regions: Option<PlanarRegionsList>,
    /// Skip terrain processing and plan on flat ground
    pub assume_flat_ground: bool,
    /// Run the visibility-graph body-path stage
    pub plan_body_path: bool,
    /// Run the A* search; otherwise the plan-then-snap fallback is used
    pub perform_astar_search: bool,
    /// Keep partial plans when the goal cannot be reached in time
    pub return_best_effort_plan: bool,
    /// Snap the goal steps onto the terrain; when false the requested goal
    /// foot poses are kept verbatim in the plan
    pub snap_goal_steps: bool,
    /// Validate the plan's CoM/VRP trajectory with the tracking controller
    pub validate_dynamic_feasibility: bool,
    /// Maximum distance to plan ahead along the body path [m]
    pub horizon_length: f64,
    /// Wall-clock budget for the whole request [s]
    pub timeout_seconds: f64,
}

impl Default for FootstepPlannerRequest {
    fn default() -> Self {
        Self {
            request_id: 0,
            start_foot_poses: SideDependent::new(
                Pose3D::from_xyz_yaw(0.0, 0.1, 0.0, 0.0),
                Pose3D::from_xyz_yaw(0.0, -0.1, 0.0, 0.0),
            ),
            goal_foot_poses: SideDependent::new(
                Pose3D::from_xyz_yaw(1.0, 0.1, 0.0, 0.0),
                Pose3D::from_xyz_yaw(1.0, -0.1, 0.0, 0.0),
            ),
            initial_stance_side: RobotSide::Left,
            planar_regions: None,
            assume_flat_ground: false,
            plan_body_path: true,
            perform_astar_search: true,
            return_best_effort_plan: false,
            snap_goal_steps: true,
            validate_dynamic_feasibility: false,
            horizon_length: f64::INFINITY,
            timeout_seconds: 5.0,
        }
    }
}

impl FootstepPlannerRequest {
    /// Mid-point between the start feet
    pub fn start_mid_foot_pose(&self) -> Pose3D {
        self.start_foot_poses
            .get(RobotSide::Left)
            .interpolate(self.start_foot_poses.get(RobotSide::Right), 0.5)
    }

    /// Mid-point between the goal feet
    pub fn goal_mid_foot_pose(&self) -> Pose3D {
        self.goal_foot_poses
            .get(RobotSide::Left)
            .interpolate(self.goal_foot_poses.get(RobotSide::Right), 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mid_foot_poses() {
        let request = FootstepPlannerRequest::default();
        let start_mid = request.start_mid_foot_pose();
        assert!(start_mid.position.y.abs() < 1e-10);
        let goal_mid = request.goal_mid_foot_pose();
        assert!((goal_mid.position.x - 1.0).abs() < 1e-10);
    }
}
