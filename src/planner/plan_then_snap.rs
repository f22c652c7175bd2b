//! Simple fallback planner: lay out steps along a straight line, then snap
//! each one onto the terrain.
//!
//! Used when the full A* search is disabled. No search, no feasibility
//! checking beyond snapping; a failed snap fails the plan.

use crate::common::{Pose3D, RobotSide};
use crate::geometry::PlanarRegionsList;
use crate::planner::output::{FootstepPlanningResult, PlannedFootstep};
use crate::planner::parameters::FootstepPlannerParameters;
use crate::snapping::{FootstepSnapper, PlanarRegionFootstepSnapper};
use crate::graph::FootstepNode;

pub struct PlanThenSnapPlanner {
    parameters: FootstepPlannerParameters,
    snapper: PlanarRegionFootstepSnapper,
}

impl PlanThenSnapPlanner {
    pub fn new(parameters: FootstepPlannerParameters, snapper: PlanarRegionFootstepSnapper) -> Self {
        Self { parameters, snapper }
    }

    pub fn set_planar_regions(&mut self, regions: Option<PlanarRegionsList>) {
        self.snapper.set_planar_regions(regions);
    }

    /// Interpolates alternating steps from the stance pose to the goal
    /// mid-foot pose, snapping each onto the terrain
    pub fn plan(
        &mut self,
        initial_stance_pose: &Pose3D,
        initial_stance_side: RobotSide,
        goal_mid_pose: &Pose3D,
    ) -> (FootstepPlanningResult, Vec<PlannedFootstep>) {
        self.snapper.reset();

        let half_width = 0.5 * self.parameters.ideal_step_width;
        let dx = goal_mid_pose.position.x - initial_stance_pose.position.x;
        let dy = goal_mid_pose.position.y - initial_stance_pose.position.y;
        let distance = (dx * dx + dy * dy).sqrt();
        let heading = goal_mid_pose.yaw();
        let (sin, cos) = heading.sin_cos();

        let num_steps = ((distance / self.parameters.ideal_step_length).ceil() as usize).max(1);

        let mut steps = Vec::new();
        let mut side = initial_stance_side.opposite();
        for i in 1..=num_steps {
            let along = (i as f64 * self.parameters.ideal_step_length).min(distance);
            let mid_x = initial_stance_pose.position.x + along / distance.max(1e-9) * dx;
            let mid_y = initial_stance_pose.position.y + along / distance.max(1e-9) * dy;

            let lateral = side.sign() * half_width;
            let node = FootstepNode::new(
                mid_x - sin * lateral,
                mid_y + cos * lateral,
                heading,
                side,
            );

            match self.snapper.snap(&node) {
                Some(snap) => steps.push(PlannedFootstep {
                    side,
                    sole_pose: snap.snapped_pose,
                    foothold_area_ratio: snap.foothold_area_ratio,
                    timings: None,
                }),
                None => return (FootstepPlanningResult::SnappingFailed, steps),
            }
            side = side.opposite();
        }

        // square up at the goal
        let lateral = side.sign() * half_width;
        let final_node = FootstepNode::new(
            goal_mid_pose.position.x - sin * lateral,
            goal_mid_pose.position.y + cos * lateral,
            heading,
            side,
        );
        match self.snapper.snap(&final_node) {
            Some(snap) => steps.push(PlannedFootstep {
                side,
                sole_pose: snap.snapped_pose,
                foothold_area_ratio: snap.foothold_area_ratio,
                timings: None,
            }),
            None => return (FootstepPlanningResult::SnappingFailed, steps),
        }

        (FootstepPlanningResult::FoundSolution, steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::SideDependent;
    use crate::geometry::{ConvexPolygon2D, PlanarRegion};
    use crate::snapping::SnapperParameters;

    fn planner() -> PlanThenSnapPlanner {
        let snapper = PlanarRegionFootstepSnapper::new(
            SideDependent::both(ConvexPolygon2D::rectangle(0.22, 0.11)),
            SnapperParameters::default(),
        );
        PlanThenSnapPlanner::new(FootstepPlannerParameters::default(), snapper)
    }

    #[test]
    fn test_straight_line_plan_on_flat_ground() {
        let mut planner = planner();
        planner.set_planar_regions(None);
        let stance = Pose3D::from_xyz_yaw(0.0, -0.1, 0.0, 0.0);
        let goal = Pose3D::from_xyz_yaw(1.5, 0.0, 0.0, 0.0);

        let (result, steps) = planner.plan(&stance, RobotSide::Right, &goal);
        assert_eq!(result, FootstepPlanningResult::FoundSolution);
        assert!(steps.len() >= 5);
        // sides alternate
        for pair in steps.windows(2) {
            assert_ne!(pair[0].side, pair[1].side);
        }
        // last step lands at the goal
        let last = steps.last().unwrap();
        assert!((last.sole_pose.position.x - 1.5).abs() < 0.06);
    }

    #[test]
    fn test_snapping_failure_reports_result_code() {
        let mut planner = planner();
        // tiny island nowhere near the path
        planner.set_planar_regions(Some(PlanarRegionsList::new(vec![
            PlanarRegion::flat_square(1, 50.0, 50.0, 0.0, 1.0),
        ])));
        let stance = Pose3D::from_xyz_yaw(0.0, -0.1, 0.0, 0.0);
        let goal = Pose3D::from_xyz_yaw(1.5, 0.0, 0.0, 0.0);

        let (result, _) = planner.plan(&stance, RobotSide::Right, &goal);
        assert_eq!(result, FootstepPlanningResult::SnappingFailed);
    }
}
