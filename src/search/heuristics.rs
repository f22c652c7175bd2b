//! Search heuristics.
//!
//! The heuristic weight multiplies the whole estimate; the estimate is
//! admissible only when the weight is at most 1. Larger weights are a
//! deliberate speed/optimality trade.

use crate::body_path::BodyPathPlan;
use crate::common::{angle_difference, Pose3D};
use crate::graph::FootstepNode;
use crate::planner::parameters::FootstepPlannerParameters;

/// Estimates remaining cost from a node to the goal pose
pub trait FootstepHeuristics {
    fn compute(&self, node: &FootstepNode, goal: &Pose3D) -> f64;
}

/// Euclidean distance to the goal mid-foot pose plus yaw-weighted heading
/// error
pub struct DistanceAndYawHeuristics {
    weight: f64,
    yaw_weight: f64,
    ideal_step_width: f64,
}

impl DistanceAndYawHeuristics {
    pub fn new(parameters: &FootstepPlannerParameters) -> Self {
        Self {
            weight: parameters.astar_heuristics_weight,
            yaw_weight: parameters.yaw_weight,
            ideal_step_width: parameters.ideal_step_width,
        }
    }

    /// Same estimate with an explicit weight, used by tests that need the
    /// admissible weight of exactly 1
    pub fn with_weight(parameters: &FootstepPlannerParameters, weight: f64) -> Self {
        Self {
            weight,
            yaw_weight: parameters.yaw_weight,
            ideal_step_width: parameters.ideal_step_width,
        }
    }
}

impl FootstepHeuristics for DistanceAndYawHeuristics {
    fn compute(&self, node: &FootstepNode, goal: &Pose3D) -> f64 {
        let mid = node.mid_foot_point(self.ideal_step_width);
        let distance =
            ((mid.x - goal.position.x).powi(2) + (mid.y - goal.position.y).powi(2)).sqrt();
        let yaw_error = angle_difference(goal.yaw(), node.yaw()).abs();
        self.weight * (distance + self.yaw_weight * yaw_error)
    }
}

/// Distance measured along the remaining body path rather than straight to
/// the goal; steers the search through the corridor the body-path planner
/// found
pub struct BodyPathHeuristics {
    weight: f64,
    yaw_weight: f64,
    ideal_step_width: f64,
    plan: BodyPathPlan,
}

impl BodyPathHeuristics {
    pub fn new(parameters: &FootstepPlannerParameters, plan: BodyPathPlan) -> Self {
        Self {
            weight: parameters.astar_heuristics_weight,
            yaw_weight: parameters.yaw_weight,
            ideal_step_width: parameters.ideal_step_width,
            plan,
        }
    }
}

impl FootstepHeuristics for BodyPathHeuristics {
    fn compute(&self, node: &FootstepNode, goal: &Pose3D) -> f64 {
        let mid = node.mid_foot_point(self.ideal_step_width);
        let along_path = self.plan.remaining_length_from(mid.x, mid.y);
        let yaw_error = angle_difference(goal.yaw(), node.yaw()).abs();
        self.weight * (along_path + self.yaw_weight * yaw_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::RobotSide;

    #[test]
    fn test_distance_heuristic_decreases_towards_goal() {
        let parameters = FootstepPlannerParameters::default();
        let heuristics = DistanceAndYawHeuristics::with_weight(&parameters, 1.0);
        let goal = Pose3D::from_xyz_yaw(3.0, 0.0, 0.0, 0.0);

        let far = FootstepNode::new(0.0, 0.1, 0.0, RobotSide::Left);
        let near = FootstepNode::new(2.0, 0.1, 0.0, RobotSide::Left);
        assert!(heuristics.compute(&near, &goal) < heuristics.compute(&far, &goal));
    }

    #[test]
    fn test_heuristic_at_goal_is_zero() {
        let parameters = FootstepPlannerParameters::default();
        let heuristics = DistanceAndYawHeuristics::with_weight(&parameters, 1.0);
        let goal = Pose3D::from_xyz_yaw(1.0, 0.0, 0.0, 0.0);
        let at_goal = FootstepNode::new(1.0, 0.1, 0.0, RobotSide::Left);
        assert!(heuristics.compute(&at_goal, &goal) < 1e-9);
    }

    #[test]
    fn test_body_path_heuristic_follows_corridor() {
        let parameters = FootstepPlannerParameters::default();
        let mut plan = BodyPathPlan::default();
        // L-shaped corridor
        plan.set_pose_waypoints(vec![
            Pose3D::from_xyz_yaw(0.0, 0.0, 0.0, 0.0),
            Pose3D::from_xyz_yaw(3.0, 0.0, 0.0, 0.0),
            Pose3D::from_xyz_yaw(3.0, 3.0, 0.0, 0.0),
        ]);
        let heuristics = BodyPathHeuristics::new(&parameters, plan);
        let goal = Pose3D::from_xyz_yaw(3.0, 3.0, 0.0, 0.0);

        // straight-line distance from the start is shorter than the
        // corridor length; the corridor heuristic reflects the latter
        let start = FootstepNode::new(0.0, 0.1, 0.0, RobotSide::Left);
        let estimate = heuristics.compute(&start, &goal);
        assert!(estimate >= parameters.astar_heuristics_weight * 5.9);
    }
}
