//! Parameterized footstep node expansion.

use crate::common::RobotSide;
use crate::graph::{FootstepNode, GRID_SIZE_XY, GRID_SIZE_YAW};
use crate::planner::parameters::FootstepPlannerParameters;

/// Expands a stance node into the lattice of kinematically reachable
/// candidate steps for the opposite foot
pub struct ParameterBasedNodeExpansion {
    ideal_step_width: f64,
    max_step_length: f64,
    min_step_length: f64,
    max_step_width: f64,
    min_step_width: f64,
    max_step_reach: f64,
    max_step_yaw: f64,
    min_step_yaw: f64,
}

impl ParameterBasedNodeExpansion {
    pub fn new(parameters: &FootstepPlannerParameters) -> Self {
        Self {
            ideal_step_width: parameters.ideal_step_width,
            max_step_length: parameters.max_step_length,
            min_step_length: parameters.min_step_length,
            max_step_width: parameters.max_step_width,
            min_step_width: parameters.min_step_width,
            max_step_reach: parameters.max_step_reach,
            max_step_yaw: parameters.max_step_yaw,
            min_step_yaw: parameters.min_step_yaw,
        }
    }

    /// Candidate child nodes for the foot opposite the stance node.
    /// Offsets are expressed in the stance frame: x forward, y toward the
    /// stepping side, yaw positive turning outward.
    pub fn expand(&self, stance: &FootstepNode) -> Vec<FootstepNode> {
        let step_side = stance.side().opposite();
        let side_sign = step_side.sign();
        let (sin, cos) = stance.yaw().sin_cos();

        let mut children = Vec::new();

        let x_steps = lattice_range(self.min_step_length, self.max_step_length, GRID_SIZE_XY);
        let y_steps = lattice_range(self.min_step_width, self.max_step_width, GRID_SIZE_XY);
        let yaw_steps = lattice_range(self.min_step_yaw, self.max_step_yaw, GRID_SIZE_YAW);

        for &dx in &x_steps {
            for &dy in &y_steps {
                // reach measured from the ideal stance width
                let reach = (dx * dx + (dy - self.ideal_step_width).powi(2)).sqrt();
                if reach > self.max_step_reach {
                    continue;
                }

                let lateral = side_sign * dy;
                let world_x = stance.x() + cos * dx - sin * lateral;
                let world_y = stance.y() + sin * dx + cos * lateral;

                for &dyaw in &yaw_steps {
                    let world_yaw = stance.yaw() + side_sign * dyaw;
                    children.push(FootstepNode::new(world_x, world_y, world_yaw, step_side));
                }
            }
        }

        children
    }

    /// The child that realizes the ideal step from the stance node
    pub fn ideal_step(&self, stance: &FootstepNode, ideal_step_length: f64) -> FootstepNode {
        let step_side = stance.side().opposite();
        let lateral = step_side.sign() * self.ideal_step_width;
        let (sin, cos) = stance.yaw().sin_cos();
        FootstepNode::new(
            stance.x() + cos * ideal_step_length - sin * lateral,
            stance.y() + sin * ideal_step_length + cos * lateral,
            stance.yaw(),
            step_side,
        )
    }
}

fn lattice_range(min: f64, max: f64, step: f64) -> Vec<f64> {
    let start = (min / step).round() as i32;
    let end = (max / step).round() as i32;
    (start..=end).map(|i| i as f64 * step).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expansion_steps_with_opposite_foot() {
        let expansion = ParameterBasedNodeExpansion::new(&FootstepPlannerParameters::default());
        let stance = FootstepNode::new(0.0, 0.0, 0.0, RobotSide::Left);
        let children = expansion.expand(&stance);
        assert!(!children.is_empty());
        assert!(children.iter().all(|c| c.side() == RobotSide::Right));
        // right-foot steps land at negative y relative to a left stance
        assert!(children.iter().all(|c| c.y() < 0.0));
    }

    #[test]
    fn test_expansion_respects_reach() {
        let parameters = FootstepPlannerParameters::default();
        let expansion = ParameterBasedNodeExpansion::new(&parameters);
        let stance = FootstepNode::new(0.0, 0.0, 0.0, RobotSide::Right);
        for child in expansion.expand(&stance) {
            let dx = child.x() - stance.x();
            let dy = (child.y() - stance.y()).abs();
            let reach = (dx * dx + (dy - parameters.ideal_step_width).powi(2)).sqrt();
            assert!(reach <= parameters.max_step_reach + 1e-9);
        }
    }

    #[test]
    fn test_ideal_step_advances_forward() {
        let parameters = FootstepPlannerParameters::default();
        let expansion = ParameterBasedNodeExpansion::new(&parameters);
        let stance = FootstepNode::new(0.0, -0.1, 0.0, RobotSide::Right);
        let ideal = expansion.ideal_step(&stance, parameters.ideal_step_length);
        assert_eq!(ideal.side(), RobotSide::Left);
        assert!((ideal.x() - 0.3).abs() < GRID_SIZE_XY);
        assert!(ideal.y() > stance.y());
    }
}
