//! Discretized footstep states used as search-graph vertices.

use crate::common::{Point2D, RobotSide};

/// Lattice cell size in x and y [m]
pub const GRID_SIZE_XY: f64 = 0.05;
/// Number of discrete yaw values per full turn
pub const YAW_DIVISIONS: i32 = 72;
/// Lattice cell size in yaw [rad]
pub const GRID_SIZE_YAW: f64 = 2.0 * std::f64::consts::PI / YAW_DIVISIONS as f64;

/// A discretized footstep state: (x, y, yaw, side) on the planning lattice.
/// Equality is value-based on the quantized indices, making nodes usable as
/// closed-set keys; the total order gives priority queues a deterministic
/// tie-break so identical requests replan identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FootstepNode {
    x_index: i32,
    y_index: i32,
    yaw_index: i32,
    side: RobotSide,
}

impl FootstepNode {
    pub fn new(x: f64, y: f64, yaw: f64, side: RobotSide) -> Self {
        Self {
            x_index: (x / GRID_SIZE_XY).round() as i32,
            y_index: (y / GRID_SIZE_XY).round() as i32,
            yaw_index: wrap_yaw_index((yaw / GRID_SIZE_YAW).round() as i32),
            side,
        }
    }

    pub fn from_indices(x_index: i32, y_index: i32, yaw_index: i32, side: RobotSide) -> Self {
        Self {
            x_index,
            y_index,
            yaw_index: wrap_yaw_index(yaw_index),
            side,
        }
    }

    pub fn x(&self) -> f64 {
        self.x_index as f64 * GRID_SIZE_XY
    }

    pub fn y(&self) -> f64 {
        self.y_index as f64 * GRID_SIZE_XY
    }

    pub fn yaw(&self) -> f64 {
        let yaw = self.yaw_index as f64 * GRID_SIZE_YAW;
        if yaw > std::f64::consts::PI {
            yaw - 2.0 * std::f64::consts::PI
        } else {
            yaw
        }
    }

    pub fn side(&self) -> RobotSide {
        self.side
    }

    pub fn x_index(&self) -> i32 {
        self.x_index
    }

    pub fn y_index(&self) -> i32 {
        self.y_index
    }

    pub fn yaw_index(&self) -> i32 {
        self.yaw_index
    }

    pub fn distance_xy(&self, other: &FootstepNode) -> f64 {
        ((self.x() - other.x()).powi(2) + (self.y() - other.y()).powi(2)).sqrt()
    }

    /// Mid-foot point assuming the other foot stands at the ideal stance
    /// width on its side
    pub fn mid_foot_point(&self, ideal_step_width: f64) -> Point2D {
        let half_width = 0.5 * ideal_step_width * self.side.sign();
        let (sin, cos) = self.yaw().sin_cos();
        Point2D::new(self.x() + half_width * sin, self.y() - half_width * cos)
    }
}

fn wrap_yaw_index(index: i32) -> i32 {
    index.rem_euclid(YAW_DIVISIONS)
}

/// A directed edge between two footstep nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphEdge {
    pub stance: FootstepNode,
    pub step: FootstepNode,
}

impl GraphEdge {
    pub fn new(stance: FootstepNode, step: FootstepNode) -> Self {
        Self { stance, step }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_equality_on_lattice() {
        let a = FootstepNode::new(1.01, -0.49, 0.01, RobotSide::Left);
        let b = FootstepNode::new(1.0, -0.5, 0.0, RobotSide::Left);
        assert_eq!(a, b);
        let c = FootstepNode::new(1.0, -0.5, 0.0, RobotSide::Right);
        assert_ne!(a, c);
    }

    #[test]
    fn test_yaw_wraps() {
        let node = FootstepNode::new(0.0, 0.0, 2.0 * std::f64::consts::PI, RobotSide::Left);
        assert_eq!(node.yaw_index(), 0);
        let negative = FootstepNode::new(0.0, 0.0, -GRID_SIZE_YAW, RobotSide::Left);
        assert_eq!(negative.yaw_index(), YAW_DIVISIONS - 1);
    }

    #[test]
    fn test_mid_foot_point_between_feet() {
        let left = FootstepNode::new(0.0, 0.1, 0.0, RobotSide::Left);
        let mid = left.mid_foot_point(0.2);
        assert!(mid.x.abs() < 1e-10);
        assert!(mid.y.abs() < 1e-10);
    }
}
