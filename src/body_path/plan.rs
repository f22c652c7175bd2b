//! Waypoint-defined body path with arc-length parameterization.

use itertools::Itertools;

use crate::common::Pose3D;

/// Result of the body-path planning stage. Search failure is a normal
/// result value, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyPathPlanningResult {
    FoundSolution,
    NoPathExists,
    Exception,
}

impl BodyPathPlanningResult {
    pub fn valid_for_execution(&self) -> bool {
        matches!(self, BodyPathPlanningResult::FoundSolution)
    }
}

/// Ordered pose waypoints from start to goal, with cumulative path lengths
/// for interpolation queries
#[derive(Debug, Clone, Default)]
pub struct BodyPathPlan {
    waypoints: Vec<Pose3D>,
    cumulative_lengths: Vec<f64>,
}

impl BodyPathPlan {
    pub fn clear(&mut self) {
        self.waypoints.clear();
        self.cumulative_lengths.clear();
    }

    pub fn set_pose_waypoints(&mut self, waypoints: Vec<Pose3D>) {
        self.cumulative_lengths = std::iter::once(0.0)
            .chain(
                waypoints
                    .iter()
                    .tuple_windows()
                    .scan(0.0, |length, (a, b): (&Pose3D, &Pose3D)| {
                        *length += a.position.distance_xy(&b.position);
                        Some(*length)
                    }),
            )
            .collect();
        self.waypoints = waypoints;
    }

    pub fn waypoints(&self) -> &[Pose3D] {
        &self.waypoints
    }

    pub fn num_waypoints(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn start_pose(&self) -> Option<&Pose3D> {
        self.waypoints.first()
    }

    pub fn goal_pose(&self) -> Option<&Pose3D> {
        self.waypoints.last()
    }

    /// Total horizontal path length [m]
    pub fn path_length(&self) -> f64 {
        self.cumulative_lengths.last().copied().unwrap_or(0.0)
    }

    /// Pose at normalized arc length `alpha` in [0, 1]. Orientation is the
    /// segment heading.
    pub fn point_along_path(&self, alpha: f64) -> Option<Pose3D> {
        if self.waypoints.is_empty() {
            return None;
        }
        if self.waypoints.len() == 1 {
            return Some(self.waypoints[0]);
        }

        let total = self.path_length();
        if total < 1e-12 {
            return Some(self.waypoints[0]);
        }
        let target = alpha.clamp(0.0, 1.0) * total;

        for i in 0..self.waypoints.len() - 1 {
            let segment_start = self.cumulative_lengths[i];
            let segment_end = self.cumulative_lengths[i + 1];
            if target <= segment_end || i == self.waypoints.len() - 2 {
                let segment_length = (segment_end - segment_start).max(1e-12);
                let local_alpha = ((target - segment_start) / segment_length).clamp(0.0, 1.0);
                let a = &self.waypoints[i];
                let b = &self.waypoints[i + 1];
                let position = a.position.interpolate(&b.position, local_alpha);
                let heading = (b.position.y - a.position.y).atan2(b.position.x - a.position.x);
                return Some(Pose3D::from_xyz_yaw(position.x, position.y, position.z, heading));
            }
        }
        None
    }

    /// Remaining path length from the closest point on the path to the
    /// given (x, y), used as a search heuristic
    pub fn remaining_length_from(&self, x: f64, y: f64) -> f64 {
        if self.waypoints.len() < 2 {
            return 0.0;
        }

        let mut best = f64::INFINITY;
        let mut best_remaining = 0.0;
        for i in 0..self.waypoints.len() - 1 {
            let a = &self.waypoints[i].position;
            let b = &self.waypoints[i + 1].position;
            let dx = b.x - a.x;
            let dy = b.y - a.y;
            let length_squared = (dx * dx + dy * dy).max(1e-12);
            let t = (((x - a.x) * dx + (y - a.y) * dy) / length_squared).clamp(0.0, 1.0);
            let px = a.x + t * dx;
            let py = a.y + t * dy;
            let distance_squared = (x - px).powi(2) + (y - py).powi(2);
            if distance_squared < best {
                best = distance_squared;
                let segment_length = length_squared.sqrt();
                best_remaining = self.path_length()
                    - (self.cumulative_lengths[i] + t * segment_length);
            }
        }
        best.sqrt() + best_remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight_plan() -> BodyPathPlan {
        let mut plan = BodyPathPlan::default();
        plan.set_pose_waypoints(vec![
            Pose3D::from_xyz_yaw(0.0, 0.0, 0.0, 0.0),
            Pose3D::from_xyz_yaw(2.0, 0.0, 0.0, 0.0),
            Pose3D::from_xyz_yaw(2.0, 2.0, 0.0, 0.0),
        ]);
        plan
    }

    #[test]
    fn test_path_length() {
        assert!((straight_plan().path_length() - 4.0).abs() < 1e-10);
    }

    #[test]
    fn test_point_along_path() {
        let plan = straight_plan();
        let mid = plan.point_along_path(0.5).unwrap();
        assert!((mid.position.x - 2.0).abs() < 1e-9);
        assert!(mid.position.y.abs() < 1e-9);

        let three_quarter = plan.point_along_path(0.75).unwrap();
        assert!((three_quarter.position.y - 1.0).abs() < 1e-9);
        assert!((three_quarter.yaw() - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn test_remaining_length_decreases_along_path() {
        let plan = straight_plan();
        let at_start = plan.remaining_length_from(0.0, 0.0);
        let later = plan.remaining_length_from(1.5, 0.0);
        assert!(later < at_start);
        assert!((at_start - 4.0).abs() < 1e-9);
    }
}
