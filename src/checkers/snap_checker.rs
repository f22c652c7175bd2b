//! Snap-based footstep validity checks.

use nalgebra::Vector3;

use crate::checkers::{FootstepNodeChecker, RejectionReason};
use crate::common::angle_difference;
use crate::graph::FootstepNode;
use crate::planner::parameters::FootstepPlannerParameters;
use crate::snapping::FootstepSnapper;

/// Rejects nodes whose snap fails, lands on too steep a surface, keeps too
/// little foothold area, or changes height too much relative to the stance
/// foot. Also guards against stepping in place or onto the stance foot.
pub struct SnapBasedChecker {
    max_surface_incline: f64,
    min_foothold_percent: f64,
    max_step_z: f64,
    min_clearance: f64,
}

impl SnapBasedChecker {
    pub fn new(parameters: &FootstepPlannerParameters) -> Self {
        Self {
            max_surface_incline: parameters.max_surface_incline,
            min_foothold_percent: parameters.min_foothold_percent,
            max_step_z: parameters.max_step_z,
            min_clearance: parameters.min_clearance_from_stance,
        }
    }
}

impl FootstepNodeChecker for SnapBasedChecker {
    fn check(
        &self,
        node: &FootstepNode,
        previous: Option<&FootstepNode>,
        snapper: &mut dyn FootstepSnapper,
    ) -> Result<(), RejectionReason> {
        let snap = snapper.snap(node).ok_or(RejectionReason::CouldNotSnap)?;

        // surface incline from the snapped sole orientation
        let sole_normal = snap.snapped_pose.orientation * Vector3::z();
        let incline = sole_normal.z.clamp(-1.0, 1.0).acos();
        if incline > self.max_surface_incline {
            return Err(RejectionReason::SurfaceInclineTooSteep);
        }

        if snap.foothold_area_ratio < self.min_foothold_percent {
            return Err(RejectionReason::InsufficientFoothold);
        }

        let previous = match previous {
            Some(previous) => previous,
            None => return Ok(()),
        };

        // a step must clear its own previous placement and the stance foot
        let dx = (node.x() - previous.x()).abs();
        let dy = (node.y() - previous.y()).abs();
        if dx < self.min_clearance && dy < self.min_clearance {
            return Err(if node.side() == previous.side() {
                RejectionReason::StepInPlace
            } else {
                RejectionReason::SteppingOnStanceFoot
            });
        }

        if let Some(previous_snap) = snapper.snap(previous) {
            let height_change =
                (snap.snapped_pose.position.z - previous_snap.snapped_pose.position.z).abs();
            if height_change > self.max_step_z {
                return Err(RejectionReason::StepTooHighOrLow);
            }
        }

        // yaw sanity: the step should not spin relative to the stance foot
        // beyond what expansion generates; guards externally supplied nodes
        let yaw_change = angle_difference(node.yaw(), previous.yaw()).abs();
        if yaw_change > std::f64::consts::FRAC_PI_2 {
            return Err(RejectionReason::StepInPlace);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{RobotSide, SideDependent};
    use crate::geometry::{ConvexPolygon2D, PlanarRegion, PlanarRegionsList};
    use crate::snapping::{PlanarRegionFootstepSnapper, SnapperParameters};

    fn snapper_over(regions: Vec<PlanarRegion>) -> PlanarRegionFootstepSnapper {
        let mut snapper = PlanarRegionFootstepSnapper::new(
            SideDependent::both(ConvexPolygon2D::rectangle(0.22, 0.11)),
            SnapperParameters::default(),
        );
        snapper.set_planar_regions(Some(PlanarRegionsList::new(regions)));
        snapper
    }

    #[test]
    fn test_rejects_node_off_terrain() {
        let checker = SnapBasedChecker::new(&FootstepPlannerParameters::default());
        let mut snapper = snapper_over(vec![PlanarRegion::flat_square(1, 0.0, 0.0, 0.0, 2.0)]);
        let node = FootstepNode::new(5.0, 5.0, 0.0, RobotSide::Left);
        assert_eq!(
            checker.check(&node, None, &mut snapper),
            Err(RejectionReason::CouldNotSnap)
        );
    }

    #[test]
    fn test_accepts_flat_ground_step() {
        let checker = SnapBasedChecker::new(&FootstepPlannerParameters::default());
        let mut snapper = snapper_over(vec![PlanarRegion::flat_square(1, 0.0, 0.0, 0.0, 4.0)]);
        let stance = FootstepNode::new(0.0, -0.125, 0.0, RobotSide::Right);
        let step = FootstepNode::new(0.3, 0.125, 0.0, RobotSide::Left);
        assert!(checker.check(&step, Some(&stance), &mut snapper).is_ok());
    }

    #[test]
    fn test_rejects_large_height_change() {
        let checker = SnapBasedChecker::new(&FootstepPlannerParameters::default());
        let low = PlanarRegion::flat_square(1, 0.0, 0.0, 0.0, 2.0);
        let high = PlanarRegion::flat_square(2, 1.0, 0.0, 0.5, 1.0);
        let mut snapper = snapper_over(vec![low, high]);
        let stance = FootstepNode::new(-0.3, -0.125, 0.0, RobotSide::Right);
        let step = FootstepNode::new(1.0, 0.125, 0.0, RobotSide::Left);
        assert_eq!(
            checker.check(&step, Some(&stance), &mut snapper),
            Err(RejectionReason::StepTooHighOrLow)
        );
    }

    #[test]
    fn test_rejects_stepping_on_stance_foot() {
        let checker = SnapBasedChecker::new(&FootstepPlannerParameters::default());
        let mut snapper = snapper_over(vec![PlanarRegion::flat_square(1, 0.0, 0.0, 0.0, 4.0)]);
        let stance = FootstepNode::new(0.0, 0.0, 0.0, RobotSide::Right);
        let step = FootstepNode::new(0.0, 0.0, 0.0, RobotSide::Left);
        assert_eq!(
            checker.check(&step, Some(&stance), &mut snapper),
            Err(RejectionReason::SteppingOnStanceFoot)
        );
    }
}
