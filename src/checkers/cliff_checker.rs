//! Cliff avoidance: keeps steps away from large nearby height changes.

use crate::checkers::{FootstepNodeChecker, RejectionReason};
use crate::geometry::PlanarRegionsList;
use crate::graph::FootstepNode;
use crate::planner::parameters::FootstepPlannerParameters;
use crate::snapping::FootstepSnapper;

const SAMPLE_COUNT: usize = 8;

/// Rejects nodes whose snapped height differs from neighboring ground
/// samples by more than the configured rise threshold; prevents planning
/// steps at the bottom of ledges the swing foot would clip
pub struct CliffAvoidanceChecker {
    cliff_height_to_avoid: f64,
    min_distance_from_cliff: f64,
    regions: Option<PlanarRegionsList>,
}

impl CliffAvoidanceChecker {
    pub fn new(parameters: &FootstepPlannerParameters) -> Self {
        Self {
            cliff_height_to_avoid: parameters.cliff_height_to_avoid,
            min_distance_from_cliff: parameters.min_distance_from_cliff_bottoms,
            regions: None,
        }
    }
}

impl FootstepNodeChecker for CliffAvoidanceChecker {
    fn set_planar_regions(&mut self, regions: Option<PlanarRegionsList>) {
        self.regions = regions;
    }

    fn check(
        &self,
        node: &FootstepNode,
        _previous: Option<&FootstepNode>,
        snapper: &mut dyn FootstepSnapper,
    ) -> Result<(), RejectionReason> {
        let regions = match &self.regions {
            Some(regions) if !regions.is_empty() => regions,
            _ => return Ok(()),
        };
        let snap = match snapper.snap(node) {
            Some(snap) => snap,
            None => return Ok(()), // the snap checker owns this rejection
        };
        let node_z = snap.snapped_pose.position.z;

        for i in 0..SAMPLE_COUNT {
            let angle = 2.0 * std::f64::consts::PI * i as f64 / SAMPLE_COUNT as f64;
            let sample_x = node.x() + self.min_distance_from_cliff * angle.cos();
            let sample_y = node.y() + self.min_distance_from_cliff * angle.sin();

            // samples with no terrain carry no cliff information
            if let Some((_, sample_z)) = regions.highest_region_under_point(sample_x, sample_y) {
                if sample_z - node_z > self.cliff_height_to_avoid {
                    return Err(RejectionReason::AtCliffBottom);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{RobotSide, SideDependent};
    use crate::geometry::{ConvexPolygon2D, PlanarRegion};
    use crate::snapping::{PlanarRegionFootstepSnapper, SnapperParameters};

    fn snapper_over(regions: &PlanarRegionsList) -> PlanarRegionFootstepSnapper {
        let mut snapper = PlanarRegionFootstepSnapper::new(
            SideDependent::both(ConvexPolygon2D::rectangle(0.22, 0.11)),
            SnapperParameters::default(),
        );
        snapper.set_planar_regions(Some(regions.clone()));
        snapper
    }

    fn wide_margin_parameters() -> FootstepPlannerParameters {
        let mut parameters = FootstepPlannerParameters::default();
        parameters.min_distance_from_cliff_bottoms = 0.3;
        parameters
    }

    #[test]
    fn test_step_near_ledge_bottom_rejected() {
        let ground = PlanarRegion::flat_square(1, 0.0, 0.0, 0.0, 4.0);
        // 0.4 m ledge whose face sits at x = 0.25
        let ledge = PlanarRegion::flat_square(2, 1.25, 0.0, 0.4, 2.0);
        let regions = PlanarRegionsList::new(vec![ground, ledge]);
        let mut snapper = snapper_over(&regions);

        let mut checker = CliffAvoidanceChecker::new(&wide_margin_parameters());
        checker.set_planar_regions(Some(regions));

        // foot on the low ground, fully supported, within 0.3 m of the face
        let node = FootstepNode::new(0.0, 0.0, 0.0, RobotSide::Left);
        assert_eq!(
            checker.check(&node, None, &mut snapper),
            Err(RejectionReason::AtCliffBottom)
        );
    }

    #[test]
    fn test_step_far_from_ledge_accepted() {
        let ground = PlanarRegion::flat_square(1, 0.0, 0.0, 0.0, 4.0);
        let ledge = PlanarRegion::flat_square(2, 1.6, 0.0, 0.4, 1.0);
        let regions = PlanarRegionsList::new(vec![ground, ledge]);
        let mut snapper = snapper_over(&regions);

        let mut checker = CliffAvoidanceChecker::new(&wide_margin_parameters());
        checker.set_planar_regions(Some(regions));

        let node = FootstepNode::new(-0.5, 0.0, 0.0, RobotSide::Left);
        assert!(checker.check(&node, None, &mut snapper).is_ok());
    }
}
