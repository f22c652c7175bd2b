//! Body-collision sweep between consecutive footsteps.

use crate::checkers::{FootstepNodeChecker, RejectionReason};
use crate::common::Point2D;
use crate::geometry::{ConvexPolygon2D, PlanarRegionsList};
use crate::graph::FootstepNode;
use crate::planner::parameters::FootstepPlannerParameters;
use crate::snapping::FootstepSnapper;

const SWEEP_SAMPLES: usize = 3;

/// Sweeps a simplified body collision box between the stance and candidate
/// nodes against obstacle regions, rejecting on intersection
pub struct BodyCollisionChecker {
    enabled: bool,
    body_box_width: f64,
    body_box_depth: f64,
    body_box_height: f64,
    body_ground_clearance: f64,
    ideal_step_width: f64,
    regions: Option<PlanarRegionsList>,
}

impl BodyCollisionChecker {
    pub fn new(parameters: &FootstepPlannerParameters) -> Self {
        Self {
            enabled: parameters.check_body_collisions,
            body_box_width: parameters.body_box_width,
            body_box_depth: parameters.body_box_depth,
            body_box_height: parameters.body_box_height,
            body_ground_clearance: parameters.body_ground_clearance,
            ideal_step_width: parameters.ideal_step_width,
            regions: None,
        }
    }

    fn body_collides_at(&self, center: &Point2D, yaw: f64, foot_z: f64) -> bool {
        let regions = match &self.regions {
            Some(regions) => regions,
            None => return false,
        };

        let body_box = ConvexPolygon2D::rectangle(self.body_box_depth, self.body_box_width)
            .rotated_translated(yaw, center.x, center.y);
        let band_bottom = foot_z + self.body_ground_clearance;
        let band_top = band_bottom + self.body_box_height;

        for region in regions.regions() {
            let intersections =
                region.polygon_intersections_when_projected_vertically(&body_box);
            if intersections.is_empty() {
                continue;
            }
            for polygon in &intersections {
                let centroid = polygon.centroid();
                if let Some(z) = region.plane_z_given_xy(centroid.x, centroid.y) {
                    if z > band_bottom && z < band_top {
                        return true;
                    }
                }
            }
        }
        false
    }
}

impl FootstepNodeChecker for BodyCollisionChecker {
    fn set_planar_regions(&mut self, regions: Option<PlanarRegionsList>) {
        self.regions = regions;
    }

    fn check(
        &self,
        node: &FootstepNode,
        previous: Option<&FootstepNode>,
        snapper: &mut dyn FootstepSnapper,
    ) -> Result<(), RejectionReason> {
        if !self.enabled {
            return Ok(());
        }
        let previous = match previous {
            Some(previous) => previous,
            None => return Ok(()),
        };

        let foot_z = snapper
            .snap(node)
            .map(|snap| snap.snapped_pose.position.z)
            .unwrap_or(0.0);

        let start = previous.mid_foot_point(self.ideal_step_width);
        let end = node.mid_foot_point(self.ideal_step_width);

        for i in 0..SWEEP_SAMPLES {
            let alpha = i as f64 / (SWEEP_SAMPLES - 1) as f64;
            let sample = start.interpolate(&end, alpha);
            if self.body_collides_at(&sample, node.yaw(), foot_z) {
                return Err(RejectionReason::ObstacleBlockingBody);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{RobotSide, SideDependent};
    use crate::geometry::PlanarRegion;
    use crate::snapping::FlatGroundSnapper;

    fn flat_snapper() -> FlatGroundSnapper {
        FlatGroundSnapper::new(SideDependent::both(ConvexPolygon2D::rectangle(0.22, 0.11)))
    }

    #[test]
    fn test_clear_path_passes() {
        let mut checker = BodyCollisionChecker::new(&FootstepPlannerParameters::default());
        let ground = PlanarRegion::flat_square(1, 0.0, 0.0, 0.0, 10.0);
        checker.set_planar_regions(Some(PlanarRegionsList::new(vec![ground])));
        let stance = FootstepNode::new(0.0, -0.125, 0.0, RobotSide::Right);
        let step = FootstepNode::new(0.3, 0.125, 0.0, RobotSide::Left);
        assert!(checker
            .check(&step, Some(&stance), &mut flat_snapper())
            .is_ok());
    }

    #[test]
    fn test_chest_height_obstacle_rejects() {
        let mut checker = BodyCollisionChecker::new(&FootstepPlannerParameters::default());
        let ground = PlanarRegion::flat_square(1, 0.0, 0.0, 0.0, 10.0);
        let wall_top = PlanarRegion::flat_square(2, 0.2, 0.0, 1.0, 0.6);
        checker.set_planar_regions(Some(PlanarRegionsList::new(vec![ground, wall_top])));
        let stance = FootstepNode::new(0.0, -0.125, 0.0, RobotSide::Right);
        let step = FootstepNode::new(0.3, 0.125, 0.0, RobotSide::Left);
        assert_eq!(
            checker.check(&step, Some(&stance), &mut flat_snapper()),
            Err(RejectionReason::ObstacleBlockingBody)
        );
    }

    #[test]
    fn test_disabled_checker_passes_everything() {
        let mut parameters = FootstepPlannerParameters::default();
        parameters.check_body_collisions = false;
        let mut checker = BodyCollisionChecker::new(&parameters);
        let wall_top = PlanarRegion::flat_square(2, 0.2, 0.0, 1.0, 0.6);
        checker.set_planar_regions(Some(PlanarRegionsList::new(vec![wall_top])));
        let stance = FootstepNode::new(0.0, -0.125, 0.0, RobotSide::Right);
        let step = FootstepNode::new(0.3, 0.125, 0.0, RobotSide::Left);
        assert!(checker
            .check(&step, Some(&stance), &mut flat_snapper())
            .is_ok());
    }
}
