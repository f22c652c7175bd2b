//! Body-path post-processing: obstacle-avoidance waypoint adjustment.

use crate::common::{Point2D, Pose3D};
use crate::geometry::polygon::point_in_polygon;
use crate::visibility::{NavigableRegion, VisibilityGraphParameters};

/// Nudges interior waypoints away from obstacle no-go rings until they
/// reach the preferred clearance, preserving path topology (endpoints are
/// never moved, adjustments are capped per pass).
pub struct ObstacleAvoidanceProcessor {
    preferred_clearance: f64,
    max_adjustment_per_pass: f64,
    passes: usize,
}

impl ObstacleAvoidanceProcessor {
    pub fn new(parameters: &VisibilityGraphParameters) -> Self {
        Self {
            preferred_clearance: parameters.preferred_obstacle_clearance,
            max_adjustment_per_pass: 0.15,
            passes: 3,
        }
    }

    pub fn process(&self, waypoints: &mut [Pose3D], navigable_regions: &[NavigableRegion]) {
        if waypoints.len() < 3 {
            return;
        }

        for _ in 0..self.passes {
            for i in 1..waypoints.len() - 1 {
                self.adjust_waypoint(&mut waypoints[i], navigable_regions);
            }
        }
    }

    fn adjust_waypoint(&self, waypoint: &mut Pose3D, navigable_regions: &[NavigableRegion]) {
        let host = navigable_regions.iter().find(|region| {
            region
                .region()
                .contains_point_vertically(waypoint.position.x, waypoint.position.y)
        });
        let Some(host) = host else {
            return;
        };

        let Some(local) = host
            .region()
            .project_vertically_to_local(waypoint.position.x, waypoint.position.y)
        else {
            return;
        };

        let mut shift_x = 0.0;
        let mut shift_y = 0.0;
        for cluster in host.obstacle_clusters() {
            let ring = cluster.no_go_ring();
            if ring.len() < 3 {
                continue;
            }
            let inside = point_in_polygon(&local, ring);
            let (closest, distance) = closest_ring_point(&local, ring);
            let signed_distance = if inside { -distance } else { distance };
            if signed_distance >= self.preferred_clearance {
                continue;
            }
            // outside the ring: push directly away from it; inside: exit
            // through the nearest boundary point
            let (away_x, away_y) = if inside {
                (closest.x - local.x, closest.y - local.y)
            } else {
                (local.x - closest.x, local.y - closest.y)
            };
            let norm = (away_x * away_x + away_y * away_y).sqrt().max(1e-9);
            let magnitude =
                (self.preferred_clearance - signed_distance).min(self.max_adjustment_per_pass);
            shift_x += magnitude * away_x / norm;
            shift_y += magnitude * away_y / norm;
        }

        if shift_x == 0.0 && shift_y == 0.0 {
            return;
        }

        let adjusted = Point2D::new(local.x + shift_x, local.y + shift_y);
        // only accept adjustments that stay on the region
        if !host.region().contains_local_point(&adjusted) {
            return;
        }
        let world = host.to_world(&adjusted);
        waypoint.position = world;
    }
}

fn closest_ring_point(point: &Point2D, ring: &[Point2D]) -> (Point2D, f64) {
    let mut best = ring[0];
    let mut best_distance = f64::INFINITY;
    for i in 0..ring.len() {
        let a = &ring[i];
        let b = &ring[(i + 1) % ring.len()];
        let candidate = project_to_segment(point, a, b);
        let distance = point.distance(&candidate);
        if distance < best_distance {
            best_distance = distance;
            best = candidate;
        }
    }
    (best, best_distance)
}

fn project_to_segment(p: &Point2D, a: &Point2D, b: &Point2D) -> Point2D {
    let length_squared = a.distance_squared(b);
    if length_squared < 1e-12 {
        return *a;
    }
    let t = (((p.x - a.x) * (b.x - a.x) + (p.y - a.y) * (b.y - a.y)) / length_squared).clamp(0.0, 1.0);
    Point2D::new(a.x + t * (b.x - a.x), a.y + t * (b.y - a.y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PlanarRegion;
    use crate::visibility::create_navigable_regions;

    #[test]
    fn test_waypoint_pushed_away_from_obstacle() {
        let ground = PlanarRegion::flat_square(1, 0.0, 0.0, 0.0, 10.0);
        let box_top = PlanarRegion::flat_square(2, 0.0, 1.0, 0.5, 1.0);
        let parameters = VisibilityGraphParameters::default();
        let navigable = create_navigable_regions(&[ground, box_top], &parameters);

        let mut waypoints = vec![
            Pose3D::from_xyz_yaw(-3.0, 0.0, 0.0, 0.0),
            Pose3D::from_xyz_yaw(0.0, 0.12, 0.0, 0.0),
            Pose3D::from_xyz_yaw(3.0, 0.0, 0.0, 0.0),
        ];
        let before_y = waypoints[1].position.y;

        let processor = ObstacleAvoidanceProcessor::new(&parameters);
        processor.process(&mut waypoints, &navigable);

        // middle waypoint moves away from the box at y ~ 1.0
        assert!(waypoints[1].position.y < before_y);
        // endpoints untouched
        assert!((waypoints[0].position.x + 3.0).abs() < 1e-12);
        assert!((waypoints[2].position.x - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_clear_waypoints_unchanged() {
        let ground = PlanarRegion::flat_square(1, 0.0, 0.0, 0.0, 10.0);
        let parameters = VisibilityGraphParameters::default();
        let navigable = create_navigable_regions(&[ground], &parameters);

        let mut waypoints = vec![
            Pose3D::from_xyz_yaw(-3.0, 0.0, 0.0, 0.0),
            Pose3D::from_xyz_yaw(0.0, 0.0, 0.0, 0.0),
            Pose3D::from_xyz_yaw(3.0, 0.0, 0.0, 0.0),
        ];
        let processor = ObstacleAvoidanceProcessor::new(&parameters);
        processor.process(&mut waypoints, &navigable);
        assert!(waypoints[1].position.x.abs() < 1e-12);
        assert!(waypoints[1].position.y.abs() < 1e-12);
    }
}
