//! Navigable regions: planar regions annotated with clusters and a local
//! visibility map.

use log::debug;

use crate::common::{Point2D, Point3D};
use crate::geometry::{BoundingBox3D, PlanarRegion};
use crate::visibility::cluster::{
    discretize_ring, ensure_counter_clockwise, offset_ring, Cluster,
};
use crate::visibility::connection::{Connection, ConnectionPoint3D};
use crate::visibility::parameters::VisibilityGraphParameters;
use crate::visibility::visibility_tools;
use crate::visibility::visibility_map::VisibilityMap;

/// A planar region plus its derived clusters and local visibility map.
/// Built per planning call, never mutated concurrently.
#[derive(Debug, Clone)]
pub struct NavigableRegion {
    region: PlanarRegion,
    home_cluster: Cluster,
    obstacle_clusters: Vec<Cluster>,
    visibility_map_in_world: VisibilityMap,
    bounding_box: BoundingBox3D,
}

impl NavigableRegion {
    pub fn region(&self) -> &PlanarRegion {
        &self.region
    }

    pub fn map_id(&self) -> i32 {
        self.region.id()
    }

    pub fn home_cluster(&self) -> &Cluster {
        &self.home_cluster
    }

    pub fn obstacle_clusters(&self) -> &[Cluster] {
        &self.obstacle_clusters
    }

    pub fn visibility_map_in_world(&self) -> &VisibilityMap {
        &self.visibility_map_in_world
    }

    pub fn bounding_box(&self) -> &BoundingBox3D {
        &self.bounding_box
    }

    pub fn all_clusters(&self) -> impl Iterator<Item = &Cluster> {
        std::iter::once(&self.home_cluster).chain(self.obstacle_clusters.iter())
    }

    pub fn to_world(&self, local: &Point2D) -> Point3D {
        self.region.to_world(&Point3D::new(local.x, local.y, 0.0))
    }
}

/// Builds one navigable region per accepted planar region, each with its
/// local visibility map computed.
pub fn create_navigable_regions(
    all_regions: &[PlanarRegion],
    parameters: &VisibilityGraphParameters,
) -> Vec<NavigableRegion> {
    let mut navigable_regions = Vec::with_capacity(all_regions.len());

    for (candidate_index, candidate) in all_regions.iter().enumerate() {
        if !is_region_navigable(candidate, parameters) {
            continue;
        }

        let other_regions: Vec<&PlanarRegion> = all_regions
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != candidate_index)
            .map(|(_, r)| r)
            .collect();

        navigable_regions.push(create_navigable_region(candidate, &other_regions, parameters));
    }

    debug!(
        "created {} navigable regions out of {} planar regions",
        navigable_regions.len(),
        all_regions.len()
    );

    navigable_regions
}

fn is_region_navigable(region: &PlanarRegion, parameters: &VisibilityGraphParameters) -> bool {
    if region.normal().z < parameters.orthogonal_angle.cos() {
        return false;
    }
    let hull = crate::geometry::ConvexPolygon2D::from_points(region.boundary());
    hull.area() >= parameters.min_region_area
}

/// Builds the home cluster, obstacle clusters and local visibility map for
/// one accepted region.
pub fn create_navigable_region(
    region: &PlanarRegion,
    other_regions: &[&PlanarRegion],
    parameters: &VisibilityGraphParameters,
) -> NavigableRegion {
    let boundary = ensure_counter_clockwise(region.boundary());

    let home_ring = offset_ring(&boundary, -parameters.home_extrusion_distance);
    let home_points = discretize_ring(&home_ring, parameters.cluster_resolution);
    let home_cluster = Cluster::home(home_points);

    let mut obstacle_clusters = Vec::new();
    for obstacle in other_regions {
        if let Some(cluster) = create_obstacle_cluster(region, obstacle, parameters) {
            obstacle_clusters.push(cluster);
        }
    }
    // hole boundaries are obstacles interior to the region itself
    for hole in region.holes() {
        obstacle_clusters.push(extrude_obstacle_ring(hole, parameters));
    }

    let connections =
        visibility_tools::create_static_visibility_map(region, &home_cluster, &obstacle_clusters);

    let world_connections = connections
        .iter()
        .map(|(a, b)| {
            Connection::new(
                ConnectionPoint3D::new(
                    region.to_world(&Point3D::new(a.x, a.y, 0.0)),
                    region.id(),
                ),
                ConnectionPoint3D::new(
                    region.to_world(&Point3D::new(b.x, b.y, 0.0)),
                    region.id(),
                ),
            )
        })
        .collect();

    NavigableRegion {
        bounding_box: region.bounding_box(),
        region: region.clone(),
        home_cluster,
        obstacle_clusters,
        visibility_map_in_world: VisibilityMap::new(world_connections),
    }
}

/// Projects an obstacle region onto the home region's local frame and
/// extrudes it. Returns None when the obstacle does not actually obstruct
/// the home region (no overlap, too low, or high enough to pass under).
fn create_obstacle_cluster(
    home: &PlanarRegion,
    obstacle: &PlanarRegion,
    parameters: &VisibilityGraphParameters,
) -> Option<Cluster> {
    let home_box = home.bounding_box();
    let obstacle_box = obstacle.bounding_box();
    if !home_box.intersects_epsilon(&obstacle_box, parameters.obstacle_extrusion_distance) {
        return None;
    }

    // project obstacle boundary vertices into the home local frame,
    // truncating vertices beneath (or nearly on) the home plane
    let mut projected = Vec::new();
    let mut max_height = f64::NEG_INFINITY;
    for vertex in obstacle.boundary() {
        let world = obstacle.to_world(&Point3D::new(vertex.x, vertex.y, 0.0));
        let home_plane_z = match home.plane_z_given_xy(world.x, world.y) {
            Some(z) => z,
            None => return None,
        };
        let height = world.z - home_plane_z;
        max_height = max_height.max(height);
        if height < parameters.obstacle_height_threshold {
            continue;
        }
        let local = home.to_local(&world);
        projected.push(Point2D::new(local.x, local.y));
    }

    if projected.len() < 3 || max_height > parameters.can_duck_under_height {
        return None;
    }

    let hull = crate::geometry::ConvexPolygon2D::from_points(&projected);
    if hull.is_empty() {
        return None;
    }
    Some(extrude_obstacle_ring(hull.vertices(), parameters))
}

fn extrude_obstacle_ring(ring: &[Point2D], parameters: &VisibilityGraphParameters) -> Cluster {
    let ccw = ensure_counter_clockwise(ring);
    let no_go_ring = offset_ring(&ccw, parameters.obstacle_extrusion_distance);
    let navigable_ring = offset_ring(
        &ccw,
        parameters.obstacle_extrusion_distance + parameters.navigable_extra_distance,
    );
    let navigable_points = discretize_ring(&navigable_ring, parameters.cluster_resolution);
    Cluster::obstacle(navigable_points, no_go_ring)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_flat_region_has_home_map() {
        let region = PlanarRegion::flat_square(1, 0.0, 0.0, 0.0, 4.0);
        let parameters = VisibilityGraphParameters::default();
        let navigable = create_navigable_regions(&[region], &parameters);
        assert_eq!(navigable.len(), 1);
        assert!(!navigable[0].visibility_map_in_world().is_empty());
        assert!(navigable[0].obstacle_clusters().is_empty());
    }

    #[test]
    fn test_steep_region_filtered_out() {
        let rotation =
            nalgebra::UnitQuaternion::from_euler_angles(0.0, 1.4, 0.0);
        let transform = nalgebra::Isometry3::from_parts(
            nalgebra::Translation3::new(0.0, 0.0, 0.0),
            rotation,
        );
        let boundary = vec![
            Point2D::new(1.0, 1.0),
            Point2D::new(-1.0, 1.0),
            Point2D::new(-1.0, -1.0),
            Point2D::new(1.0, -1.0),
        ];
        let steep = PlanarRegion::new(2, transform, boundary);
        let navigable =
            create_navigable_regions(&[steep], &VisibilityGraphParameters::default());
        assert!(navigable.is_empty());
    }

    #[test]
    fn test_elevated_obstacle_creates_cluster() {
        let ground = PlanarRegion::flat_square(1, 0.0, 0.0, 0.0, 6.0);
        let box_top = PlanarRegion::flat_square(2, 0.0, 0.0, 0.5, 1.0);
        let parameters = VisibilityGraphParameters::default();
        let navigable = create_navigable_regions(&[ground, box_top], &parameters);
        let ground_region = navigable.iter().find(|r| r.map_id() == 1).unwrap();
        assert_eq!(ground_region.obstacle_clusters().len(), 1);
        // box center must be inside the no-go zone
        assert!(ground_region.obstacle_clusters()[0]
            .is_inside_no_go_zone(&Point2D::new(0.0, 0.0)));
    }
}
