//! Planar terrain regions.
//!
//! A planar region is one walkable surface patch: a polygon boundary (plus
//! optional hole boundaries) expressed in a local frame whose z = 0 plane is
//! the surface, and a rigid transform placing that frame in the world.
//! Regions are immutable once constructed; a planning request owns a list of
//! them as its terrain snapshot.

use nalgebra::{Isometry3, Point3 as NaPoint3, Vector3};

use crate::common::{Point2D, Point3D};
use crate::geometry::polygon::{point_in_polygon, ConvexPolygon2D};

/// Axis-aligned bounding box in world coordinates
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox3D {
    pub min: Point3D,
    pub max: Point3D,
}

impl BoundingBox3D {
    pub fn intersects_epsilon(&self, other: &BoundingBox3D, epsilon: f64) -> bool {
        self.min.x - epsilon <= other.max.x
            && self.max.x + epsilon >= other.min.x
            && self.min.y - epsilon <= other.max.y
            && self.max.y + epsilon >= other.min.y
            && self.min.z - epsilon <= other.max.z
            && self.max.z + epsilon >= other.min.z
    }
}

/// One walkable surface patch
#[derive(Debug, Clone)]
pub struct PlanarRegion {
    id: i32,
    transform_to_world: Isometry3<f64>,
    boundary: Vec<Point2D>,
    holes: Vec<Vec<Point2D>>,
    convex_polygons: Vec<ConvexPolygon2D>,
}

impl PlanarRegion {
    /// Region from a boundary ring in the local frame. The convex
    /// decomposition defaults to the boundary's convex hull, which is exact
    /// for convex boundaries.
    pub fn new(id: i32, transform_to_world: Isometry3<f64>, boundary: Vec<Point2D>) -> Self {
        let hull = ConvexPolygon2D::from_points(&boundary);
        Self {
            id,
            transform_to_world,
            boundary,
            holes: Vec::new(),
            convex_polygons: vec![hull],
        }
    }

    /// Replaces the default convex decomposition, for concave boundaries
    pub fn with_convex_polygons(mut self, polygons: Vec<ConvexPolygon2D>) -> Self {
        self.convex_polygons = polygons;
        self
    }

    pub fn with_holes(mut self, holes: Vec<Vec<Point2D>>) -> Self {
        self.holes = holes;
        self
    }

    /// Horizontal square region of the given side length centered at
    /// (center_x, center_y, z)
    pub fn flat_square(id: i32, center_x: f64, center_y: f64, z: f64, side: f64) -> Self {
        let half = 0.5 * side;
        let boundary = vec![
            Point2D::new(half, half),
            Point2D::new(-half, half),
            Point2D::new(-half, -half),
            Point2D::new(half, -half),
        ];
        let transform = Isometry3::translation(center_x, center_y, z);
        Self::new(id, transform, boundary)
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn transform_to_world(&self) -> &Isometry3<f64> {
        &self.transform_to_world
    }

    pub fn boundary(&self) -> &[Point2D] {
        &self.boundary
    }

    pub fn holes(&self) -> &[Vec<Point2D>] {
        &self.holes
    }

    pub fn convex_polygons(&self) -> &[ConvexPolygon2D] {
        &self.convex_polygons
    }

    /// World-frame surface normal, oriented to point up
    pub fn normal(&self) -> Vector3<f64> {
        let n = self.transform_to_world.rotation * Vector3::z();
        if n.z < 0.0 {
            -n
        } else {
            n
        }
    }

    pub fn to_world(&self, local: &Point3D) -> Point3D {
        let p = self.transform_to_world * NaPoint3::new(local.x, local.y, local.z);
        Point3D::new(p.x, p.y, p.z)
    }

    pub fn to_local(&self, world: &Point3D) -> Point3D {
        let p = self.transform_to_world.inverse() * NaPoint3::new(world.x, world.y, world.z);
        Point3D::new(p.x, p.y, p.z)
    }

    /// Height of the region's plane below/above the given world (x, y).
    /// Returns None for vertical regions, which have no vertical projection.
    pub fn plane_z_given_xy(&self, x: f64, y: f64) -> Option<f64> {
        let normal = self.normal();
        if normal.z.abs() < 1e-7 {
            return None;
        }
        let origin = self.to_world(&Point3D::origin());
        Some(origin.z + (normal.x * (origin.x - x) + normal.y * (origin.y - y)) / normal.z)
    }

    /// Local 2D coordinates of the world point (x, y) projected vertically
    /// onto the region's plane
    pub fn project_vertically_to_local(&self, x: f64, y: f64) -> Option<Point2D> {
        let z = self.plane_z_given_xy(x, y)?;
        let local = self.to_local(&Point3D::new(x, y, z));
        Some(Point2D::new(local.x, local.y))
    }

    /// Local 2D containment, honoring holes
    pub fn contains_local_point(&self, point: &Point2D) -> bool {
        if !point_in_polygon(point, &self.boundary) {
            return false;
        }
        !self.holes.iter().any(|hole| point_in_polygon(point, hole))
    }

    /// Whether the vertical line through world (x, y) pierces this region
    pub fn contains_point_vertically(&self, x: f64, y: f64) -> bool {
        match self.project_vertically_to_local(x, y) {
            Some(local) => self.contains_local_point(&local),
            None => false,
        }
    }

    /// World-frame AABB over boundary vertices
    pub fn bounding_box(&self) -> BoundingBox3D {
        let mut min = Point3D::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let mut max = Point3D::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for vertex in &self.boundary {
            let world = self.to_world(&Point3D::new(vertex.x, vertex.y, 0.0));
            min.x = min.x.min(world.x);
            min.y = min.y.min(world.y);
            min.z = min.z.min(world.z);
            max.x = max.x.max(world.x);
            max.y = max.y.max(world.y);
            max.z = max.z.max(world.z);
        }
        BoundingBox3D { min, max }
    }

    /// Intersections of a world-XY polygon with this region's convex
    /// polygons projected vertically into the world XY plane
    pub fn polygon_intersections_when_projected_vertically(
        &self,
        polygon_in_world: &ConvexPolygon2D,
    ) -> Vec<ConvexPolygon2D> {
        let mut intersections = Vec::new();
        for convex in &self.convex_polygons {
            let projected_points: Vec<Point2D> = convex
                .vertices()
                .iter()
                .map(|v| {
                    let world = self.to_world(&Point3D::new(v.x, v.y, 0.0));
                    Point2D::new(world.x, world.y)
                })
                .collect();
            let projected = ConvexPolygon2D::from_points(&projected_points);
            let intersection = polygon_in_world.intersection(&projected);
            if !intersection.is_empty() {
                intersections.push(intersection);
            }
        }
        intersections
    }
}

/// Terrain snapshot: the list of planar regions a request plans over.
/// Read-only for the duration of a planning call.
#[derive(Debug, Clone, Default)]
pub struct PlanarRegionsList {
    regions: Vec<PlanarRegion>,
}

impl PlanarRegionsList {
    pub fn new(regions: Vec<PlanarRegion>) -> Self {
        Self { regions }
    }

    pub fn regions(&self) -> &[PlanarRegion] {
        &self.regions
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Regions whose vertical projection overlaps the given world-XY polygon
    pub fn regions_intersecting_polygon(&self, polygon: &ConvexPolygon2D) -> Vec<&PlanarRegion> {
        self.regions
            .iter()
            .filter(|region| {
                !region
                    .polygon_intersections_when_projected_vertically(polygon)
                    .is_empty()
            })
            .collect()
    }

    /// Region with the highest plane under the world point, if any
    pub fn highest_region_under_point(&self, x: f64, y: f64) -> Option<(&PlanarRegion, f64)> {
        let mut best: Option<(&PlanarRegion, f64)> = None;
        for region in &self.regions {
            if !region.contains_point_vertically(x, y) {
                continue;
            }
            let z = match region.plane_z_given_xy(x, y) {
                Some(z) => z,
                None => continue,
            };
            match best {
                Some((_, best_z)) if z <= best_z => {}
                _ => best = Some((region, z)),
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::UnitQuaternion;

    #[test]
    fn test_flat_square_projection() {
        let region = PlanarRegion::flat_square(1, 0.0, 0.0, 0.5, 4.0);
        assert!((region.plane_z_given_xy(1.0, 1.0).unwrap() - 0.5).abs() < 1e-10);
        assert!(region.contains_point_vertically(1.9, -1.9));
        assert!(!region.contains_point_vertically(2.1, 0.0));
    }

    #[test]
    fn test_inclined_region_plane_height() {
        // 45 degree ramp around the y axis: z varies with x
        let rotation = UnitQuaternion::from_euler_angles(0.0, -std::f64::consts::FRAC_PI_4, 0.0);
        let transform = Isometry3::from_parts(nalgebra::Translation3::new(0.0, 0.0, 0.0), rotation);
        let boundary = vec![
            Point2D::new(1.0, 1.0),
            Point2D::new(-1.0, 1.0),
            Point2D::new(-1.0, -1.0),
            Point2D::new(1.0, -1.0),
        ];
        let region = PlanarRegion::new(2, transform, boundary);
        let z = region.plane_z_given_xy(0.5, 0.0).unwrap();
        assert!((z - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_hole_excluded_from_containment() {
        let region = PlanarRegion::flat_square(3, 0.0, 0.0, 0.0, 4.0).with_holes(vec![vec![
            Point2D::new(0.5, 0.5),
            Point2D::new(-0.5, 0.5),
            Point2D::new(-0.5, -0.5),
            Point2D::new(0.5, -0.5),
        ]]);
        assert!(!region.contains_point_vertically(0.0, 0.0));
        assert!(region.contains_point_vertically(1.0, 1.0));
    }

    #[test]
    fn test_highest_region_wins() {
        let low = PlanarRegion::flat_square(1, 0.0, 0.0, 0.0, 4.0);
        let high = PlanarRegion::flat_square(2, 0.0, 0.0, 0.3, 2.0);
        let regions = PlanarRegionsList::new(vec![low, high]);
        let (region, z) = regions.highest_region_under_point(0.0, 0.0).unwrap();
        assert_eq!(region.id(), 2);
        assert!((z - 0.3).abs() < 1e-10);
    }
}
