//! Terrain snapping with per-call memoization.
//!
//! Snapping finds the planar region under a node's nominal footprint,
//! computes the support-polygon intersection, and returns the rigid
//! transform mapping the nominal footprint onto the terrain. Nodes are
//! revisited many times during search, so results are cached per node;
//! the cache is scoped to one planning call and cleared between calls so
//! stale terrain can never leak across requests.

use std::collections::HashMap;

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

use crate::common::{Pose3D, RobotSide, SideDependent};
use crate::geometry::{ConvexPolygon2D, PlanarRegion, PlanarRegionsList};
use crate::graph::FootstepNode;
use crate::snapping::wiggler;

/// Successful snap: the snapped sole pose, the rigid snap transform and the
/// cropped support polygon
#[derive(Debug, Clone)]
pub struct SnapData {
    /// Sole pose after snapping onto the terrain
    pub snapped_pose: Pose3D,
    /// Rigid transform mapping the nominal (flat, z = 0) sole pose onto the
    /// snapped pose
    pub snap_transform: Isometry3<f64>,
    /// Support polygon in world XY after cropping against the region
    pub foothold: ConvexPolygon2D,
    /// Cropped area divided by the nominal footprint area
    pub foothold_area_ratio: f64,
    /// Id of the region the node snapped onto
    pub region_id: i32,
    /// Whether the wiggle refinement adjusted the footstep in-plane
    pub wiggled: bool,
}

/// Capability of snapping footstep nodes onto terrain
pub trait FootstepSnapper {
    fn set_planar_regions(&mut self, regions: Option<PlanarRegionsList>);
    /// Snap result for the node; None when no terrain supports it
    fn snap(&mut self, node: &FootstepNode) -> Option<SnapData>;
    /// Clears the per-call memo cache
    fn reset(&mut self);
}

/// Wiggle-search tuning
#[derive(Debug, Clone)]
pub struct SnapperParameters {
    /// In-plane perturbation bound for the wiggle search [m]
    pub wiggle_inside_delta: f64,
    /// Wiggle only when the raw foothold ratio falls below this
    pub wiggle_below_area_ratio: f64,
}

impl Default for SnapperParameters {
    fn default() -> Self {
        Self {
            wiggle_inside_delta: 0.03,
            wiggle_below_area_ratio: 0.9,
        }
    }
}

/// Snapper that projects footprints vertically onto planar regions
pub struct PlanarRegionFootstepSnapper {
    foot_polygons: SideDependent<ConvexPolygon2D>,
    parameters: SnapperParameters,
    regions: Option<PlanarRegionsList>,
    cache: HashMap<FootstepNode, Option<SnapData>>,
}

impl PlanarRegionFootstepSnapper {
    pub fn new(foot_polygons: SideDependent<ConvexPolygon2D>, parameters: SnapperParameters) -> Self {
        Self {
            foot_polygons,
            parameters,
            regions: None,
            cache: HashMap::new(),
        }
    }

    pub fn foot_polygon(&self, side: RobotSide) -> &ConvexPolygon2D {
        self.foot_polygons.get(side)
    }

    fn snap_internal(&self, node: &FootstepNode) -> Option<SnapData> {
        let regions = match &self.regions {
            Some(regions) if !regions.is_empty() => regions,
            // no terrain: identity snap onto flat ground
            _ => {
                let foothold = self
                    .foot_polygons
                    .get(node.side())
                    .rotated_translated(node.yaw(), node.x(), node.y());
                return Some(SnapData {
                    snapped_pose: Pose3D::from_xyz_yaw(node.x(), node.y(), 0.0, node.yaw()),
                    snap_transform: Isometry3::identity(),
                    foothold,
                    foothold_area_ratio: 1.0,
                    region_id: -1,
                    wiggled: false,
                });
            }
        };
        let nominal_polygon = self.foot_polygons.get(node.side());
        let nominal_area = nominal_polygon.area();

        let footprint_world = nominal_polygon.rotated_translated(node.yaw(), node.x(), node.y());

        let region = best_region_under(regions, &footprint_world, node.x(), node.y())?;

        let mut x = node.x();
        let mut y = node.y();
        let mut yaw = node.yaw();
        let mut foothold =
            crop_foothold(region, nominal_polygon, x, y, yaw);
        let mut wiggled = false;

        let mut ratio = foothold.area() / nominal_area;
        if ratio < self.parameters.wiggle_below_area_ratio {
            if let Some(adjustment) = wiggler::wiggle_for_area(
                region,
                nominal_polygon,
                x,
                y,
                yaw,
                self.parameters.wiggle_inside_delta,
            ) {
                x = adjustment.x;
                y = adjustment.y;
                yaw = adjustment.yaw;
                foothold = crop_foothold(region, nominal_polygon, x, y, yaw);
                ratio = foothold.area() / nominal_area;
                wiggled = true;
            }
        }

        if foothold.is_empty() {
            return None;
        }

        let z = region.plane_z_given_xy(x, y)?;
        let align = UnitQuaternion::rotation_between(&Vector3::z(), &region.normal())
            .unwrap_or_else(UnitQuaternion::identity);
        let orientation = align * UnitQuaternion::from_euler_angles(0.0, 0.0, yaw);

        let snapped = Isometry3::from_parts(Translation3::new(x, y, z), orientation);
        let nominal = Isometry3::from_parts(
            Translation3::new(node.x(), node.y(), 0.0),
            UnitQuaternion::from_euler_angles(0.0, 0.0, node.yaw()),
        );
        let snap_transform = snapped * nominal.inverse();

        Some(SnapData {
            snapped_pose: Pose3D::from_isometry(&snapped),
            snap_transform,
            foothold,
            foothold_area_ratio: ratio,
            region_id: region.id(),
            wiggled,
        })
    }
}

impl FootstepSnapper for PlanarRegionFootstepSnapper {
    fn set_planar_regions(&mut self, regions: Option<PlanarRegionsList>) {
        self.regions = regions;
        self.cache.clear();
    }

    fn snap(&mut self, node: &FootstepNode) -> Option<SnapData> {
        if let Some(cached) = self.cache.get(node) {
            return cached.clone();
        }
        let result = self.snap_internal(node);
        self.cache.insert(*node, result.clone());
        result
    }

    fn reset(&mut self) {
        self.cache.clear();
    }
}

/// Region supporting the footstep: among regions whose projection overlaps
/// the footprint, the one with the highest plane under the foot center
fn best_region_under<'a>(
    regions: &'a PlanarRegionsList,
    footprint_world: &ConvexPolygon2D,
    x: f64,
    y: f64,
) -> Option<&'a PlanarRegion> {
    regions
        .regions_intersecting_polygon(footprint_world)
        .into_iter()
        .filter_map(|region| region.plane_z_given_xy(x, y).map(|z| (region, z)))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(region, _)| region)
}

fn crop_foothold(
    region: &PlanarRegion,
    nominal_polygon: &ConvexPolygon2D,
    x: f64,
    y: f64,
    yaw: f64,
) -> ConvexPolygon2D {
    let footprint_world = nominal_polygon.rotated_translated(yaw, x, y);
    let intersections = region.polygon_intersections_when_projected_vertically(&footprint_world);
    let mut points = Vec::new();
    for polygon in &intersections {
        points.extend_from_slice(polygon.vertices());
    }
    if points.len() < 3 {
        return ConvexPolygon2D::empty();
    }
    ConvexPolygon2D::from_points(&points)
}

/// Snapper for flat-ground mode: identity snap at z = 0, full foothold
pub struct FlatGroundSnapper {
    foot_polygons: SideDependent<ConvexPolygon2D>,
}

impl FlatGroundSnapper {
    pub fn new(foot_polygons: SideDependent<ConvexPolygon2D>) -> Self {
        Self { foot_polygons }
    }
}

impl FootstepSnapper for FlatGroundSnapper {
    fn set_planar_regions(&mut self, _regions: Option<PlanarRegionsList>) {}

    fn snap(&mut self, node: &FootstepNode) -> Option<SnapData> {
        let foothold = self
            .foot_polygons
            .get(node.side())
            .rotated_translated(node.yaw(), node.x(), node.y());
        Some(SnapData {
            snapped_pose: Pose3D::from_xyz_yaw(node.x(), node.y(), 0.0, node.yaw()),
            snap_transform: Isometry3::identity(),
            foothold,
            foothold_area_ratio: 1.0,
            region_id: -1,
            wiggled: false,
        })
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_foot_polygons() -> SideDependent<ConvexPolygon2D> {
        SideDependent::both(ConvexPolygon2D::rectangle(0.22, 0.11))
    }

    fn snapper_over(regions: Vec<PlanarRegion>) -> PlanarRegionFootstepSnapper {
        let mut snapper = PlanarRegionFootstepSnapper::new(
            default_foot_polygons(),
            SnapperParameters::default(),
        );
        snapper.set_planar_regions(Some(PlanarRegionsList::new(regions)));
        snapper
    }

    #[test]
    fn test_snap_onto_flat_region_is_plane_exact() {
        let region = PlanarRegion::flat_square(1, 0.0, 0.0, 0.25, 4.0);
        let mut snapper = snapper_over(vec![region]);
        let node = FootstepNode::new(0.5, 0.5, 0.0, RobotSide::Left);

        let snap = snapper.snap(&node).unwrap();
        assert!((snap.snapped_pose.position.z - 0.25).abs() < 1e-9);
        // full nominal footprint is supported
        assert!((snap.foothold_area_ratio - 1.0).abs() < 1e-6);
        assert!(!snap.wiggled);
        // transform maps the nominal pose onto the plane
        let translation = snap.snap_transform.translation;
        assert!((translation.z - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_snap_off_terrain_fails() {
        let region = PlanarRegion::flat_square(1, 0.0, 0.0, 0.0, 2.0);
        let mut snapper = snapper_over(vec![region]);
        let node = FootstepNode::new(5.0, 5.0, 0.0, RobotSide::Left);
        assert!(snapper.snap(&node).is_none());
    }

    #[test]
    fn test_partial_foothold_on_region_edge() {
        let region = PlanarRegion::flat_square(1, 0.0, 0.0, 0.0, 2.0);
        let mut snapper = snapper_over(vec![region]);
        // foot centered exactly on the region edge at x = 1
        let node = FootstepNode::new(1.0, 0.0, 0.0, RobotSide::Left);
        let snap = snapper.snap(&node).unwrap();
        assert!(snap.foothold_area_ratio < 0.9);
    }

    #[test]
    fn test_cache_is_cleared_on_new_terrain() {
        let low = PlanarRegion::flat_square(1, 0.0, 0.0, 0.0, 4.0);
        let high = PlanarRegion::flat_square(1, 0.0, 0.0, 1.0, 4.0);
        let mut snapper = snapper_over(vec![low]);
        let node = FootstepNode::new(0.0, 0.0, 0.0, RobotSide::Left);
        let first = snapper.snap(&node).unwrap();
        assert!(first.snapped_pose.position.z.abs() < 1e-9);

        snapper.set_planar_regions(Some(PlanarRegionsList::new(vec![high])));
        let second = snapper.snap(&node).unwrap();
        assert!((second.snapped_pose.position.z - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_flat_ground_snapper_identity() {
        let mut snapper = FlatGroundSnapper::new(default_foot_polygons());
        let node = FootstepNode::new(0.3, 0.1, 0.2, RobotSide::Right);
        let snap = snapper.snap(&node).unwrap();
        assert!(snap.snapped_pose.position.z.abs() < 1e-12);
        assert!((snap.foothold_area_ratio - 1.0).abs() < 1e-12);
    }
}
