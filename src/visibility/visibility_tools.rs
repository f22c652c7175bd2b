//! Line-of-sight tests and visibility map assembly.

use crate::common::{Point2D, Point3D};
use crate::geometry::polygon::segments_intersect;
use crate::geometry::PlanarRegion;
use crate::visibility::cluster::Cluster;
use crate::visibility::connection::{Connection, ConnectionPoint3D};
use crate::visibility::navigable_region::NavigableRegion;
use crate::visibility::parameters::VisibilityGraphParameters;
use crate::visibility::visibility_map::{
    InterRegionVisibilityMap, SingleSourceVisibilityMap, VisibilityMap,
};

/// Whether the segment (source, target) is unobstructed: it must not cross
/// any obstacle cluster's no-go ring. Containment of the endpoints is
/// filtered separately.
pub fn is_point_visible(
    source: &Point2D,
    target: &Point2D,
    obstacle_clusters: &[Cluster],
) -> bool {
    for cluster in obstacle_clusters {
        let ring = cluster.no_go_ring();
        let n = ring.len();
        if n < 2 {
            continue;
        }
        for i in 0..n {
            let a = &ring[i];
            let b = &ring[(i + 1) % n];
            if segments_intersect(source, target, a, b) {
                return false;
            }
        }
    }
    true
}

fn is_point_navigable(
    point: &Point2D,
    region: &PlanarRegion,
    obstacle_clusters: &[Cluster],
) -> bool {
    region.contains_local_point(point)
        && !obstacle_clusters
            .iter()
            .any(|cluster| cluster.is_inside_no_go_zone(point))
}

/// All-pairs visibility between the cluster boundary points of one region,
/// in the region's local frame. Connections terminating outside the region
/// or inside a no-go zone are removed. The test is symmetric, so each
/// undirected pair is emitted once.
pub fn create_static_visibility_map(
    region: &PlanarRegion,
    home_cluster: &Cluster,
    obstacle_clusters: &[Cluster],
) -> Vec<(Point2D, Point2D)> {
    let mut candidate_points: Vec<Point2D> = Vec::new();
    for cluster in std::iter::once(home_cluster).chain(obstacle_clusters.iter()) {
        candidate_points.extend_from_slice(cluster.navigable_points());
    }

    let navigable: Vec<Point2D> = candidate_points
        .into_iter()
        .filter(|p| is_point_navigable(p, region, obstacle_clusters))
        .collect();

    let mut connections = Vec::new();
    for i in 0..navigable.len() {
        for j in (i + 1)..navigable.len() {
            let source = navigable[i];
            let target = navigable[j];
            if is_point_visible(&source, &target, obstacle_clusters) {
                connections.push((source, target));
            }
        }
    }
    connections
}

/// Builds a visibility map connecting an arbitrary 3D point (start or goal)
/// into its host region's map.
///
/// The host region is the navigable region containing the point. When the
/// point sits in a non-navigable pocket it is connected to the nearest
/// vertex of the host map, or spliced into the nearest connection of the
/// fallback map when that is closer, interpolating a new vertex along that
/// edge. Returns None when no host region contains the point and no
/// fallback map is supplied; the caller reports that as a planning failure.
pub fn create_single_source_visibility_map(
    source: &Point3D,
    navigable_regions: &[NavigableRegion],
    fallback_map: Option<&mut VisibilityMap>,
) -> Option<SingleSourceVisibilityMap> {
    let host_region = navigable_regions
        .iter()
        .find(|region| region.region().contains_point_vertically(source.x, source.y));

    let host_region = match host_region {
        Some(region) => region,
        None => return connect_through_fallback(source, fallback_map),
    };

    let map_id = host_region.map_id();
    let source_local = host_region
        .region()
        .project_vertically_to_local(source.x, source.y)?;
    let source_point = ConnectionPoint3D::new(
        host_region.to_world(&source_local),
        map_id,
    );

    let mut connections: Vec<Connection> = Vec::new();
    let obstacle_clusters = host_region.obstacle_clusters();
    if !obstacle_clusters
        .iter()
        .any(|cluster| cluster.is_inside_no_go_zone(&source_local))
    {
        for cluster in host_region.all_clusters() {
            for target in cluster.navigable_points() {
                if !is_point_navigable(target, host_region.region(), obstacle_clusters) {
                    continue;
                }
                if is_point_visible(&source_local, target, obstacle_clusters) {
                    let target_point =
                        ConnectionPoint3D::new(host_region.to_world(target), map_id);
                    connections.push(Connection::new(source_point, target_point));
                }
            }
        }
    }

    if !connections.is_empty() {
        return Some(SingleSourceVisibilityMap { source: source_point, connections });
    }

    // the source is in a non-navigable pocket: nearest host vertex, or a
    // spliced fallback connection if one is closer. Sorted iteration keeps
    // tie-breaking deterministic across identical requests.
    let mut min_distance_squared = f64::INFINITY;
    let mut closest_host_point: Option<ConnectionPoint3D> = None;
    for vertex in sorted_vertices(host_region.visibility_map_in_world()) {
        let distance_squared = vertex.distance_squared_to_point(source);
        if distance_squared < min_distance_squared {
            min_distance_squared = distance_squared;
            closest_host_point = Some(vertex);
        }
    }

    let mut closest_fallback: Option<Connection> = None;
    if let Some(fallback) = &fallback_map {
        for connection in fallback.connections() {
            let distance_squared = connection.distance_squared_to_point(source);
            if distance_squared < min_distance_squared {
                min_distance_squared = distance_squared;
                closest_fallback = Some(*connection);
                closest_host_point = None;
            }
        }
    }

    if let Some(host_point) = closest_host_point {
        let connections = vec![Connection::new(source_point, host_point)];
        return Some(SingleSourceVisibilityMap { source: source_point, connections });
    }

    match (closest_fallback, fallback_map) {
        (Some(connection), Some(fallback)) => Some(splice_into_connection(
            ConnectionPoint3D::new(*source, map_id),
            &connection,
            fallback,
            map_id,
        )),
        _ => None,
    }
}

fn connect_through_fallback(
    source: &Point3D,
    fallback_map: Option<&mut VisibilityMap>,
) -> Option<SingleSourceVisibilityMap> {
    let fallback = fallback_map?;
    let (connection, _) = fallback.closest_connection(source)?;
    let source_point = ConnectionPoint3D::new(*source, -1);
    Some(splice_into_connection(source_point, &connection, fallback, -1))
}

/// Connects `source_point` to the nearest point along `connection`,
/// splitting the connection in two when the projection falls strictly
/// inside it.
fn splice_into_connection(
    source_point: ConnectionPoint3D,
    connection: &Connection,
    fallback: &mut VisibilityMap,
    map_id: i32,
) -> SingleSourceVisibilityMap {
    let percentage = connection.percentage_along_connection(&source_point.position);
    let epsilon = 1.0e-3;

    let connections = if percentage <= epsilon {
        vec![Connection::new(source_point, connection.source)]
    } else if percentage >= 1.0 - epsilon {
        vec![Connection::new(source_point, connection.target)]
    } else {
        let new_point = connection.point_given_percentage(percentage, map_id);
        fallback.add_connection(Connection::new(connection.source, new_point));
        fallback.add_connection(Connection::new(new_point, connection.target));
        vec![Connection::new(source_point, new_point)]
    };

    SingleSourceVisibilityMap { source: source_point, connections }
}

/// Tests all vertex pairs across different regions against the connection
/// filter to build the global inter-region map. A bounding-box pre-filter
/// prunes region pairs before the O(N^2) pairwise test.
pub fn create_inter_region_visibility_map(
    navigable_regions: &[NavigableRegion],
    parameters: &VisibilityGraphParameters,
) -> InterRegionVisibilityMap {
    let mut map = InterRegionVisibilityMap::default();
    let max_length = parameters.max_inter_region_connection_length;

    for source_index in 0..navigable_regions.len() {
        let source_vertices =
            sorted_vertices(navigable_regions[source_index].visibility_map_in_world());

        for target_index in (source_index + 1)..navigable_regions.len() {
            let source_box = navigable_regions[source_index].bounding_box();
            let target_box = navigable_regions[target_index].bounding_box();
            if !source_box.intersects_epsilon(target_box, max_length) {
                continue;
            }

            let target_vertices =
                sorted_vertices(navigable_regions[target_index].visibility_map_in_world());

            for source in &source_vertices {
                for target in &target_vertices {
                    if source.region_id == target.region_id {
                        continue;
                    }
                    if is_inter_region_connection_valid(source, target, parameters) {
                        map.add_connection(*source, *target);
                    }
                }
            }
        }
    }

    map
}

fn sorted_vertices(map: &VisibilityMap) -> Vec<ConnectionPoint3D> {
    let mut vertices: Vec<ConnectionPoint3D> = map.vertices().into_iter().collect();
    vertices.sort_unstable();
    vertices
}

fn is_inter_region_connection_valid(
    source: &ConnectionPoint3D,
    target: &ConnectionPoint3D,
    parameters: &VisibilityGraphParameters,
) -> bool {
    let height_delta = (source.position.z - target.position.z).abs();
    if height_delta > parameters.max_inter_region_height_delta {
        return false;
    }
    source.distance(target) <= parameters.max_inter_region_connection_length
}
