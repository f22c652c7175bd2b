//! Visibility-graph body-path planner.
//!
//! Runs a shortest-path search over the combined visibility graph (local
//! region maps, inter-region connections, start and goal single-source
//! hookups) to produce a coarse 2D waypoint path, then nudges waypoints
//! away from obstacle boundaries.

use std::collections::{BinaryHeap, HashMap};

use log::debug;
use ordered_float::OrderedFloat;

use crate::body_path::plan::BodyPathPlanningResult;
use crate::body_path::post_processor::ObstacleAvoidanceProcessor;
use crate::common::{Point3D, Pose3D};
use crate::geometry::PlanarRegionsList;
use crate::visibility::{
    create_navigable_regions, visibility_tools, ConnectionPoint3D, NavigableRegion,
    VisibilityGraphParameters, VisibilityMap,
};

/// Shortest-path planner over the terrain visibility graph. No state
/// persists between calls except the parameters.
pub struct VisibilityGraphPathPlanner {
    parameters: VisibilityGraphParameters,
    planar_regions: Option<PlanarRegionsList>,
    start_pose: Pose3D,
    goal_pose: Pose3D,
    waypoints: Vec<Pose3D>,
    reachable_vertices: Vec<(ConnectionPoint3D, f64)>,
    predecessors: HashMap<ConnectionPoint3D, ConnectionPoint3D>,
    navigable_regions: Vec<NavigableRegion>,
}

impl VisibilityGraphPathPlanner {
    pub fn new(parameters: VisibilityGraphParameters) -> Self {
        Self {
            parameters,
            planar_regions: None,
            start_pose: Pose3D::identity(),
            goal_pose: Pose3D::identity(),
            waypoints: Vec::new(),
            reachable_vertices: Vec::new(),
            predecessors: HashMap::new(),
            navigable_regions: Vec::new(),
        }
    }

    pub fn set_planar_regions(&mut self, planar_regions: Option<PlanarRegionsList>) {
        self.planar_regions = planar_regions;
    }

    /// Start pose computed as the mid-point of the stance feet
    pub fn set_stance_foot_poses(&mut self, left: &Pose3D, right: &Pose3D) {
        self.start_pose = left.interpolate(right, 0.5);
    }

    pub fn set_goal(&mut self, goal: &Pose3D) {
        self.goal_pose = *goal;
    }

    pub fn waypoints(&self) -> &[Pose3D] {
        &self.waypoints
    }

    /// Plans waypoints from start to goal. Failure to find a path is a
    /// normal result value.
    pub fn plan_waypoints(&mut self) -> BodyPathPlanningResult {
        self.waypoints.clear();
        self.reachable_vertices.clear();
        self.predecessors.clear();
        self.navigable_regions.clear();

        let regions = match &self.planar_regions {
            Some(regions) if !regions.is_empty() => regions.clone(),
            _ => {
                // no usable terrain: straight start-to-goal segment
                self.waypoints = vec![self.start_pose, self.goal_pose];
                return BodyPathPlanningResult::FoundSolution;
            }
        };

        self.navigable_regions = create_navigable_regions(regions.regions(), &self.parameters);
        if self.navigable_regions.is_empty() {
            return BodyPathPlanningResult::NoPathExists;
        }

        let inter_region_map =
            visibility_tools::create_inter_region_visibility_map(&self.navigable_regions, &self.parameters);
        let mut fallback_map: VisibilityMap = inter_region_map.visibility_map().clone();

        let start_point = self.start_pose.position;
        let goal_point = self.goal_pose.position;

        let start_map = match visibility_tools::create_single_source_visibility_map(
            &start_point,
            &self.navigable_regions,
            Some(&mut fallback_map),
        ) {
            Some(map) => map,
            None => {
                debug!("could not connect start point to the visibility graph");
                return BodyPathPlanningResult::NoPathExists;
            }
        };
        let goal_map = match visibility_tools::create_single_source_visibility_map(
            &goal_point,
            &self.navigable_regions,
            Some(&mut fallback_map),
        ) {
            Some(map) => map,
            None => {
                debug!("could not connect goal point to the visibility graph");
                return BodyPathPlanningResult::NoPathExists;
            }
        };

        // undirected adjacency over all maps
        let mut adjacency: HashMap<ConnectionPoint3D, Vec<(ConnectionPoint3D, f64)>> = HashMap::new();
        let mut add_edge = |a: ConnectionPoint3D, b: ConnectionPoint3D| {
            let length = a.distance(&b);
            adjacency.entry(a).or_default().push((b, length));
            adjacency.entry(b).or_default().push((a, length));
        };

        for region in &self.navigable_regions {
            for connection in region.visibility_map_in_world().connections() {
                add_edge(connection.source, connection.target);
            }
        }
        for connection in fallback_map.connections() {
            add_edge(connection.source, connection.target);
        }
        for connection in &start_map.connections {
            add_edge(connection.source, connection.target);
        }
        for connection in &goal_map.connections {
            add_edge(connection.source, connection.target);
        }

        let found = self.dijkstra(&adjacency, start_map.source, goal_map.source);

        if !found {
            debug!("visibility graph search exhausted without reaching the goal");
            return BodyPathPlanningResult::NoPathExists;
        }

        let path = self.reconstruct_path(start_map.source, goal_map.source);
        self.waypoints = self.to_pose_waypoints(&path);

        let post_processor = ObstacleAvoidanceProcessor::new(&self.parameters);
        post_processor.process(&mut self.waypoints, &self.navigable_regions);

        BodyPathPlanningResult::FoundSolution
    }

    /// Fallback when the goal is unreachable and best-effort plans are
    /// requested: path to the reachable vertex closest to the goal,
    /// truncated at the horizon distance.
    pub fn compute_best_effort_plan(&mut self, horizon_length: f64) {
        let goal_position = self.goal_pose.position;
        let closest = self
            .reachable_vertices
            .iter()
            .min_by(|a, b| {
                let da = a.0.distance_squared_to_point(&goal_position);
                let db = b.0.distance_squared_to_point(&goal_position);
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(vertex, _)| *vertex);

        let closest = match closest {
            Some(vertex) => vertex,
            None => {
                self.waypoints = vec![self.start_pose];
                return;
            }
        };

        let mut path = vec![closest];
        let mut current = closest;
        while let Some(previous) = self.predecessors.get(&current) {
            path.push(*previous);
            current = *previous;
        }
        path.reverse();

        // truncate at the horizon distance
        let mut truncated = Vec::new();
        let mut walked = 0.0;
        for window in path.windows(2) {
            if truncated.is_empty() {
                truncated.push(window[0]);
            }
            let step = window[0].distance(&window[1]);
            if walked + step > horizon_length {
                let alpha = ((horizon_length - walked) / step).clamp(0.0, 1.0);
                let end = window[0]
                    .position
                    .interpolate(&window[1].position, alpha);
                truncated.push(ConnectionPoint3D::new(end, window[1].region_id));
                break;
            }
            walked += step;
            truncated.push(window[1]);
        }
        if truncated.is_empty() {
            truncated = path;
        }

        self.waypoints = self.to_pose_waypoints(&truncated);
    }

    fn dijkstra(
        &mut self,
        adjacency: &HashMap<ConnectionPoint3D, Vec<(ConnectionPoint3D, f64)>>,
        start: ConnectionPoint3D,
        goal: ConnectionPoint3D,
    ) -> bool {
        let mut distances: HashMap<ConnectionPoint3D, f64> = HashMap::new();
        let mut heap: BinaryHeap<(std::cmp::Reverse<OrderedFloat<f64>>, ConnectionPoint3D)> =
            BinaryHeap::new();

        distances.insert(start, 0.0);
        heap.push((std::cmp::Reverse(OrderedFloat(0.0)), start));

        let mut found = false;
        while let Some((std::cmp::Reverse(OrderedFloat(cost)), vertex)) = heap.pop() {
            if distances.get(&vertex).map_or(true, |&d| cost > d + 1e-12) {
                continue; // stale queue entry
            }
            if vertex == goal {
                found = true;
                break;
            }
            let Some(neighbors) = adjacency.get(&vertex) else {
                continue;
            };
            for (neighbor, edge_length) in neighbors {
                let tentative = cost + edge_length;
                if distances
                    .get(neighbor)
                    .map_or(true, |&existing| tentative < existing)
                {
                    distances.insert(*neighbor, tentative);
                    self.predecessors.insert(*neighbor, vertex);
                    heap.push((std::cmp::Reverse(OrderedFloat(tentative)), *neighbor));
                }
            }
        }

        self.reachable_vertices = distances.into_iter().collect();
        found
    }

    fn reconstruct_path(
        &self,
        start: ConnectionPoint3D,
        goal: ConnectionPoint3D,
    ) -> Vec<ConnectionPoint3D> {
        let mut path = vec![goal];
        let mut current = goal;
        while current != start {
            match self.predecessors.get(&current) {
                Some(previous) => {
                    path.push(*previous);
                    current = *previous;
                }
                None => break,
            }
        }
        path.reverse();
        path
    }

    fn to_pose_waypoints(&self, path: &[ConnectionPoint3D]) -> Vec<Pose3D> {
        let mut poses = Vec::with_capacity(path.len());
        for (i, point) in path.iter().enumerate() {
            let heading = if i + 1 < path.len() {
                let next: &Point3D = &path[i + 1].position;
                (next.y - point.position.y).atan2(next.x - point.position.x)
            } else if i > 0 {
                let previous = &path[i - 1].position;
                (point.position.y - previous.y).atan2(point.position.x - previous.x)
            } else {
                self.goal_pose.yaw()
            };
            poses.push(Pose3D::from_xyz_yaw(
                point.position.x,
                point.position.y,
                point.position.z,
                heading,
            ));
        }
        poses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PlanarRegion;

    fn plan_over(
        regions: Vec<PlanarRegion>,
        start: (f64, f64),
        goal: (f64, f64),
    ) -> (BodyPathPlanningResult, Vec<Pose3D>) {
        let mut planner = VisibilityGraphPathPlanner::new(VisibilityGraphParameters::default());
        planner.set_planar_regions(Some(PlanarRegionsList::new(regions)));
        planner.set_stance_foot_poses(
            &Pose3D::from_xyz_yaw(start.0, start.1 + 0.1, 0.0, 0.0),
            &Pose3D::from_xyz_yaw(start.0, start.1 - 0.1, 0.0, 0.0),
        );
        planner.set_goal(&Pose3D::from_xyz_yaw(goal.0, goal.1, 0.0, 0.0));
        let result = planner.plan_waypoints();
        (result, planner.waypoints().to_vec())
    }

    #[test]
    fn test_straight_path_on_single_region() {
        let region = PlanarRegion::flat_square(1, 0.0, 0.0, 0.0, 8.0);
        let (result, waypoints) = plan_over(vec![region], (-3.0, 0.0), (3.0, 0.0));
        assert_eq!(result, BodyPathPlanningResult::FoundSolution);
        assert!(waypoints.len() >= 2);
        assert!(waypoints[0].position.x < waypoints.last().unwrap().position.x);
    }

    #[test]
    fn test_no_terrain_returns_straight_segment() {
        let mut planner = VisibilityGraphPathPlanner::new(VisibilityGraphParameters::default());
        planner.set_planar_regions(None);
        planner.set_stance_foot_poses(
            &Pose3D::from_xyz_yaw(0.0, 0.1, 0.0, 0.0),
            &Pose3D::from_xyz_yaw(0.0, -0.1, 0.0, 0.0),
        );
        planner.set_goal(&Pose3D::from_xyz_yaw(2.0, 0.0, 0.0, 0.0));
        assert_eq!(planner.plan_waypoints(), BodyPathPlanningResult::FoundSolution);
        assert_eq!(planner.waypoints().len(), 2);
    }

    #[test]
    fn test_disconnected_goal_region_fails() {
        let near = PlanarRegion::flat_square(1, 0.0, 0.0, 0.0, 2.0);
        let far = PlanarRegion::flat_square(2, 10.0, 0.0, 0.0, 2.0);
        let (result, _) = plan_over(vec![near, far], (0.0, 0.0), (10.0, 0.0));
        assert_eq!(result, BodyPathPlanningResult::NoPathExists);
    }

    #[test]
    fn test_best_effort_plan_stays_within_horizon() {
        let near = PlanarRegion::flat_square(1, 0.0, 0.0, 0.0, 4.0);
        let far = PlanarRegion::flat_square(2, 10.0, 0.0, 0.0, 2.0);
        let mut planner = VisibilityGraphPathPlanner::new(VisibilityGraphParameters::default());
        planner.set_planar_regions(Some(PlanarRegionsList::new(vec![near, far])));
        planner.set_stance_foot_poses(
            &Pose3D::from_xyz_yaw(0.0, 0.1, 0.0, 0.0),
            &Pose3D::from_xyz_yaw(0.0, -0.1, 0.0, 0.0),
        );
        planner.set_goal(&Pose3D::from_xyz_yaw(10.0, 0.0, 0.0, 0.0));
        assert_eq!(planner.plan_waypoints(), BodyPathPlanningResult::NoPathExists);

        planner.compute_best_effort_plan(1.0);
        let waypoints = planner.waypoints();
        assert!(!waypoints.is_empty());
        let mut length = 0.0;
        for pair in waypoints.windows(2) {
            length += pair[0].position.distance_xy(&pair[1].position);
        }
        assert!(length <= 1.0 + 1e-6);
    }
}
