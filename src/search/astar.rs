//! A* search over the footstep graph.
//!
//! Priority-queue search over expanded footstep nodes with composed
//! feasibility checking, composed edge costs, cooperative halting, a
//! wall-clock timeout and buffered iteration diagnostics.

use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::debug;
use ordered_float::OrderedFloat;

use crate::checkers::{CheckerOfCheckers, FootstepNodeChecker, RejectionReason};
use crate::common::{Pose3D, SideDependent};
use crate::geometry::PlanarRegionsList;
use crate::graph::{FootstepGraph, FootstepNode, GraphEdge};
use crate::planner::output::FootstepPlanningResult;
use crate::planner::parameters::FootstepPlannerParameters;
use crate::search::cost::{CompositeFootstepCost, FootstepCost};
use crate::search::expansion::ParameterBasedNodeExpansion;
use crate::search::heuristics::FootstepHeuristics;
use crate::snapping::FootstepSnapper;
use crate::utils::Stopwatch;

/// Diagnostic record for one search iteration
#[derive(Debug, Clone)]
pub struct FootstepPlannerIterationData {
    pub iteration: usize,
    pub stance_node: FootstepNode,
    pub expanded_edges: Vec<GraphEdge>,
    pub valid_children: usize,
}

/// Diagnostic record attached to one expanded edge
#[derive(Debug, Clone, Copy)]
pub struct FootstepPlannerEdgeData {
    pub edge_cost: Option<f64>,
    pub rejection_reason: Option<RejectionReason>,
}

/// Search result plus the node path it terminated with
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub result: FootstepPlanningResult,
    pub path: Vec<FootstepNode>,
    pub iterations: usize,
}

type IterationCallback = Box<dyn Fn(&FootstepPlannerIterationData) + Send>;

/// A* footstep planner
pub struct AStarFootstepPlanner {
    parameters: FootstepPlannerParameters,
    snapper: Box<dyn FootstepSnapper>,
    checker: CheckerOfCheckers,
    expansion: ParameterBasedNodeExpansion,
    cost: CompositeFootstepCost,
    graph: FootstepGraph,
    edge_data: HashMap<GraphEdge, FootstepPlannerEdgeData>,
    iteration_data: Vec<FootstepPlannerIterationData>,
    iteration_callbacks: Vec<IterationCallback>,
    halt_requested: Arc<AtomicBool>,
    end_node: Option<FootstepNode>,
}

impl AStarFootstepPlanner {
    pub fn new(
        parameters: FootstepPlannerParameters,
        snapper: Box<dyn FootstepSnapper>,
        checker: CheckerOfCheckers,
    ) -> Self {
        let expansion = ParameterBasedNodeExpansion::new(&parameters);
        let cost = CompositeFootstepCost::default_stack(&parameters);
        Self {
            parameters,
            snapper,
            checker,
            expansion,
            cost,
            graph: FootstepGraph::default(),
            edge_data: HashMap::new(),
            iteration_data: Vec::new(),
            iteration_callbacks: Vec::new(),
            halt_requested: Arc::new(AtomicBool::new(false)),
            end_node: None,
        }
    }

    pub fn set_planar_regions(&mut self, regions: Option<PlanarRegionsList>) {
        self.snapper.set_planar_regions(regions.clone());
        self.checker.set_planar_regions(regions);
    }

    pub fn add_iteration_callback(&mut self, callback: IterationCallback) {
        self.iteration_callbacks.push(callback);
    }

    /// Shared halt flag; polled once per iteration, so halting takes
    /// effect at the next iteration boundary
    pub fn halt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.halt_requested)
    }

    pub fn halt(&self) {
        self.halt_requested.store(true, Ordering::Relaxed);
    }

    pub fn snapper_mut(&mut self) -> &mut dyn FootstepSnapper {
        self.snapper.as_mut()
    }

    pub fn edge_data(&self) -> &HashMap<GraphEdge, FootstepPlannerEdgeData> {
        &self.edge_data
    }

    pub fn iteration_data(&self) -> &[FootstepPlannerIterationData] {
        &self.iteration_data
    }

    pub fn end_node(&self) -> Option<FootstepNode> {
        self.end_node
    }

    /// Runs the search. `start_nodes` seeds the open set with both feet at
    /// cost zero; the search terminates when a popped node equals the goal
    /// node of its side, the open set empties, the timeout expires or a
    /// halt is requested.
    #[allow(clippy::too_many_arguments)]
    pub fn plan(
        &mut self,
        start_nodes: SideDependent<FootstepNode>,
        goal_nodes: SideDependent<FootstepNode>,
        goal_mid_pose: &Pose3D,
        heuristics: &dyn FootstepHeuristics,
        timeout_seconds: f64,
        return_best_effort: bool,
    ) -> SearchOutcome {
        self.halt_requested.store(false, Ordering::Relaxed);
        self.snapper.reset();
        self.edge_data.clear();
        self.iteration_data.clear();
        self.end_node = None;

        // both feet seed the search as independent zero-cost roots
        self.graph.initialize(start_nodes.left);
        self.graph.add_root(start_nodes.right);
        let mut open: BinaryHeap<(std::cmp::Reverse<OrderedFloat<f64>>, FootstepNode)> =
            BinaryHeap::new();
        let mut expanded: HashSet<FootstepNode> = HashSet::new();

        let stopwatch = Stopwatch::start();
        let mut result = FootstepPlanningResult::NoPathExists;
        let mut iterations = 0usize;
        let mut best_effort: Option<(f64, FootstepNode)> = None;
        let mut flush_mark = 0.0;
        let mut flushed_through = 0usize;

        open.push((
            std::cmp::Reverse(OrderedFloat(heuristics.compute(&start_nodes.left, goal_mid_pose))),
            start_nodes.left,
        ));
        open.push((
            std::cmp::Reverse(OrderedFloat(heuristics.compute(
                &start_nodes.right,
                goal_mid_pose,
            ))),
            start_nodes.right,
        ));

        while let Some((_, stance)) = open.pop() {
            if expanded.contains(&stance) {
                continue;
            }

            if self.halt_requested.load(Ordering::Relaxed) {
                result = FootstepPlanningResult::Halted;
                break;
            }
            if stopwatch.total_elapsed() > timeout_seconds {
                result = FootstepPlanningResult::TimedOut;
                break;
            }

            if stance == *goal_nodes.get(stance.side()) {
                self.end_node = Some(stance);
                result = FootstepPlanningResult::FoundSolution;
                break;
            }

            expanded.insert(stance);
            iterations += 1;

            let children = self.expansion.expand(&stance);
            let mut expanded_edges = Vec::with_capacity(children.len());
            let mut valid_children = 0usize;

            for child in children {
                let edge = GraphEdge::new(stance, child);
                expanded_edges.push(edge);

                match self.checker.check(&child, Some(&stance), self.snapper.as_mut()) {
                    Err(reason) => {
                        self.edge_data.insert(
                            edge,
                            FootstepPlannerEdgeData {
                                edge_cost: None,
                                rejection_reason: Some(reason),
                            },
                        );
                    }
                    Ok(()) => {
                        valid_children += 1;
                        let edge_cost =
                            self.cost.compute(&stance, &child, self.snapper.as_mut());
                        self.edge_data.insert(
                            edge,
                            FootstepPlannerEdgeData {
                                edge_cost: Some(edge_cost),
                                rejection_reason: None,
                            },
                        );

                        if let Some(new_cost) =
                            self.graph.check_and_set_edge(&stance, &child, edge_cost)
                        {
                            let estimate = heuristics.compute(&child, goal_mid_pose);
                            if best_effort.map_or(true, |(best, _)| estimate < best) {
                                best_effort = Some((estimate, child));
                            }
                            open.push((
                                std::cmp::Reverse(OrderedFloat(new_cost + estimate)),
                                child,
                            ));
                        }
                    }
                }
            }

            self.iteration_data.push(FootstepPlannerIterationData {
                iteration: iterations,
                stance_node: stance,
                expanded_edges,
                valid_children,
            });

            // flush buffered diagnostics at a bounded period, not per
            // iteration
            if stopwatch.total_elapsed() - flush_mark > self.parameters.status_publish_period {
                self.flush_iteration_callbacks(&mut flushed_through);
                flush_mark = stopwatch.total_elapsed();
            }
        }

        self.flush_iteration_callbacks(&mut flushed_through);

        if result == FootstepPlanningResult::FoundSolution {
            if let Some(end_node) = self.end_node {
                self.append_square_up_step(end_node, goal_nodes);
            }
            let path = self
                .end_node
                .map(|node| self.graph.path_from_start(&node))
                .unwrap_or_default();
            debug!("search found a solution in {} iterations", iterations);
            return SearchOutcome { result, path, iterations };
        }

        if return_best_effort {
            if let Some((_, best_node)) = best_effort {
                let path = self.graph.path_from_start(&best_node);
                self.end_node = Some(best_node);
                debug!(
                    "search terminated with {:?} after {} iterations, returning best effort",
                    result, iterations
                );
                return SearchOutcome { result, path, iterations };
            }
        }

        debug!("search terminated with {:?} after {} iterations", result, iterations);
        SearchOutcome { result, path: Vec::new(), iterations }
    }

    /// After reaching one goal foot, square up with the opposite foot when
    /// that final placement is feasible
    fn append_square_up_step(
        &mut self,
        end_node: FootstepNode,
        goal_nodes: SideDependent<FootstepNode>,
    ) {
        let opposite_goal = *goal_nodes.get(end_node.side().opposite());
        if self
            .checker
            .check(&opposite_goal, Some(&end_node), self.snapper.as_mut())
            .is_ok()
        {
            let edge_cost = self
                .cost
                .compute(&end_node, &opposite_goal, self.snapper.as_mut());
            if self
                .graph
                .check_and_set_edge(&end_node, &opposite_goal, edge_cost)
                .is_some()
            {
                self.end_node = Some(opposite_goal);
            }
        }
    }

    fn flush_iteration_callbacks(&self, flushed_through: &mut usize) {
        for record in &self.iteration_data[*flushed_through..] {
            for callback in &self.iteration_callbacks {
                callback(record);
            }
        }
        *flushed_through = self.iteration_data.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkers::SnapBasedChecker;
    use crate::common::{RobotSide, SideDependent};
    use crate::geometry::ConvexPolygon2D;
    use crate::search::heuristics::DistanceAndYawHeuristics;
    use crate::snapping::FlatGroundSnapper;

    fn flat_planner(parameters: FootstepPlannerParameters) -> AStarFootstepPlanner {
        let foot_polygons = SideDependent::both(ConvexPolygon2D::rectangle(0.22, 0.11));
        let snapper = Box::new(FlatGroundSnapper::new(foot_polygons));
        let checker =
            CheckerOfCheckers::new(vec![Box::new(SnapBasedChecker::new(&parameters))]);
        AStarFootstepPlanner::new(parameters, snapper, checker)
    }

    fn start_nodes() -> SideDependent<FootstepNode> {
        SideDependent::new(
            FootstepNode::new(0.0, 0.1, 0.0, RobotSide::Left),
            FootstepNode::new(0.0, -0.1, 0.0, RobotSide::Right),
        )
    }

    fn goal_nodes_at(x: f64) -> SideDependent<FootstepNode> {
        SideDependent::new(
            FootstepNode::new(x, 0.1, 0.0, RobotSide::Left),
            FootstepNode::new(x, -0.1, 0.0, RobotSide::Right),
        )
    }

    #[test]
    fn test_search_reaches_goal_on_flat_ground() {
        let parameters = FootstepPlannerParameters::default();
        let heuristics = DistanceAndYawHeuristics::new(&parameters);
        let mut planner = flat_planner(parameters);

        let outcome = planner.plan(
            start_nodes(),
            goal_nodes_at(1.2),
            &Pose3D::from_xyz_yaw(1.2, 0.0, 0.0, 0.0),
            &heuristics,
            10.0,
            false,
        );

        assert_eq!(outcome.result, FootstepPlanningResult::FoundSolution);
        assert!(outcome.path.len() >= 4);
        // steps alternate sides
        for pair in outcome.path.windows(2) {
            assert_ne!(pair[0].side(), pair[1].side());
        }
    }

    #[test]
    fn test_search_with_admissible_weight_finds_minimum_step_plan() {
        let mut parameters = FootstepPlannerParameters::default();
        parameters.astar_heuristics_weight = 1.0;
        // make the per-step cost dominate so minimum cost = minimum steps,
        // and the distance heuristic underestimates it
        parameters.cost_per_step = 1.0;
        let heuristics = DistanceAndYawHeuristics::with_weight(&parameters, 1.0);
        let mut planner = flat_planner(parameters.clone());

        // goal 1.2 m ahead; max step length 0.4 m means at least 3
        // advancing steps, plus the square-up step at the goal
        let outcome = planner.plan(
            start_nodes(),
            goal_nodes_at(1.2),
            &Pose3D::from_xyz_yaw(1.2, 0.0, 0.0, 0.0),
            &heuristics,
            10.0,
            false,
        );

        assert_eq!(outcome.result, FootstepPlanningResult::FoundSolution);
        let steps = outcome.path.len() - 1; // first entry is a start node
        let minimum_advancing_steps =
            (1.2 / parameters.max_step_length).ceil() as usize;
        assert_eq!(steps, minimum_advancing_steps + 1);
    }

    #[test]
    fn test_halt_stops_search() {
        // flush every iteration so the callback can set the halt flag early
        let mut parameters = FootstepPlannerParameters::default();
        parameters.status_publish_period = 0.0;
        let heuristics = DistanceAndYawHeuristics::new(&parameters);
        let mut planner = flat_planner(parameters);

        let halt_flag = planner.halt_flag();
        planner.add_iteration_callback(Box::new(move |_| {
            halt_flag.store(true, Ordering::Relaxed);
        }));

        let outcome = planner.plan(
            start_nodes(),
            goal_nodes_at(50.0),
            &Pose3D::from_xyz_yaw(50.0, 0.0, 0.0, 0.0),
            &heuristics,
            10.0,
            false,
        );
        assert_eq!(outcome.result, FootstepPlanningResult::Halted);
    }

    #[test]
    fn test_timeout_returns_best_effort_when_requested() {
        let parameters = FootstepPlannerParameters::default();
        let heuristics = DistanceAndYawHeuristics::new(&parameters);
        let mut planner = flat_planner(parameters);

        let outcome = planner.plan(
            start_nodes(),
            goal_nodes_at(100.0),
            &Pose3D::from_xyz_yaw(100.0, 0.0, 0.0, 0.0),
            &heuristics,
            0.05,
            true,
        );

        assert_eq!(outcome.result, FootstepPlanningResult::TimedOut);
        assert!(!outcome.path.is_empty());
    }

    #[test]
    fn test_iteration_diagnostics_recorded() {
        let parameters = FootstepPlannerParameters::default();
        let heuristics = DistanceAndYawHeuristics::new(&parameters);
        let mut planner = flat_planner(parameters);

        planner.plan(
            start_nodes(),
            goal_nodes_at(0.6),
            &Pose3D::from_xyz_yaw(0.6, 0.0, 0.0, 0.0),
            &heuristics,
            10.0,
            false,
        );

        assert!(!planner.iteration_data().is_empty());
        assert!(!planner.edge_data().is_empty());
        let first = &planner.iteration_data()[0];
        assert!(first.valid_children > 0);
        assert!(!first.expanded_edges.is_empty());
    }
}
