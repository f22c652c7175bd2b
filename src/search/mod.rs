//! A* footstep search: expansion, costs, heuristics and the search loop.

pub mod astar;
pub mod cost;
pub mod expansion;
pub mod heuristics;

pub use astar::{
    AStarFootstepPlanner, FootstepPlannerEdgeData, FootstepPlannerIterationData, SearchOutcome,
};
pub use cost::{CompositeFootstepCost, FootstepCost};
pub use expansion::ParameterBasedNodeExpansion;
pub use heuristics::{BodyPathHeuristics, DistanceAndYawHeuristics, FootstepHeuristics};
