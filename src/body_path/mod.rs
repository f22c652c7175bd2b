//! Coarse body-path planning over the terrain visibility graph.

pub mod plan;
pub mod planner;
pub mod post_processor;

pub use plan::{BodyPathPlan, BodyPathPlanningResult};
pub use planner::VisibilityGraphPathPlanner;
pub use post_processor::ObstacleAvoidanceProcessor;
