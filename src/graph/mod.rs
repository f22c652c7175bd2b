//! Footstep node lattice and search graph structures.

pub mod footstep_graph;
pub mod footstep_node;

pub use footstep_graph::FootstepGraph;
pub use footstep_node::{FootstepNode, GraphEdge, GRID_SIZE_XY, GRID_SIZE_YAW, YAW_DIVISIONS};
