//! Visibility graph primitives over planar terrain regions.
//!
//! Builds, per planning call, a graph of mutually visible points across
//! navigable terrain: per-region clusters and local maps, inter-region
//! connections, and single-source hookups for the start and goal.

pub mod cluster;
pub mod connection;
pub mod navigable_region;
pub mod parameters;
pub mod visibility_map;
pub mod visibility_tools;

pub use cluster::{Cluster, ClusterType};
pub use connection::{Connection, ConnectionPoint3D};
pub use navigable_region::{create_navigable_regions, NavigableRegion};
pub use parameters::VisibilityGraphParameters;
pub use visibility_map::{InterRegionVisibilityMap, SingleSourceVisibilityMap, VisibilityMap};
