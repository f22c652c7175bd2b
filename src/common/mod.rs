//! Common types and error definitions for the footstep planner.

pub mod error;
pub mod types;

pub use error::*;
pub use types::*;
