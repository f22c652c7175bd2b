//! Small shared utilities.

pub mod stopwatch;

pub use stopwatch::Stopwatch;
