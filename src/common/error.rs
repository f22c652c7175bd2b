//! Error types for the footstep planner.
//!
//! Expected planning outcomes (no path, timeout, node rejection) are result
//! codes, not errors; `PlannerError` is reserved for malformed input and
//! numerical faults. The planning facade catches every `PlannerError` at its
//! outermost boundary and converts it into an `Exception` output.

use thiserror::Error;

/// Fault type for the planning pipeline.
#[derive(Debug, Error)]
pub enum PlannerError {
    /// Malformed request (missing pose, empty terrain when terrain required)
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Numerical computation failed (singular matrix, non-finite entries)
    #[error("numerical error: {0}")]
    Numerical(String),
    /// Degenerate geometry (empty polygon, zero-length axis)
    #[error("geometry error: {0}")]
    Geometry(String),
}

/// Result type alias for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PlannerError::InvalidRequest("missing start pose".to_string());
        assert_eq!(format!("{}", err), "invalid request: missing start pose");
    }
}
