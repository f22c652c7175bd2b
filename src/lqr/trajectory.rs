//! Polynomial reference trajectories and contact states for the tracking
//! controller.

use nalgebra::Vector3;

/// Whether the robot can push on the ground during a trajectory segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactState {
    InContact,
    Flight,
}

impl ContactState {
    pub fn is_load_bearing(&self) -> bool {
        matches!(self, ContactState::InContact)
    }
}

/// Cubic 3D polynomial over one time segment: p(t) = c0 + c1 t + c2 t^2 + c3 t^3
#[derive(Debug, Clone)]
pub struct Polynomial3D {
    coefficients: [Vector3<f64>; 4],
    duration: f64,
}

impl Polynomial3D {
    pub fn new(coefficients: [Vector3<f64>; 4], duration: f64) -> Self {
        Self { coefficients, duration }
    }

    /// Segment holding a constant position
    pub fn constant(position: Vector3<f64>, duration: f64) -> Self {
        Self {
            coefficients: [position, Vector3::zeros(), Vector3::zeros(), Vector3::zeros()],
            duration,
        }
    }

    /// Linear interpolation from `start` to `end` over `duration`
    pub fn linear(start: Vector3<f64>, end: Vector3<f64>, duration: f64) -> Self {
        let slope = if duration > 1e-12 {
            (end - start) / duration
        } else {
            Vector3::zeros()
        };
        Self {
            coefficients: [start, slope, Vector3::zeros(), Vector3::zeros()],
            duration,
        }
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn coefficient(&self, order: usize) -> Vector3<f64> {
        self.coefficients[order]
    }

    pub fn num_coefficients(&self) -> usize {
        self.coefficients.len()
    }

    pub fn position(&self, time: f64) -> Vector3<f64> {
        let t = time.clamp(0.0, self.duration);
        self.coefficients[0]
            + self.coefficients[1] * t
            + self.coefficients[2] * (t * t)
            + self.coefficients[3] * (t * t * t)
    }

    pub fn final_position(&self) -> Vector3<f64> {
        self.position(self.duration)
    }

    /// Same trajectory shifted by a constant offset
    pub fn offset_by(&self, offset: Vector3<f64>) -> Polynomial3D {
        let mut coefficients = self.coefficients;
        coefficients[0] += offset;
        Self { coefficients, duration: self.duration }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_trajectory_endpoints() {
        let start = Vector3::new(0.0, 0.0, 1.0);
        let end = Vector3::new(0.5, -0.1, 1.0);
        let trajectory = Polynomial3D::linear(start, end, 0.8);
        assert!((trajectory.position(0.0) - start).norm() < 1e-12);
        assert!((trajectory.final_position() - end).norm() < 1e-12);
    }

    #[test]
    fn test_offset_shifts_uniformly() {
        let trajectory = Polynomial3D::linear(Vector3::zeros(), Vector3::x(), 1.0);
        let shifted = trajectory.offset_by(-Vector3::x());
        assert!((shifted.final_position()).norm() < 1e-12);
        assert!((shifted.position(0.0) + Vector3::x()).norm() < 1e-12);
    }
}
