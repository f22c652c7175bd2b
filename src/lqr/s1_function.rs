//! Value-function Hessian (S1) solvers, one shape per segment type.
//!
//! Contact segments with time-invariant cost use the stationary algebraic
//! solution; segments after a contact switch integrate the Riccati
//! differential equation backward in fixed steps; flight segments propagate
//! the terminal Hessian through the ballistic transition matrix.

use nalgebra::Matrix6;

use crate::common::{PlannerError, PlannerResult};
use crate::lqr::dynamics::LqrDynamics;

/// Piecewise value-function Hessian over one trajectory segment
pub trait S1Function {
    fn compute(&self, time_in_segment: f64) -> Matrix6<f64>;
}

/// Stationary solution of the continuous algebraic Riccati equation,
/// found by integrating the backward Riccati derivative to convergence
#[derive(Debug, Clone)]
pub struct AlgebraicS1Function {
    s1: Matrix6<f64>,
}

impl AlgebraicS1Function {
    const DT: f64 = 1.0e-3;
    const MAX_ITERATIONS: usize = 200_000;
    const CONVERGENCE: f64 = 1.0e-10;

    pub fn solve(dynamics: &LqrDynamics) -> PlannerResult<Self> {
        let mut s1 = *dynamics.q1();

        for _ in 0..Self::MAX_ITERATIONS {
            let derivative = dynamics.s1_dot(&s1);
            let update = derivative * Self::DT;
            s1 -= update;

            if update.amax() < Self::CONVERGENCE {
                if !s1.iter().all(|v| v.is_finite()) {
                    return Err(PlannerError::Numerical(
                        "stationary Riccati solution diverged".to_string(),
                    ));
                }
                return Ok(Self { s1 });
            }
        }

        Err(PlannerError::Numerical(
            "stationary Riccati iteration did not converge".to_string(),
        ))
    }
}

impl S1Function for AlgebraicS1Function {
    fn compute(&self, _time_in_segment: f64) -> Matrix6<f64> {
        self.s1
    }
}

/// Backward-Euler integration of the Riccati differential equation,
/// storing the trajectory for forward interpolation
#[derive(Debug, Clone)]
pub struct DifferentialS1Segment {
    dt: f64,
    /// S1 samples from segment start (index 0) to segment end
    trajectory: Vec<Matrix6<f64>>,
}

impl DifferentialS1Segment {
    pub fn new(dt: f64) -> Self {
        Self { dt, trajectory: Vec::new() }
    }

    /// Integrates backward from `s1_at_end` over `duration`
    pub fn set(
        &mut self,
        dynamics: &LqrDynamics,
        s1_at_end: Matrix6<f64>,
        duration: f64,
    ) -> PlannerResult<()> {
        self.trajectory.clear();
        self.trajectory.push(s1_at_end);

        let steps = (duration / self.dt).ceil() as usize;
        for _ in 0..steps {
            let previous = self.trajectory[self.trajectory.len() - 1];
            let next = previous - dynamics.s1_dot(&previous) * self.dt;
            if !next.iter().all(|v| v.is_finite()) {
                return Err(PlannerError::Numerical(
                    "Riccati backward integration produced non-finite values".to_string(),
                ));
            }
            self.trajectory.push(next);
        }

        self.trajectory.reverse();
        Ok(())
    }
}

impl S1Function for DifferentialS1Segment {
    fn compute(&self, time_in_segment: f64) -> Matrix6<f64> {
        if self.trajectory.is_empty() {
            return Matrix6::zeros();
        }
        let last = self.trajectory.len() - 1;
        let position = (time_in_segment / self.dt).max(0.0);
        let index = (position.floor() as usize).min(last);
        if index >= last {
            return self.trajectory[last];
        }
        let alpha = position - index as f64;
        self.trajectory[index] * (1.0 - alpha) + self.trajectory[index + 1] * alpha
    }
}

/// Hessian propagation through a flight phase: with no control authority
/// the state follows the ballistic transition matrix Phi, and
/// S1(t) = Phi' S1_end Phi
#[derive(Debug, Clone)]
pub struct FlightS1Function {
    s1_at_end: Matrix6<f64>,
    duration: f64,
}

impl FlightS1Function {
    pub fn new(s1_at_end: Matrix6<f64>, duration: f64) -> Self {
        Self { s1_at_end, duration }
    }
}

/// Ballistic state transition over `dt`: [I, dt I; 0, I]
pub fn flight_transition_matrix(dt: f64) -> Matrix6<f64> {
    let mut phi = Matrix6::identity();
    for i in 0..3 {
        phi[(i, i + 3)] = dt;
    }
    phi
}

impl S1Function for FlightS1Function {
    fn compute(&self, time_in_segment: f64) -> Matrix6<f64> {
        let remaining = (self.duration - time_in_segment).max(0.0);
        let phi = flight_transition_matrix(remaining);
        phi.transpose() * self.s1_at_end * phi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dynamics() -> LqrDynamics {
        LqrDynamics::new(3.2).unwrap()
    }

    #[test]
    fn test_algebraic_solution_is_stationary() {
        let dynamics = dynamics();
        let algebraic = AlgebraicS1Function::solve(&dynamics).unwrap();
        let s1 = algebraic.compute(0.0);
        // at the stationary solution the Riccati derivative vanishes
        assert!(dynamics.s1_dot(&s1).amax() < 1e-6);
        // the Hessian of a positive-definite cost is symmetric
        assert!((s1 - s1.transpose()).amax() < 1e-8);
    }

    #[test]
    fn test_algebraic_and_differential_solutions_agree() {
        let dynamics = dynamics();
        let algebraic = AlgebraicS1Function::solve(&dynamics).unwrap();
        let stationary = algebraic.compute(0.0);

        // seeding the differential recursion with the stationary terminal
        // condition must reproduce the algebraic solution at every sample
        let mut differential = DifferentialS1Segment::new(1.0e-4);
        differential.set(&dynamics, stationary, 0.5).unwrap();

        for &time in &[0.0, 0.1, 0.25, 0.5] {
            let difference = (differential.compute(time) - stationary).amax();
            let scale = stationary.amax();
            assert!(
                difference / scale < 1.0e-3,
                "relative difference {} at t = {}",
                difference / scale,
                time
            );
        }
    }

    #[test]
    fn test_differential_matches_terminal_condition() {
        let dynamics = dynamics();
        let terminal = *dynamics.q1();
        let mut differential = DifferentialS1Segment::new(1.0e-3);
        differential.set(&dynamics, terminal, 0.3).unwrap();
        assert!((differential.compute(0.3) - terminal).amax() < 1e-9);
    }

    #[test]
    fn test_flight_function_at_zero_remaining_time() {
        let terminal = Matrix6::identity() * 2.0;
        let flight = FlightS1Function::new(terminal, 0.4);
        assert!((flight.compute(0.4) - terminal).amax() < 1e-12);
        // earlier in flight the position block grows with the transition
        let earlier = flight.compute(0.0);
        assert!(earlier[(0, 3)].abs() > 0.0);
    }
}
