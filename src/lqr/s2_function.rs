//! Value-function gradient (s2) solvers, one shape per segment type.
//!
//! With the Hessian stationary inside a contact segment, the gradient obeys
//! s2_dot = A2 s2 + B2 y_d. Against a polynomial reference the solution has
//! the closed form exp(A2 t) alpha + sum(beta_i t^i); segments with a
//! time-varying Hessian are integrated backward instead, and flight
//! segments propagate through the ballistic transition with gravity drift.

use nalgebra::{Matrix6, Matrix6x3, Vector3, Vector6};

use crate::common::{PlannerError, PlannerResult};
use crate::lqr::dynamics::LqrDynamics;
use crate::lqr::s1_function::{flight_transition_matrix, S1Function};
use crate::lqr::trajectory::Polynomial3D;

/// Piecewise value-function gradient over one trajectory segment
pub trait S2Function {
    fn compute(&self, time_in_segment: f64) -> Vector6<f64>;
}

/// Closed-form gradient over one polynomial segment:
/// s2(t) = exp(A2 t) alpha + sum_i beta_i t^i
#[derive(Debug, Clone)]
pub struct AlgebraicS2Segment {
    a2: Matrix6<f64>,
    alpha: Vector6<f64>,
    betas: Vec<Vector6<f64>>,
}

impl AlgebraicS2Segment {
    /// Solves the segment against its terminal value. The beta recurrence
    /// matches polynomial powers of the forcing; alpha absorbs the boundary
    /// condition at the segment end.
    pub fn solve(
        s2_at_end: &Vector6<f64>,
        trajectory: &Polynomial3D,
        a2: &Matrix6<f64>,
        b2: &Matrix6x3<f64>,
    ) -> PlannerResult<Self> {
        let a2_inverse = a2.try_inverse().ok_or_else(|| {
            PlannerError::Numerical("closed-loop gradient dynamics are singular".to_string())
        })?;

        let order = trajectory.num_coefficients() - 1;
        let mut betas = vec![Vector6::zeros(); order + 1];
        betas[order] = -a2_inverse * b2 * trajectory.coefficient(order);
        for i in (0..order).rev() {
            let successor = betas[i + 1] * (i as f64 + 1.0);
            betas[i] = a2_inverse * (successor - b2 * trajectory.coefficient(i));
        }

        let duration = trajectory.duration();
        let mut particular_at_end = Vector6::zeros();
        let mut power = 1.0;
        for beta in &betas {
            particular_at_end += beta * power;
            power *= duration;
        }

        let alpha = (a2 * (-duration)).exp() * (s2_at_end - particular_at_end);

        Ok(Self { a2: *a2, alpha, betas })
    }

    pub fn alpha(&self) -> &Vector6<f64> {
        &self.alpha
    }

    pub fn beta(&self, order: usize) -> &Vector6<f64> {
        &self.betas[order]
    }

    /// Gradient value at the segment start
    pub fn value_at_start(&self) -> Vector6<f64> {
        self.alpha + self.betas[0]
    }
}

impl S2Function for AlgebraicS2Segment {
    fn compute(&self, time_in_segment: f64) -> Vector6<f64> {
        let mut value = (self.a2 * time_in_segment).exp() * self.alpha;
        let mut power = 1.0;
        for beta in &self.betas {
            value += beta * power;
            power *= time_in_segment;
        }
        value
    }
}

/// Closed-form gradient chained backward across a run of contact segments
#[derive(Debug, Clone, Default)]
pub struct AlgebraicS2Function {
    segments: Vec<AlgebraicS2Segment>,
}

impl AlgebraicS2Function {
    /// Solves all segments last-to-first, each terminal condition being the
    /// following segment's value at its start
    pub fn solve(
        s2_at_end: &Vector6<f64>,
        trajectories: &[Polynomial3D],
        a2: &Matrix6<f64>,
        b2: &Matrix6x3<f64>,
    ) -> PlannerResult<Self> {
        let mut segments: Vec<Option<AlgebraicS2Segment>> = vec![None; trajectories.len()];
        let mut boundary = *s2_at_end;

        for j in (0..trajectories.len()).rev() {
            let segment = AlgebraicS2Segment::solve(&boundary, &trajectories[j], a2, b2)?;
            boundary = segment.value_at_start();
            segments[j] = Some(segment);
        }

        Ok(Self {
            segments: segments.into_iter().flatten().collect(),
        })
    }

    pub fn segment(&self, index: usize) -> &AlgebraicS2Segment {
        &self.segments[index]
    }

    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }
}

impl S2Function for AlgebraicS2Function {
    fn compute(&self, time_in_segment: f64) -> Vector6<f64> {
        self.segments[0].compute(time_in_segment)
    }
}

/// Backward-integrated gradient for segments whose Hessian varies in time
#[derive(Debug, Clone)]
pub struct DifferentialS2Segment {
    dt: f64,
    trajectory: Vec<Vector6<f64>>,
}

impl DifferentialS2Segment {
    pub fn new(dt: f64) -> Self {
        Self { dt, trajectory: Vec::new() }
    }

    pub fn set(
        &mut self,
        s1_function: &dyn S1Function,
        vrp_trajectory: &Polynomial3D,
        dynamics: &LqrDynamics,
        s2_at_end: Vector6<f64>,
    ) -> PlannerResult<()> {
        self.trajectory.clear();
        self.trajectory.push(s2_at_end);

        let duration = vrp_trajectory.duration();
        let steps = (duration / self.dt).ceil() as usize;
        for k in 0..steps {
            let time = duration - k as f64 * self.dt;
            let s1 = s1_function.compute(time);
            let (a2, b2) = dynamics.gradient_dynamics(&s1);

            let current = self.trajectory[self.trajectory.len() - 1];
            let derivative = a2 * current + b2 * vrp_trajectory.position(time);
            let previous = current - derivative * self.dt;
            if !previous.iter().all(|v| v.is_finite()) {
                return Err(PlannerError::Numerical(
                    "gradient backward integration produced non-finite values".to_string(),
                ));
            }
            self.trajectory.push(previous);
        }

        self.trajectory.reverse();
        Ok(())
    }
}

impl S2Function for DifferentialS2Segment {
    fn compute(&self, time_in_segment: f64) -> Vector6<f64> {
        if self.trajectory.is_empty() {
            return Vector6::zeros();
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

/// Gradient propagation through a flight phase with gravity drift:
/// s2(t) = Phi' (2 S1_end gamma + s2_end)
#[derive(Debug, Clone)]
pub struct FlightS2Function {
    gravity_z: f64,
    s1_at_end: Matrix6<f64>,
    s2_at_end: Vector6<f64>,
    duration: f64,
}

impl FlightS2Function {
    pub fn new(
        gravity_z: f64,
        s1_at_end: Matrix6<f64>,
        s2_at_end: Vector6<f64>,
        duration: f64,
    ) -> Self {
        Self { gravity_z, s1_at_end, s2_at_end, duration }
    }
}

impl S2Function for FlightS2Function {
    fn compute(&self, time_in_segment: f64) -> Vector6<f64> {
        let remaining = (self.duration - time_in_segment).max(0.0);
        let phi = flight_transition_matrix(remaining);

        let drift = Vector3::new(0.0, 0.0, self.gravity_z);
        let mut gamma = Vector6::zeros();
        gamma.fixed_rows_mut::<3>(0).copy_from(&(drift * (0.5 * remaining * remaining)));
        gamma.fixed_rows_mut::<3>(3).copy_from(&(drift * remaining));

        phi.transpose() * (2.0 * self.s1_at_end * gamma + self.s2_at_end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lqr::s1_function::AlgebraicS1Function;

    fn gradient_dynamics() -> (LqrDynamics, Matrix6<f64>, Matrix6x3<f64>) {
        let dynamics = LqrDynamics::new(3.2).unwrap();
        let s1 = AlgebraicS1Function::solve(&dynamics).unwrap().compute(0.0);
        let (a2, b2) = dynamics.gradient_dynamics(&s1);
        (dynamics, a2, b2)
    }

    #[test]
    fn test_algebraic_segment_matches_terminal_condition() {
        let (_, a2, b2) = gradient_dynamics();
        let trajectory =
            Polynomial3D::linear(Vector3::new(0.2, 0.0, 0.0), Vector3::zeros(), 0.8);
        let terminal = Vector6::zeros();
        let segment = AlgebraicS2Segment::solve(&terminal, &trajectory, &a2, &b2).unwrap();
        assert!((segment.compute(0.8) - terminal).amax() < 1e-8);
    }

    #[test]
    fn test_algebraic_segment_satisfies_the_gradient_ode() {
        let (_, a2, b2) = gradient_dynamics();
        let trajectory =
            Polynomial3D::linear(Vector3::new(0.3, -0.1, 0.0), Vector3::new(0.1, 0.0, 0.0), 1.0);
        let terminal = Vector6::zeros();
        let segment = AlgebraicS2Segment::solve(&terminal, &trajectory, &a2, &b2).unwrap();

        let h = 1.0e-6;
        for &t in &[0.2, 0.5, 0.8] {
            let numeric = (segment.compute(t + h) - segment.compute(t - h)) / (2.0 * h);
            let analytic = a2 * segment.compute(t) + b2 * trajectory.position(t);
            assert!(
                (numeric - analytic).amax() < 1e-3,
                "ODE residual {} at t = {}",
                (numeric - analytic).amax(),
                t
            );
        }
    }

    #[test]
    fn test_chained_function_is_continuous_across_segments() {
        let (_, a2, b2) = gradient_dynamics();
        let trajectories = vec![
            Polynomial3D::linear(Vector3::new(0.4, 0.0, 0.0), Vector3::new(0.2, 0.1, 0.0), 0.6),
            Polynomial3D::linear(Vector3::new(0.2, 0.1, 0.0), Vector3::zeros(), 0.6),
        ];
        let terminal = Vector6::zeros();
        let function =
            AlgebraicS2Function::solve(&terminal, &trajectories, &a2, &b2).unwrap();

        let end_of_first = function.segment(0).compute(0.6);
        let start_of_second = function.segment(1).compute(0.0);
        assert!((end_of_first - start_of_second).amax() < 1e-8);
    }

    #[test]
    fn test_differential_segment_tracks_algebraic_solution() {
        let (dynamics, a2, b2) = gradient_dynamics();
        let s1 = AlgebraicS1Function::solve(&dynamics).unwrap();
        let trajectory =
            Polynomial3D::linear(Vector3::new(0.2, 0.0, 0.0), Vector3::zeros(), 0.5);
        let terminal = Vector6::zeros();

        let algebraic = AlgebraicS2Segment::solve(&terminal, &trajectory, &a2, &b2).unwrap();
        let mut differential = DifferentialS2Segment::new(1.0e-4);
        differential
            .set(&s1, &trajectory, &dynamics, terminal)
            .unwrap();

        for &t in &[0.0, 0.2, 0.4] {
            let difference = (differential.compute(t) - algebraic.compute(t)).amax();
            assert!(difference < 1e-2, "difference {} at t = {}", difference, t);
        }
    }

    #[test]
    fn test_flight_function_reduces_to_terminal_value() {
        let s1 = Matrix6::identity();
        let s2 = Vector6::repeat(0.5);
        let flight = FlightS2Function::new(-9.81, s1, s2, 0.3);
        assert!((flight.compute(0.3) - s2).amax() < 1e-12);
    }
}
