//! Center-of-mass / VRP tracking dynamics and cost-equivalent matrices.
//!
//! State x = [com; com_dot], control u = com_ddot, output y = vrp.
//!
//!   A = [0 I; 0 0]    B = [0; I]    C = [I 0]    D = -I / omega^2
//!
//! The quadratic tracking cost (y - y_d)' Q (y - y_d) + u' R u expands into
//! the equivalent state-space cost with Q1 = C'QC, R1 = R + D'QD and cross
//! term N = C'QD. All derived matrices are cached behind a dirty flag and
//! recomputed when omega or a weight changes.

use nalgebra::{Matrix3, Matrix3x6, Matrix6, Matrix6x3};

use crate::common::{PlannerError, PlannerResult};

pub const DEFAULT_VRP_TRACKING_WEIGHT: f64 = 1.0e2;
pub const DEFAULT_MOMENTUM_RATE_WEIGHT: f64 = 1.0e-4;

#[derive(Debug, Clone)]
pub struct LqrDynamics {
    omega: f64,
    vrp_tracking_weight: f64,
    momentum_rate_weight: f64,

    a: Matrix6<f64>,
    b: Matrix6x3<f64>,
    c: Matrix3x6<f64>,
    d: Matrix3<f64>,

    q1: Matrix6<f64>,
    r1: Matrix3<f64>,
    r1_inverse: Matrix3<f64>,
    n_transpose: Matrix3x6<f64>,
    dq: Matrix3<f64>,

    dirty: bool,
}

impl LqrDynamics {
    pub fn new(omega: f64) -> PlannerResult<Self> {
        let mut dynamics = Self {
            omega,
            vrp_tracking_weight: DEFAULT_VRP_TRACKING_WEIGHT,
            momentum_rate_weight: DEFAULT_MOMENTUM_RATE_WEIGHT,
            a: Matrix6::zeros(),
            b: Matrix6x3::zeros(),
            c: Matrix3x6::zeros(),
            d: Matrix3::zeros(),
            q1: Matrix6::zeros(),
            r1: Matrix3::zeros(),
            r1_inverse: Matrix3::zeros(),
            n_transpose: Matrix3x6::zeros(),
            dq: Matrix3::zeros(),
            dirty: true,
        };
        dynamics.update()?;
        Ok(dynamics)
    }

    pub fn set_omega(&mut self, omega: f64) {
        self.omega = omega;
        self.dirty = true;
    }

    pub fn set_vrp_tracking_weight(&mut self, weight: f64) {
        self.vrp_tracking_weight = weight;
        self.dirty = true;
    }

    pub fn set_momentum_rate_weight(&mut self, weight: f64) {
        self.momentum_rate_weight = weight;
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Recomputes the dynamics and cost-equivalent matrices if a weight or
    /// omega changed since the last update
    pub fn update(&mut self) -> PlannerResult<()> {
        if !self.dirty {
            return Ok(());
        }
        if self.omega <= 0.0 {
            return Err(PlannerError::InvalidRequest(format!(
                "omega must be positive, got {}",
                self.omega
            )));
        }

        self.a = Matrix6::zeros();
        self.b = Matrix6x3::zeros();
        self.c = Matrix3x6::zeros();
        for i in 0..3 {
            self.a[(i, i + 3)] = 1.0;
            self.b[(i + 3, i)] = 1.0;
            self.c[(i, i)] = 1.0;
        }
        self.d = Matrix3::identity() * (-1.0 / (self.omega * self.omega));

        let q = Matrix3::identity() * self.vrp_tracking_weight;
        let r = Matrix3::identity() * self.momentum_rate_weight;

        self.q1 = self.c.transpose() * q * self.c;
        self.r1 = r + self.d.transpose() * q * self.d;
        self.r1_inverse = self.r1.try_inverse().ok_or_else(|| {
            PlannerError::Numerical("equivalent control cost R1 is singular".to_string())
        })?;
        self.n_transpose = self.d.transpose() * q * self.c;
        self.dq = self.d.transpose() * q;

        self.dirty = false;
        Ok(())
    }

    pub fn a(&self) -> &Matrix6<f64> {
        &self.a
    }

    pub fn b(&self) -> &Matrix6x3<f64> {
        &self.b
    }

    pub fn c(&self) -> &Matrix3x6<f64> {
        &self.c
    }

    pub fn d(&self) -> &Matrix3<f64> {
        &self.d
    }

    pub fn q1(&self) -> &Matrix6<f64> {
        &self.q1
    }

    pub fn r1_inverse(&self) -> &Matrix3<f64> {
        &self.r1_inverse
    }

    pub fn dq(&self) -> &Matrix3<f64> {
        &self.dq
    }

    /// Feedback gain for a given value-function Hessian:
    /// K1 = -R1^-1 (N' + B' S1)
    pub fn k1_given_s1(&self, s1: &Matrix6<f64>) -> Matrix3x6<f64> {
        let nb = self.n_transpose + self.b.transpose() * s1;
        -self.r1_inverse * nb
    }

    /// Closed-loop matrices of the value-function gradient dynamics
    /// s2_dot = A2 s2 + B2 y_d:
    ///   A2 = -(A + B K1)',  B2 = 2 (C + D K1)' Q
    pub fn gradient_dynamics(&self, s1: &Matrix6<f64>) -> (Matrix6<f64>, Matrix6x3<f64>) {
        let k1 = self.k1_given_s1(s1);
        let a_closed = self.a + self.b * k1;
        let output_closed = self.c + self.d * k1;
        let q = Matrix3::identity() * self.vrp_tracking_weight;
        let a2 = -a_closed.transpose();
        let b2 = 2.0 * output_closed.transpose() * q;
        (a2, b2)
    }

    /// Backward Riccati derivative:
    /// S1_dot = (N' + B'S1)' R1^-1 (N' + B'S1) - Q1 - S1 A - A' S1
    pub fn s1_dot(&self, s1: &Matrix6<f64>) -> Matrix6<f64> {
        let nb = self.n_transpose + self.b.transpose() * s1;
        nb.transpose() * self.r1_inverse * nb
            - self.q1
            - s1 * self.a
            - self.a.transpose() * s1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dynamics_shapes() {
        let dynamics = LqrDynamics::new(3.2).unwrap();
        // A is a double integrator
        assert!((dynamics.a()[(0, 3)] - 1.0).abs() < 1e-12);
        assert!(dynamics.a()[(3, 0)].abs() < 1e-12);
        // D scales with -1/omega^2
        assert!((dynamics.d()[(0, 0)] + 1.0 / (3.2 * 3.2)).abs() < 1e-12);
    }

    #[test]
    fn test_dirty_flag_invalidation() {
        let mut dynamics = LqrDynamics::new(3.2).unwrap();
        assert!(!dynamics.is_dirty());
        dynamics.set_vrp_tracking_weight(50.0);
        assert!(dynamics.is_dirty());
        dynamics.update().unwrap();
        assert!(!dynamics.is_dirty());
    }

    #[test]
    fn test_invalid_omega_rejected() {
        assert!(LqrDynamics::new(-1.0).is_err());
    }
}
