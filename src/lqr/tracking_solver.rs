//! Discrete time-varying tracking LQR: backward Riccati recursion plus
//! forward rollout.
//!
//! Matrix dimensions are fixed at construction; reshaping only ever happens
//! in intermediate scratch expressions, never on the state or control
//! dimension. Debug mode validates every matrix is finite after each step
//! and fails the solve as an unrecoverable numerical error.

use nalgebra::{DMatrix, DVector};

use crate::common::{PlannerError, PlannerResult};

/// Linear discrete dynamics x_{k+1} = A x_k + B u_k with a quadratic
/// tracking cost
pub struct DiscreteTrackingLqrSolver {
    a: DMatrix<f64>,
    b: DMatrix<f64>,
    q: DMatrix<f64>,
    r: DMatrix<f64>,
    qf: DMatrix<f64>,

    desired_states: Vec<DVector<f64>>,
    desired_controls: Vec<DVector<f64>>,

    optimal_states: Vec<DVector<f64>>,
    optimal_controls: Vec<DVector<f64>>,

    feedback_gains: Vec<DMatrix<f64>>,
    feedforward: Vec<DVector<f64>>,

    s1_trajectory: Vec<DMatrix<f64>>,
    s2_trajectory: Vec<DVector<f64>>,

    state_size: usize,
    control_size: usize,
    debug: bool,
}

impl DiscreteTrackingLqrSolver {
    pub fn new(
        a: DMatrix<f64>,
        b: DMatrix<f64>,
        q: DMatrix<f64>,
        r: DMatrix<f64>,
        qf: DMatrix<f64>,
        debug: bool,
    ) -> PlannerResult<Self> {
        let state_size = a.nrows();
        let control_size = b.ncols();
        if a.ncols() != state_size
            || b.nrows() != state_size
            || q.nrows() != state_size
            || q.ncols() != state_size
            || r.nrows() != control_size
            || r.ncols() != control_size
            || qf.nrows() != state_size
            || qf.ncols() != state_size
        {
            return Err(PlannerError::Numerical(format!(
                "inconsistent LQR dimensions: A {}x{}, B {}x{}",
                a.nrows(),
                a.ncols(),
                b.nrows(),
                b.ncols()
            )));
        }

        Ok(Self {
            a,
            b,
            q,
            r,
            qf,
            desired_states: Vec::new(),
            desired_controls: Vec::new(),
            optimal_states: Vec::new(),
            optimal_controls: Vec::new(),
            feedback_gains: Vec::new(),
            feedforward: Vec::new(),
            s1_trajectory: Vec::new(),
            s2_trajectory: Vec::new(),
            state_size,
            control_size,
            debug,
        })
    }

    pub fn set_desired_trajectories(
        &mut self,
        desired_states: Vec<DVector<f64>>,
        desired_controls: Vec<DVector<f64>>,
        initial_state: DVector<f64>,
    ) -> PlannerResult<()> {
        if desired_states.len() != desired_controls.len() || desired_states.is_empty() {
            return Err(PlannerError::InvalidRequest(format!(
                "desired trajectory lengths differ: {} states, {} controls",
                desired_states.len(),
                desired_controls.len()
            )));
        }
        if initial_state.len() != self.state_size {
            return Err(PlannerError::Numerical(
                "initial state dimension mismatch".to_string(),
            ));
        }

        let steps = desired_states.len();
        self.desired_states = desired_states;
        self.desired_controls = desired_controls;

        self.optimal_states = vec![DVector::zeros(self.state_size); steps];
        self.optimal_controls = vec![DVector::zeros(self.control_size); steps];
        self.feedback_gains =
            vec![DMatrix::zeros(self.control_size, self.state_size); steps];
        self.feedforward = vec![DVector::zeros(self.control_size); steps];
        self.s1_trajectory = vec![DMatrix::zeros(self.state_size, self.state_size); steps];
        self.s2_trajectory = vec![DVector::zeros(self.state_size); steps];

        self.optimal_states[0] = initial_state;
        Ok(())
    }

    /// Backward pass: propagates the value function from `end_index` down
    /// to `start_index`, filling gains and feedforward terms
    pub fn solve_riccati_equation(
        &mut self,
        start_index: usize,
        end_index: usize,
    ) -> PlannerResult<()> {
        if end_index >= self.desired_states.len() || start_index > end_index {
            return Err(PlannerError::InvalidRequest(format!(
                "invalid riccati index range [{}, {}]",
                start_index, end_index
            )));
        }

        self.s1_trajectory[end_index] = self.qf.clone();
        self.s2_trajectory[end_index] =
            -2.0 * &self.qf * &self.desired_states[end_index];

        for i in (start_index..end_index).rev() {
            let next_s1 = self.s1_trajectory[i + 1].clone();
            let next_s2 = self.s2_trajectory[i + 1].clone();

            if self.debug && (!is_finite_matrix(&next_s1) || !is_finite_vector(&next_s2)) {
                return Err(PlannerError::Numerical(
                    "Riccati recursion produced non-finite values".to_string(),
                ));
            }

            // G = R + B' S1 B
            let g = &self.r + self.b.transpose() * &next_s1 * &self.b;
            let g_inverse = g.clone().try_inverse().ok_or_else(|| {
                PlannerError::Numerical("control Hessian G is singular".to_string())
            })?;

            // K = -G^-1 B' S1 A
            let gain =
                -(&g_inverse * self.b.transpose() * &next_s1 * &self.a);

            // F = G^-1 (R u_d - 0.5 B' s2)
            let feedforward = &g_inverse
                * (&self.r * &self.desired_controls[i]
                    - 0.5 * self.b.transpose() * &next_s2);

            // S1_k = Q + K'RK + (A + BK)' S1_k+1 (A + BK)
            let closed_loop = &self.a + &self.b * &gain;
            let s1 = &self.q
                + gain.transpose() * &self.r * &gain
                + closed_loop.transpose() * &next_s1 * &closed_loop;

            // s2_k = (A + BK)' (s2_k+1 + 2 S1_k+1 B F)
            //        + 2 K'R (F - u_d) - 2 Q x_d
            let s2 = closed_loop.transpose()
                * (&next_s2 + 2.0 * &next_s1 * &self.b * &feedforward)
                + 2.0 * gain.transpose() * &self.r * (&feedforward - &self.desired_controls[i])
                - 2.0 * &self.q * &self.desired_states[i];

            if self.debug && (!is_finite_matrix(&s1) || !is_finite_vector(&s2)) {
                return Err(PlannerError::Numerical(
                    "Riccati recursion produced non-finite values".to_string(),
                ));
            }

            self.feedback_gains[i] = gain;
            self.feedforward[i] = feedforward;
            self.s1_trajectory[i] = s1;
            self.s2_trajectory[i] = s2;
        }

        Ok(())
    }

    /// Forward pass: rolls the state forward under u_k = K_k x_k + F_k
    pub fn compute_optimal_trajectories(
        &mut self,
        start_index: usize,
        end_index: usize,
    ) -> PlannerResult<()> {
        for i in start_index..end_index {
            let control = &self.feedback_gains[i] * &self.optimal_states[i]
                + &self.feedforward[i];
            let next_state = &self.a * &self.optimal_states[i] + &self.b * &control;

            if self.debug && (!is_finite_vector(&control) || !is_finite_vector(&next_state)) {
                return Err(PlannerError::Numerical(
                    "forward rollout produced non-finite values".to_string(),
                ));
            }

            self.optimal_controls[i] = control;
            self.optimal_states[i + 1] = next_state;
        }
        Ok(())
    }

    pub fn optimal_states(&self) -> &[DVector<f64>] {
        &self.optimal_states
    }

    pub fn optimal_controls(&self) -> &[DVector<f64>] {
        &self.optimal_controls
    }

    pub fn feedback_gain(&self, index: usize) -> &DMatrix<f64> {
        &self.feedback_gains[index]
    }

    pub fn cost_hessian(&self, index: usize) -> &DMatrix<f64> {
        &self.s1_trajectory[index]
    }
}

fn is_finite_matrix(matrix: &DMatrix<f64>) -> bool {
    matrix.iter().all(|v| v.is_finite())
}

fn is_finite_vector(vector: &DVector<f64>) -> bool {
    vector.iter().all(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Discretized 1D double integrator
    fn double_integrator(dt: f64) -> (DMatrix<f64>, DMatrix<f64>) {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, dt, 0.0, 1.0]);
        let b = DMatrix::from_row_slice(2, 1, &[0.5 * dt * dt, dt]);
        (a, b)
    }

    fn regulation_solver(debug: bool) -> DiscreteTrackingLqrSolver {
        let (a, b) = double_integrator(0.01);
        let q = DMatrix::identity(2, 2);
        let r = DMatrix::identity(1, 1) * 0.1;
        let qf = DMatrix::identity(2, 2) * 10.0;
        DiscreteTrackingLqrSolver::new(a, b, q, r, qf, debug).unwrap()
    }

    #[test]
    fn test_regulation_drives_state_to_origin() {
        let mut solver = regulation_solver(true);
        let steps = 500;
        let desired_states = vec![DVector::zeros(2); steps];
        let desired_controls = vec![DVector::zeros(1); steps];
        let initial = DVector::from_row_slice(&[1.0, 0.0]);

        solver
            .set_desired_trajectories(desired_states, desired_controls, initial)
            .unwrap();
        solver.solve_riccati_equation(0, steps - 1).unwrap();
        solver.compute_optimal_trajectories(0, steps - 1).unwrap();

        let final_state = &solver.optimal_states()[steps - 1];
        assert!(final_state[0].abs() < 0.05, "final position {}", final_state[0]);
        assert!(final_state[1].abs() < 0.2);
    }

    #[test]
    fn test_riccati_recursion_converges_to_stationary_solution() {
        let mut solver = regulation_solver(false);
        let steps = 2000;
        solver
            .set_desired_trajectories(
                vec![DVector::zeros(2); steps],
                vec![DVector::zeros(1); steps],
                DVector::zeros(2),
            )
            .unwrap();
        solver.solve_riccati_equation(0, steps - 1).unwrap();

        // far from the terminal the recursion reaches a fixed point
        let early = solver.cost_hessian(0);
        let later = solver.cost_hessian(10);
        assert!((early - later).amax() < 1e-9);
    }

    #[test]
    fn test_dimension_mismatch_is_an_error() {
        let (a, _) = double_integrator(0.01);
        let b = DMatrix::zeros(3, 1);
        let q = DMatrix::identity(2, 2);
        let r = DMatrix::identity(1, 1);
        let qf = DMatrix::identity(2, 2);
        assert!(DiscreteTrackingLqrSolver::new(a, b, q, r, qf, false).is_err());
    }

    #[test]
    fn test_tracking_follows_a_ramp() {
        let mut solver = regulation_solver(true);
        let steps = 800;
        let dt = 0.01;
        let desired_states: Vec<DVector<f64>> = (0..steps)
            .map(|k| DVector::from_row_slice(&[0.5 * k as f64 * dt, 0.5]))
            .collect();
        let desired_controls = vec![DVector::zeros(1); steps];
        let initial = DVector::from_row_slice(&[0.0, 0.0]);

        solver
            .set_desired_trajectories(desired_states.clone(), desired_controls, initial)
            .unwrap();
        solver.solve_riccati_equation(0, steps - 1).unwrap();
        solver.compute_optimal_trajectories(0, steps - 1).unwrap();

        // mid-trajectory tracking error stays small
        let mid = steps / 2;
        let error = (&solver.optimal_states()[mid] - &desired_states[mid]).amax();
        assert!(error < 0.1, "tracking error {}", error);
    }
}
