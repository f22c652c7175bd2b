//! LQR tracking controller for center-of-mass / VRP dynamics.
//!
//! Tracks a piecewise-polynomial VRP reference over a sequence of contact
//! and flight segments. The value function V(x, t) = x'S1 x + s2'x is
//! propagated backward segment-by-segment, choosing the algebraic or
//! differential solver per segment; the control is
//! u = K1 x_rel + k2 with K1 from S1 and k2 from s2. Segment descriptors
//! and solved functions live in parallel, positionally indexed arrays.

use nalgebra::{Matrix3x6, Matrix6, Vector3, Vector6};

use crate::common::{PlannerError, PlannerResult};
use crate::lqr::dynamics::LqrDynamics;
use crate::lqr::s1_function::{
    AlgebraicS1Function, DifferentialS1Segment, FlightS1Function, S1Function,
};
use crate::lqr::s2_function::{
    AlgebraicS2Function, DifferentialS2Segment, FlightS2Function, S2Function,
};
use crate::lqr::trajectory::{ContactState, Polynomial3D};

const GRAVITY_Z: f64 = -9.81;

/// Computed control and diagnostics for one query time
#[derive(Debug, Clone)]
pub struct LqrControlInput {
    /// Commanded CoM acceleration
    pub u: Vector3<f64>,
    /// Feedback gain at the query time
    pub k1: Matrix3x6<f64>,
    /// Feedforward term at the query time
    pub k2: Vector3<f64>,
    /// VRP the feedback realizes, in world coordinates
    pub feedback_vrp: Vector3<f64>,
    /// Value-function Hessian at the query time
    pub cost_hessian: Matrix6<f64>,
    /// Value-function gradient at the query time
    pub cost_gradient: Vector6<f64>,
}

/// Time-varying LQR controller over a multi-segment VRP reference
pub struct LqrMomentumController {
    dynamics: LqrDynamics,
    discrete_dt: f64,

    relative_vrp_trajectories: Vec<Polynomial3D>,
    contact_states: Vec<ContactState>,
    final_vrp_position: Vector3<f64>,

    // parallel arrays, indexed by segment position
    s1_functions: Vec<Box<dyn S1Function>>,
    s2_functions: Vec<Box<dyn S2Function>>,

    segments_solved: bool,
}

impl LqrMomentumController {
    pub fn new(omega: f64) -> PlannerResult<Self> {
        Ok(Self {
            dynamics: LqrDynamics::new(omega)?,
            discrete_dt: 1.0e-4,
            relative_vrp_trajectories: Vec::new(),
            contact_states: Vec::new(),
            final_vrp_position: Vector3::zeros(),
            s1_functions: Vec::new(),
            s2_functions: Vec::new(),
            segments_solved: false,
        })
    }

    pub fn set_vrp_tracking_weight(&mut self, weight: f64) {
        self.dynamics.set_vrp_tracking_weight(weight);
        self.segments_solved = false;
    }

    pub fn set_momentum_rate_weight(&mut self, weight: f64) {
        self.dynamics.set_momentum_rate_weight(weight);
        self.segments_solved = false;
    }

    /// Sets the VRP reference. Trajectories are re-expressed relative to
    /// the final VRP so the terminal boundary condition is zero.
    pub fn set_vrp_trajectory(
        &mut self,
        vrp_trajectories: &[Polynomial3D],
        contact_states: &[ContactState],
    ) -> PlannerResult<()> {
        if vrp_trajectories.is_empty() {
            return Err(PlannerError::InvalidRequest(
                "VRP trajectory must have at least one segment".to_string(),
            ));
        }
        if vrp_trajectories.len() != contact_states.len() {
            return Err(PlannerError::InvalidRequest(format!(
                "{} trajectory segments but {} contact states",
                vrp_trajectories.len(),
                contact_states.len()
            )));
        }

        self.final_vrp_position = vrp_trajectories[vrp_trajectories.len() - 1].final_position();
        self.relative_vrp_trajectories = vrp_trajectories
            .iter()
            .map(|trajectory| trajectory.offset_by(-self.final_vrp_position))
            .collect();
        self.contact_states = contact_states.to_vec();
        self.segments_solved = false;
        Ok(())
    }

    pub fn final_vrp_position(&self) -> Vector3<f64> {
        self.final_vrp_position
    }

    /// Solves S1 backward over all segments, selecting the algebraic form
    /// until the first contact switch and the differential form before it
    fn compute_s1_segments(&mut self) -> PlannerResult<()> {
        let count = self.relative_vrp_trajectories.len();
        let algebraic = AlgebraicS1Function::solve(&self.dynamics)?;

        let mut functions: Vec<Option<Box<dyn S1Function>>> =
            (0..count).map(|_| None).collect();

        let mut boundary = algebraic.compute(0.0);
        functions[count - 1] = Some(Box::new(algebraic.clone()));
        let mut has_had_switch = false;

        for j in (0..count.saturating_sub(1)).rev() {
            let duration = self.relative_vrp_trajectories[j].duration();
            if self.contact_states[j].is_load_bearing() {
                if has_had_switch {
                    let mut segment = DifferentialS1Segment::new(self.discrete_dt);
                    segment.set(&self.dynamics, boundary, duration)?;
                    boundary = segment.compute(0.0);
                    functions[j] = Some(Box::new(segment));
                } else {
                    boundary = algebraic.compute(0.0);
                    functions[j] = Some(Box::new(algebraic.clone()));
                }
            } else {
                has_had_switch = true;
                let flight = FlightS1Function::new(boundary, duration);
                boundary = flight.compute(0.0);
                functions[j] = Some(Box::new(flight));
            }
        }

        self.s1_functions = functions.into_iter().flatten().collect();
        Ok(())
    }

    /// Solves s2 backward: the trailing run of contact segments in closed
    /// form, then differential/flight segments before it
    fn compute_s2_segments(&mut self) -> PlannerResult<()> {
        let count = self.relative_vrp_trajectories.len();

        let mut ending_contact_segments = 0;
        while ending_contact_segments < count
            && self.contact_states[count - 1 - ending_contact_segments].is_load_bearing()
        {
            ending_contact_segments += 1;
        }

        let mut functions: Vec<Option<Box<dyn S2Function>>> =
            (0..count).map(|_| None).collect();

        let stationary_s1 = self.s1_functions[count - 1].compute(0.0);
        let (a2, b2) = self.dynamics.gradient_dynamics(&stationary_s1);

        let mut boundary = Vector6::zeros();
        if ending_contact_segments > 0 {
            let first_ending = count - ending_contact_segments;
            let ending =
                AlgebraicS2Function::solve(&boundary, &self.relative_vrp_trajectories[first_ending..], &a2, &b2)?;
            boundary = ending.compute(0.0);
            for (offset, j) in (first_ending..count).enumerate() {
                functions[j] = Some(Box::new(ending.segment(offset).clone()));
            }
        }

        for j in (0..count - ending_contact_segments).rev() {
            let trajectory = &self.relative_vrp_trajectories[j];
            if self.contact_states[j].is_load_bearing() {
                let mut segment = DifferentialS2Segment::new(self.discrete_dt);
                segment.set(
                    self.s1_functions[j].as_ref(),
                    trajectory,
                    &self.dynamics,
                    boundary,
                )?;
                boundary = segment.compute(0.0);
                functions[j] = Some(Box::new(segment));
            } else {
                let s1_after = if j + 1 < count {
                    self.s1_functions[j + 1].compute(0.0)
                } else {
                    stationary_s1
                };
                let flight =
                    FlightS2Function::new(GRAVITY_Z, s1_after, boundary, trajectory.duration());
                boundary = flight.compute(0.0);
                functions[j] = Some(Box::new(flight));
            }
        }

        self.s2_functions = functions.into_iter().flatten().collect();
        Ok(())
    }

    fn ensure_solved(&mut self) -> PlannerResult<()> {
        if self.relative_vrp_trajectories.is_empty() {
            return Err(PlannerError::InvalidRequest(
                "no VRP trajectory has been set".to_string(),
            ));
        }
        if self.dynamics.is_dirty() {
            self.dynamics.update()?;
            self.segments_solved = false;
        }
        if !self.segments_solved {
            self.compute_s1_segments()?;
            self.compute_s2_segments()?;
            self.segments_solved = true;
        }
        Ok(())
    }

    fn segment_and_local_time(&self, time: f64) -> (usize, f64) {
        let mut offset = 0.0;
        for (i, trajectory) in self.relative_vrp_trajectories.iter().enumerate() {
            if time - offset <= trajectory.duration()
                || i == self.relative_vrp_trajectories.len() - 1
            {
                return (i, (time - offset).clamp(0.0, trajectory.duration()));
            }
            offset += trajectory.duration();
        }
        (0, 0.0)
    }

    /// Computes the optimal control u = K1 x_rel + k2 at the given time,
    /// with the state expressed in world coordinates
    pub fn compute_control_input(
        &mut self,
        state: &Vector6<f64>,
        time: f64,
    ) -> PlannerResult<LqrControlInput> {
        self.ensure_solved()?;

        let (segment, local_time) = self.segment_and_local_time(time);

        let s1 = self.s1_functions[segment].compute(local_time);
        let s2 = self.s2_functions[segment].compute(local_time);
        let k1 = self.dynamics.k1_given_s1(&s1);

        let relative_vrp = self.relative_vrp_trajectories[segment].position(local_time);

        // k2 = R1^-1 (D'Q y_d - 0.5 B' s2)
        let k2 = self.dynamics.r1_inverse()
            * (self.dynamics.dq() * relative_vrp
                - 0.5 * self.dynamics.b().transpose() * s2);

        let mut relative_state = *state;
        for i in 0..3 {
            relative_state[i] -= self.final_vrp_position[i];
        }

        let u = k1 * relative_state + k2;

        let feedback_vrp = self.dynamics.c() * relative_state
            + self.dynamics.d() * u
            + self.final_vrp_position;

        let input = LqrControlInput {
            u,
            k1,
            k2,
            feedback_vrp,
            cost_hessian: s1,
            cost_gradient: s2,
        };

        if !input.u.iter().all(|v| v.is_finite()) {
            return Err(PlannerError::Numerical(
                "LQR control input is not finite".to_string(),
            ));
        }
        Ok(input)
    }
}
