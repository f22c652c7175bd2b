//! Dynamic-feasibility validation of footstep plans.
//!
//! Builds a per-step VRP reference from a footstep plan and runs the
//! tracking controller over it in closed loop, checking that gains and
//! states stay finite. The strict/tolerant policy split is configurable:
//! strict mode fails the plan on any numerical issue, tolerant mode logs
//! and reports the plan as unvalidated.

use log::warn;
use nalgebra::{Vector3, Vector6};

use crate::common::{PlannerError, PlannerResult, Pose3D};
use crate::lqr::momentum_controller::LqrMomentumController;
use crate::lqr::trajectory::{ContactState, Polynomial3D};
use crate::planner::output::FootstepPlan;

/// Tracking-validation settings
#[derive(Debug, Clone)]
pub struct LqrSettings {
    /// Pendulum natural frequency sqrt(g / com_height) [1/s]
    pub omega: f64,
    /// Nominal CoM height above the feet [m]
    pub nominal_height: f64,
    /// Duration of each step's VRP segment [s]
    pub segment_duration: f64,
    /// Closed-loop simulation step [s]
    pub simulation_dt: f64,
    /// Fail the plan on numerical issues instead of logging
    pub strict_numerics: bool,
}

impl Default for LqrSettings {
    fn default() -> Self {
        Self {
            omega: 3.2,
            nominal_height: 0.95,
            segment_duration: 0.8,
            simulation_dt: 2.0e-3,
            strict_numerics: true,
        }
    }
}

/// Validates that a footstep plan's CoM/VRP trajectory is dynamically
/// trackable
pub struct DynamicsValidator {
    settings: LqrSettings,
}

impl DynamicsValidator {
    pub fn new(settings: LqrSettings) -> Self {
        Self { settings }
    }

    /// Returns Ok(true) when the closed loop tracks the plan with finite
    /// states throughout, Ok(false) in tolerant mode when it does not
    pub fn validate_plan(
        &self,
        start_mid_foot: &Pose3D,
        plan: &FootstepPlan,
    ) -> PlannerResult<bool> {
        if plan.is_empty() {
            return Ok(true);
        }

        let mut vrp_points = Vec::with_capacity(plan.num_steps() + 1);
        vrp_points.push(Vector3::new(
            start_mid_foot.position.x,
            start_mid_foot.position.y,
            start_mid_foot.position.z + self.settings.nominal_height,
        ));
        for step in plan.steps() {
            vrp_points.push(Vector3::new(
                step.sole_pose.position.x,
                step.sole_pose.position.y,
                step.sole_pose.position.z + self.settings.nominal_height,
            ));
        }

        let trajectories: Vec<Polynomial3D> = vrp_points
            .windows(2)
            .map(|pair| Polynomial3D::linear(pair[0], pair[1], self.settings.segment_duration))
            .collect();
        let contact_states = vec![ContactState::InContact; trajectories.len()];

        match self.simulate(&trajectories, &contact_states, vrp_points[0]) {
            Ok(()) => Ok(true),
            Err(error) => {
                if self.settings.strict_numerics {
                    Err(error)
                } else {
                    warn!("plan failed dynamic validation: {}", error);
                    Ok(false)
                }
            }
        }
    }

    fn simulate(
        &self,
        trajectories: &[Polynomial3D],
        contact_states: &[ContactState],
        initial_vrp: Vector3<f64>,
    ) -> PlannerResult<()> {
        let mut controller = LqrMomentumController::new(self.settings.omega)?;
        controller.set_vrp_trajectory(trajectories, contact_states)?;

        let total_time: f64 = trajectories.iter().map(|t| t.duration()).sum();
        let dt = self.settings.simulation_dt;

        let mut state = Vector6::zeros();
        state.fixed_rows_mut::<3>(0).copy_from(&initial_vrp);

        let mut time = 0.0;
        while time < total_time {
            let input = controller.compute_control_input(&state, time)?;
            for i in 0..3 {
                state[i] += dt * state[i + 3];
                state[i + 3] += dt * input.u[i];
            }
            if !state.iter().all(|v| v.is_finite()) {
                return Err(PlannerError::Numerical(
                    "closed-loop state diverged during validation".to_string(),
                ));
            }
            time += dt;
        }

        let final_position = Vector3::new(state[0], state[1], state[2]);
        let target = controller.final_vrp_position();
        if (final_position - target).norm() > 0.5 {
            return Err(PlannerError::Numerical(format!(
                "closed loop failed to converge: {:.3} m from the final VRP",
                (final_position - target).norm()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::RobotSide;
    use crate::planner::output::PlannedFootstep;

    fn simple_plan() -> FootstepPlan {
        let mut plan = FootstepPlan::default();
        let mut side = RobotSide::Right;
        for i in 1..=6 {
            plan.add_step(PlannedFootstep {
                side,
                sole_pose: Pose3D::from_xyz_yaw(0.3 * i as f64, side.sign() * 0.1, 0.0, 0.0),
                foothold_area_ratio: 1.0,
                timings: None,
            });
            side = side.opposite();
        }
        plan
    }

    #[test]
    fn test_walking_plan_validates() {
        let validator = DynamicsValidator::new(LqrSettings::default());
        let start = Pose3D::from_xyz_yaw(0.0, 0.0, 0.0, 0.0);
        assert!(validator.validate_plan(&start, &simple_plan()).unwrap());
    }

    #[test]
    fn test_empty_plan_validates_trivially() {
        let validator = DynamicsValidator::new(LqrSettings::default());
        let start = Pose3D::from_xyz_yaw(0.0, 0.0, 0.0, 0.0);
        assert!(validator.validate_plan(&start, &FootstepPlan::default()).unwrap());
    }
}
