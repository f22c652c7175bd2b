//! Composable footstep edge costs.
//!
//! Each term scores one aspect of a stance-to-step transition; the planner
//! sums a list of them. Terms must not reject steps (that is the checkers'
//! job) and must never return negative costs.

use crate::common::angle_difference;
use crate::graph::FootstepNode;
use crate::planner::parameters::FootstepPlannerParameters;
use crate::snapping::FootstepSnapper;

/// One term of the composed step cost
pub trait FootstepCost {
    fn compute(
        &self,
        stance: &FootstepNode,
        step: &FootstepNode,
        snapper: &mut dyn FootstepSnapper,
    ) -> f64;
}

/// Penalizes displacement from the ideal step placement and yaw change
pub struct DistanceAndYawCost {
    ideal_step_length: f64,
    ideal_step_width: f64,
    yaw_weight: f64,
}

impl DistanceAndYawCost {
    pub fn new(parameters: &FootstepPlannerParameters) -> Self {
        Self {
            ideal_step_length: parameters.ideal_step_length,
            ideal_step_width: parameters.ideal_step_width,
            yaw_weight: parameters.yaw_weight,
        }
    }
}

impl FootstepCost for DistanceAndYawCost {
    fn compute(
        &self,
        stance: &FootstepNode,
        step: &FootstepNode,
        _snapper: &mut dyn FootstepSnapper,
    ) -> f64 {
        let side_sign = step.side().sign();
        let (sin, cos) = stance.yaw().sin_cos();
        let lateral = side_sign * self.ideal_step_width;
        let ideal_x = stance.x() + cos * self.ideal_step_length - sin * lateral;
        let ideal_y = stance.y() + sin * self.ideal_step_length + cos * lateral;

        let distance = ((step.x() - ideal_x).powi(2) + (step.y() - ideal_y).powi(2)).sqrt();
        let yaw_change = angle_difference(step.yaw(), stance.yaw()).abs();
        distance + self.yaw_weight * yaw_change
    }
}

/// Penalizes height changes between the snapped stance and step
pub struct HeightCost {
    step_up_weight: f64,
    step_down_weight: f64,
}

impl HeightCost {
    pub fn new(parameters: &FootstepPlannerParameters) -> Self {
        Self {
            step_up_weight: parameters.step_up_weight,
            step_down_weight: parameters.step_down_weight,
        }
    }
}

impl FootstepCost for HeightCost {
    fn compute(
        &self,
        stance: &FootstepNode,
        step: &FootstepNode,
        snapper: &mut dyn FootstepSnapper,
    ) -> f64 {
        let stance_z = match snapper.snap(stance) {
            Some(snap) => snap.snapped_pose.position.z,
            None => return 0.0,
        };
        let step_z = match snapper.snap(step) {
            Some(snap) => snap.snapped_pose.position.z,
            None => return 0.0,
        };
        let dz = step_z - stance_z;
        if dz > 0.0 {
            self.step_up_weight * dz
        } else {
            self.step_down_weight * (-dz)
        }
    }
}

/// Penalizes landing on pitched or rolled surfaces
pub struct PitchAndRollCost {
    pitch_weight: f64,
    roll_weight: f64,
}

impl PitchAndRollCost {
    pub fn new(parameters: &FootstepPlannerParameters) -> Self {
        Self {
            pitch_weight: parameters.pitch_weight,
            roll_weight: parameters.roll_weight,
        }
    }
}

impl FootstepCost for PitchAndRollCost {
    fn compute(
        &self,
        _stance: &FootstepNode,
        step: &FootstepNode,
        snapper: &mut dyn FootstepSnapper,
    ) -> f64 {
        match snapper.snap(step) {
            Some(snap) => {
                let (roll, pitch, _) = snap.snapped_pose.orientation.euler_angles();
                self.pitch_weight * pitch.abs() + self.roll_weight * roll.abs()
            }
            None => 0.0,
        }
    }
}

/// Penalizes partial footholds
pub struct FootholdAreaCost {
    foothold_area_weight: f64,
}

impl FootholdAreaCost {
    pub fn new(parameters: &FootstepPlannerParameters) -> Self {
        Self { foothold_area_weight: parameters.foothold_area_weight }
    }
}

impl FootstepCost for FootholdAreaCost {
    fn compute(
        &self,
        _stance: &FootstepNode,
        step: &FootstepNode,
        snapper: &mut dyn FootstepSnapper,
    ) -> f64 {
        match snapper.snap(step) {
            Some(snap) => self.foothold_area_weight * (1.0 - snap.foothold_area_ratio).max(0.0),
            None => 0.0,
        }
    }
}

/// Constant cost per step, pushing the search toward shorter plans
pub struct PerStepCost {
    cost_per_step: f64,
}

impl PerStepCost {
    pub fn new(parameters: &FootstepPlannerParameters) -> Self {
        Self { cost_per_step: parameters.cost_per_step }
    }
}

impl FootstepCost for PerStepCost {
    fn compute(
        &self,
        _stance: &FootstepNode,
        _step: &FootstepNode,
        _snapper: &mut dyn FootstepSnapper,
    ) -> f64 {
        self.cost_per_step
    }
}

/// Weighted sum of cost terms
pub struct CompositeFootstepCost {
    terms: Vec<Box<dyn FootstepCost>>,
}

impl CompositeFootstepCost {
    pub fn new(terms: Vec<Box<dyn FootstepCost>>) -> Self {
        Self { terms }
    }

    /// The default cost stack: distance/yaw, height, pitch/roll, foothold
    /// area and per-step terms
    pub fn default_stack(parameters: &FootstepPlannerParameters) -> Self {
        Self::new(vec![
            Box::new(DistanceAndYawCost::new(parameters)),
            Box::new(HeightCost::new(parameters)),
            Box::new(PitchAndRollCost::new(parameters)),
            Box::new(FootholdAreaCost::new(parameters)),
            Box::new(PerStepCost::new(parameters)),
        ])
    }
}

impl FootstepCost for CompositeFootstepCost {
    fn compute(
        &self,
        stance: &FootstepNode,
        step: &FootstepNode,
        snapper: &mut dyn FootstepSnapper,
    ) -> f64 {
        self.terms
            .iter()
            .map(|term| term.compute(stance, step, snapper))
            .sum()
    }
}
