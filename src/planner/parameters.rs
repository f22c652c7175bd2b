//! Footstep planner parameters.
//!
//! Explicit configuration passed into each planner instance at
//! construction; there are no process-wide parameter singletons.

/// Tuning knobs for footstep expansion, checking, costs and heuristics
#[derive(Debug, Clone)]
pub struct FootstepPlannerParameters {
    /// Preferred forward progress per step [m]
    pub ideal_step_length: f64,
    /// Preferred lateral distance between the feet [m]
    pub ideal_step_width: f64,
    /// Maximum forward displacement of a candidate step [m]
    pub max_step_length: f64,
    /// Maximum backward displacement of a candidate step (negative) [m]
    pub min_step_length: f64,
    /// Maximum lateral distance between the feet [m]
    pub max_step_width: f64,
    /// Minimum lateral distance between the feet [m]
    pub min_step_width: f64,
    /// Maximum horizontal reach of a candidate step [m]
    pub max_step_reach: f64,
    /// Maximum outward yaw change per step [rad]
    pub max_step_yaw: f64,
    /// Maximum inward yaw change per step (negative) [rad]
    pub min_step_yaw: f64,

    /// Steepest surface the foot may snap onto [rad]
    pub max_surface_incline: f64,
    /// Minimum supported fraction of the nominal footprint after snapping
    pub min_foothold_percent: f64,
    /// Maximum height change between consecutive steps [m]
    pub max_step_z: f64,
    /// Minimum in-plane clearance between consecutive step placements [m]
    pub min_clearance_from_stance: f64,

    /// Height difference that counts as a cliff [m]
    pub cliff_height_to_avoid: f64,
    /// Required horizontal distance from cliff bottoms [m]
    pub min_distance_from_cliff_bottoms: f64,

    /// Whether the body-collision sweep runs at all
    pub check_body_collisions: bool,
    /// Body collision box lateral half-extent center width [m]
    pub body_box_width: f64,
    /// Body collision box depth [m]
    pub body_box_depth: f64,
    /// Body collision box height above its base [m]
    pub body_box_height: f64,
    /// Height of the collision box base above the stance foot [m]
    pub body_ground_clearance: f64,

    /// Step cost weight on yaw change
    pub yaw_weight: f64,
    /// Step cost weight on snapped-surface pitch
    pub pitch_weight: f64,
    /// Step cost weight on snapped-surface roll
    pub roll_weight: f64,
    /// Step cost weight on stepping up [1/m]
    pub step_up_weight: f64,
    /// Step cost weight on stepping down [1/m]
    pub step_down_weight: f64,
    /// Step cost weight on missing foothold area
    pub foothold_area_weight: f64,
    /// Constant cost added per step
    pub cost_per_step: f64,

    /// Multiplier on the A* heuristic. Values above 1 are deliberately
    /// inadmissible and trade optimality for speed.
    pub astar_heuristics_weight: f64,

    /// Period between diagnostic callback flushes [s]
    pub status_publish_period: f64,
}

impl Default for FootstepPlannerParameters {
    fn default() -> Self {
        Self {
            ideal_step_length: 0.3,
            ideal_step_width: 0.2,
            max_step_length: 0.4,
            min_step_length: -0.15,
            max_step_width: 0.35,
            min_step_width: 0.1,
            max_step_reach: 0.45,
            max_step_yaw: 0.175,
            min_step_yaw: -0.175,

            max_surface_incline: 0.785,
            min_foothold_percent: 0.9,
            max_step_z: 0.28,
            min_clearance_from_stance: 0.04,

            cliff_height_to_avoid: 0.15,
            min_distance_from_cliff_bottoms: 0.1,

            check_body_collisions: true,
            body_box_width: 0.7,
            body_box_depth: 0.4,
            body_box_height: 1.3,
            body_ground_clearance: 0.25,

            yaw_weight: 0.15,
            pitch_weight: 0.1,
            roll_weight: 0.1,
            step_up_weight: 0.2,
            step_down_weight: 0.2,
            foothold_area_weight: 0.2,
            cost_per_step: 0.15,

            astar_heuristics_weight: 1.5,

            status_publish_period: 0.5,
        }
    }
}
