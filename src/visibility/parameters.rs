//! Visibility graph construction parameters.

/// Tuning knobs for navigable-region and visibility-map construction
#[derive(Debug, Clone)]
pub struct VisibilityGraphParameters {
    /// Spacing between discretized cluster boundary points [m]
    pub cluster_resolution: f64,
    /// Inward extrusion of the region boundary for the home cluster [m]
    pub home_extrusion_distance: f64,
    /// Outward extrusion of obstacle footprints for the no-go ring [m]
    pub obstacle_extrusion_distance: f64,
    /// Extra outward extrusion for the walkable ring beyond the no-go ring [m]
    pub navigable_extra_distance: f64,
    /// Regions steeper than this surface-normal angle from vertical are not
    /// navigable [rad]
    pub orthogonal_angle: f64,
    /// Regions smaller than this are ignored [m^2]
    pub min_region_area: f64,
    /// Obstacle vertices closer than this to the home plane are truncated [m]
    pub obstacle_height_threshold: f64,
    /// Obstacles higher above the home plane than this are ignored (the body
    /// passes under them) [m]
    pub can_duck_under_height: f64,
    /// Maximum inter-region connection length [m]
    pub max_inter_region_connection_length: f64,
    /// Maximum height difference for an inter-region connection [m]
    pub max_inter_region_height_delta: f64,
    /// Desired waypoint clearance from obstacle no-go rings used by the
    /// body-path post-processor [m]
    pub preferred_obstacle_clearance: f64,
}

impl Default for VisibilityGraphParameters {
    fn default() -> Self {
        Self {
            cluster_resolution: 0.2,
            home_extrusion_distance: 0.02,
            obstacle_extrusion_distance: 0.4,
            navigable_extra_distance: 0.05,
            orthogonal_angle: 0.8,
            min_region_area: 0.05,
            obstacle_height_threshold: 0.05,
            can_duck_under_height: 2.0,
            max_inter_region_connection_length: 0.55,
            max_inter_region_height_delta: 0.3,
            preferred_obstacle_clearance: 0.6,
        }
    }
}
