//! Footstep snapping: projecting nominal footprints onto terrain geometry.

pub mod planar_region_snapper;
pub mod wiggler;

pub use planar_region_snapper::{
    FlatGroundSnapper, FootstepSnapper, PlanarRegionFootstepSnapper, SnapData, SnapperParameters,
};
