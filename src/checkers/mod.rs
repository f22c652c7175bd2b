//! Footstep node feasibility checking.
//!
//! A checker answers "can this footstep node be placed here, given its
//! predecessor?". Rejection is a return value, never an error; the reasons
//! feed diagnostics only and carry no control flow beyond the rejection
//! itself. Concrete checkers compose through [`CheckerOfCheckers`], a
//! short-circuiting AND.

pub mod body_collision_checker;
pub mod cliff_checker;
pub mod snap_checker;

pub use body_collision_checker::BodyCollisionChecker;
pub use cliff_checker::CliffAvoidanceChecker;
pub use snap_checker::SnapBasedChecker;

use crate::geometry::PlanarRegionsList;
use crate::graph::FootstepNode;
use crate::snapping::FootstepSnapper;

/// Why a candidate footstep node was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    CouldNotSnap,
    SurfaceInclineTooSteep,
    InsufficientFoothold,
    StepInPlace,
    SteppingOnStanceFoot,
    StepTooHighOrLow,
    ObstacleBlockingBody,
    AtCliffBottom,
}

/// Feasibility predicate over footstep nodes
pub trait FootstepNodeChecker {
    fn set_planar_regions(&mut self, _regions: Option<PlanarRegionsList>) {}

    /// Ok when the node may be placed after `previous`; the snapper is
    /// shared so checkers reuse memoized snap results
    fn check(
        &self,
        node: &FootstepNode,
        previous: Option<&FootstepNode>,
        snapper: &mut dyn FootstepSnapper,
    ) -> Result<(), RejectionReason>;
}

/// Logical AND over a sequence of checkers, short-circuiting on the first
/// rejection
pub struct CheckerOfCheckers {
    checkers: Vec<Box<dyn FootstepNodeChecker>>,
}

impl CheckerOfCheckers {
    pub fn new(checkers: Vec<Box<dyn FootstepNodeChecker>>) -> Self {
        Self { checkers }
    }
}

impl FootstepNodeChecker for CheckerOfCheckers {
    fn set_planar_regions(&mut self, regions: Option<PlanarRegionsList>) {
        for checker in &mut self.checkers {
            checker.set_planar_regions(regions.clone());
        }
    }

    fn check(
        &self,
        node: &FootstepNode,
        previous: Option<&FootstepNode>,
        snapper: &mut dyn FootstepSnapper,
    ) -> Result<(), RejectionReason> {
        for checker in &self.checkers {
            checker.check(node, previous, snapper)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::RobotSide;
    use crate::snapping::FlatGroundSnapper;
    use crate::common::SideDependent;
    use crate::geometry::ConvexPolygon2D;

    struct AlwaysValid;
    impl FootstepNodeChecker for AlwaysValid {
        fn check(
            &self,
            _node: &FootstepNode,
            _previous: Option<&FootstepNode>,
            _snapper: &mut dyn FootstepSnapper,
        ) -> Result<(), RejectionReason> {
            Ok(())
        }
    }

    struct AlwaysRejects(RejectionReason);
    impl FootstepNodeChecker for AlwaysRejects {
        fn check(
            &self,
            _node: &FootstepNode,
            _previous: Option<&FootstepNode>,
            _snapper: &mut dyn FootstepSnapper,
        ) -> Result<(), RejectionReason> {
            Err(self.0)
        }
    }

    #[test]
    fn test_composition_short_circuits_with_first_reason() {
        let composite = CheckerOfCheckers::new(vec![
            Box::new(AlwaysValid),
            Box::new(AlwaysRejects(RejectionReason::AtCliffBottom)),
            Box::new(AlwaysRejects(RejectionReason::CouldNotSnap)),
        ]);
        let mut snapper =
            FlatGroundSnapper::new(SideDependent::both(ConvexPolygon2D::rectangle(0.2, 0.1)));
        let node = FootstepNode::new(0.0, 0.0, 0.0, RobotSide::Left);
        assert_eq!(
            composite.check(&node, None, &mut snapper),
            Err(RejectionReason::AtCliffBottom)
        );
    }

    #[test]
    fn test_all_valid_passes() {
        let composite = CheckerOfCheckers::new(vec![Box::new(AlwaysValid), Box::new(AlwaysValid)]);
        let mut snapper =
            FlatGroundSnapper::new(SideDependent::both(ConvexPolygon2D::rectangle(0.2, 0.1)));
        let node = FootstepNode::new(0.0, 0.0, 0.0, RobotSide::Left);
        assert!(composite.check(&node, None, &mut snapper).is_ok());
    }
}
