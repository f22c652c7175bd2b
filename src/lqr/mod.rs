//! LQR/Riccati trajectory-tracking math.
//!
//! Time-varying linear-quadratic tracking for the CoM/VRP dynamics:
//! backward value-function propagation over contact and flight segments,
//! feedback/feedforward computation, a discrete tracking solver, and
//! dynamic-feasibility validation of footstep plans.

pub mod dynamics;
pub mod momentum_controller;
pub mod s1_function;
pub mod s2_function;
pub mod tracking_solver;
pub mod trajectory;
pub mod validator;

pub use dynamics::LqrDynamics;
pub use momentum_controller::{LqrControlInput, LqrMomentumController};
pub use s1_function::{AlgebraicS1Function, DifferentialS1Segment, FlightS1Function, S1Function};
pub use s2_function::{
    AlgebraicS2Function, AlgebraicS2Segment, DifferentialS2Segment, FlightS2Function, S2Function,
};
pub use tracking_solver::DiscreteTrackingLqrSolver;
pub use trajectory::{ContactState, Polynomial3D};
pub use validator::{DynamicsValidator, LqrSettings};
