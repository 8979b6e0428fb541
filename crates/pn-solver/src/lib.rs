//! pn-solver: steady-state solution of the hydraulic constraint system.
//!
//! Assembles the live constraints of a [`pn_model::HydraulicModel`] into a
//! square nonlinear system (variables ordered by name, dense Jacobian from
//! forward-mode differentiation) and solves it with a damped Newton
//! iteration. [`HydraulicEngine`] drives whole time steps: classify,
//! rebuild changed constraints, solve, re-classify until the status tags
//! settle.

pub mod assembly;
pub mod engine;
pub mod error;
pub mod newton;

pub use assembly::Assembly;
pub use engine::{EngineConfig, HydraulicEngine, SolveReport};
pub use error::{SolverError, SolverResult};
pub use newton::{NewtonConfig, NewtonResult, newton_solve};
