//! pn-model: constraint-assembly core for steady-state pipe-network hydraulics.
//!
//! For a given network snapshot this crate builds a smooth, differentiable
//! system of algebraic equations (mass balance per node, headloss per link,
//! demand-pressure relation per node, leak relation per node) suitable for
//! repeated Newton-type solution, and incrementally rebuilds only the
//! equations affected by a state change between time steps.
//!
//! Structure:
//! - [`smoothing`]: C1-continuous blends between physical regimes
//! - [`status`]: pure regime classifiers for links and nodes
//! - [`constraints`]: one builder per physical relation
//! - [`registry`]: (entity, attribute) -> builder dirty tracking
//! - [`model`]: named variable/parameter/constraint collections

pub mod constants;
pub mod constraints;
pub mod error;
pub mod model;
pub mod options;
pub mod registry;
pub mod smoothing;
pub mod status;

pub use constants::Constants;
pub use error::{ModelError, ModelResult};
pub use model::{ConstraintSet, HydraulicModel};
pub use options::{DemandModel, HydraulicOptions};
pub use registry::{AttrValue, Attribute, BuilderKind, ChangeRegistry, Element};
