//! pn-core: stable foundation for pipenet.
//!
//! Contains:
//! - numeric (Real + tolerances + float helpers)
//! - error (shared error types)

pub mod error;
pub mod numeric;

// Re-exports: nice ergonomics for downstream crates
pub use error::{PnError, PnResult};
pub use numeric::*;
