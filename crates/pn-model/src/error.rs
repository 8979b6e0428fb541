//! Error types for model construction and constraint building.

use crate::smoothing::SmoothingError;
use pn_core::PnError;
use thiserror::Error;

/// Errors raised while building or rebuilding the hydraulic model.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error(transparent)]
    Smoothing(#[from] SmoothingError),

    #[error(transparent)]
    Numeric(#[from] PnError),

    #[error("Unknown {what} '{name}' in constraint builder")]
    UnknownEntity { what: &'static str, name: String },

    /// A status value outside the contract reached a builder. This is a
    /// programming defect upstream, not a recoverable condition.
    #[error("Status out of contract for '{entity}': {detail}")]
    UnexpectedStatus { entity: String, detail: String },
}

pub type ModelResult<T> = Result<T, ModelError>;
