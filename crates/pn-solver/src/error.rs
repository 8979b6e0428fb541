//! Error types for solver operations.

use pn_model::ModelError;
use thiserror::Error;

/// Errors that can occur while assembling or solving the hydraulic system.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Problem setup error: {what}")]
    ProblemSetup { what: String },

    /// The Newton loop or the status rounds did not converge. Recoverable:
    /// the caller decides whether to retry with other settings or skip the
    /// time step.
    #[error("Convergence failed: {what}")]
    ConvergenceFailed { what: String },

    #[error("Numeric error: {what}")]
    Numeric { what: String },

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

impl SolverError {
    /// Whether the caller can reasonably retry (relaxed settings, skipped
    /// time step) rather than abort the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SolverError::ConvergenceFailed { .. })
    }
}

pub type SolverResult<T> = Result<T, SolverError>;
