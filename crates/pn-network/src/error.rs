//! Error types for network construction and lookup.

use thiserror::Error;

/// Errors that can occur while building or querying a network.
#[derive(Error, Debug, Clone)]
pub enum NetworkError {
    #[error("Duplicate {what} name: '{name}'")]
    DuplicateName { what: &'static str, name: String },

    #[error("Unknown node '{name}' referenced by link '{link}'")]
    UnknownEndpoint { name: String, link: String },

    #[error("Unknown {what}: '{name}'")]
    UnknownName { what: &'static str, name: String },

    #[error("Non-positive {what} on '{name}': {value}")]
    NonPositive {
        what: &'static str,
        name: String,
        value: f64,
    },

    #[error("Invalid {what} on '{name}': {detail}")]
    Invalid {
        what: &'static str,
        name: String,
        detail: String,
    },
}

pub type NetworkResult<T> = Result<T, NetworkError>;
