use thiserror::Error;

pub type PnResult<T> = Result<T, PnError>;

/// Numeric errors shared across the workspace. Domain crates wrap this in
/// their own error enums.
#[derive(Error, Debug, Clone, Copy)]
pub enum PnError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },
}
