use thiserror::Error;

/// Validation failures raised while building or decoding model values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Wrong shape: field count, empty input, unknown flags.
    #[error("invalid argument: {0}")]
    Argument(String),
    /// A field that should be numeric could not be decoded.
    #[error("invalid format: {0}")]
    Format(String),
    /// A trim value outside `0..=127`.
    #[error("{field} value {value} out of range 0..=127")]
    Range { field: &'static str, value: u8 },
}
