use burden_traits::ModelError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("invalid argument: {0}")]
    Argument(String),
    #[error("unsupported burden '{0}' (expected IEC50, IEC60 or ANSI)")]
    UnsupportedBurden(String),
    #[error("load point {burden} / {range} / {step} is not calibratable")]
    NotCalibratable {
        burden: String,
        range: String,
        step: String,
    },
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("timeout waiting for reference meter")]
    Timeout,
    #[error("calibration cancelled")]
    Cancelled,
    #[error("invalid state: {0}")]
    State(String),
}

impl CalibrationError {
    /// True for malformed caller input (as opposed to hardware or runtime failures).
    pub fn is_argument(&self) -> bool {
        matches!(
            self,
            Self::Argument(_) | Self::UnsupportedBurden(_) | Self::Model(_)
        )
    }
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
