use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("burden is switched off")]
    Inactive,
    #[error("no load step selected")]
    NoStepSelected,
    #[error("invalid load step: {0}")]
    InvalidStep(String),
    #[error("reference meter timeout")]
    Timeout,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
