use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid severity '{0}' (expected one of: low, medium, high, critical)")]
    InvalidSeverity(String),

    #[error("invalid output format '{0}' (expected json or text)")]
    InvalidFormat(String),
}
