//! Error types for ZoundForge

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum ZfError {
    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    #[error("Invalid {what} range: min {min} > max {max}")]
    InvalidRange { what: &'static str, min: f32, max: f32 },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias
pub type ZfResult<T> = Result<T, ZfError>;
