//! Error types for vocnext-core

use thiserror::Error;

/// Result type alias for block construction and evaluation.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while configuring or evaluating residual blocks.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid block hyperparameters. Raised at construction and never retried.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Caller-supplied tensor rejected before it reached the tensor engine.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Real and imaginary parts of a complex feature map disagree.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Error surfaced unmodified from the tensor engine.
    #[error("Candle error: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<Error> for candle_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Candle(inner) => inner,
            other => candle_core::Error::Msg(other.to_string()),
        }
    }
}

impl Error {
    /// Whether the error comes from block configuration rather than evaluation.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::ConfigError(_))
    }
}
