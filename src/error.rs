//! Error types for the noesis personalization core
//!
//! This module provides structured error handling using thiserror for
//! error definitions and anyhow for error propagation at the boundary.
//!
//! The core distinguishes three failure classes:
//! - `InvalidInput` is surfaced to the caller and never retried
//!   (e.g. an empty candidate set passed to the bandit).
//! - `InsufficientData` exists for callers that translate external
//!   failures (storage, cache) before invoking this core. The core itself
//!   never produces it: empty histories, missing patterns, and absent
//!   peers all degrade to documented low-confidence defaults.
//! - Numeric degeneracy (zero variance, single-row embedding input) is
//!   handled by fallback branches inside the components and is not an
//!   error at all.

use thiserror::Error;

/// Main error type for noesis operations
#[derive(Error, Debug)]
pub enum NoesisError {
    /// Caller supplied input the operation cannot act on
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An external collaborator could not supply the required data
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for noesis operations
pub type Result<T> = std::result::Result<T, NoesisError>;

/// Convert anyhow::Error to NoesisError
impl From<anyhow::Error> for NoesisError {
    fn from(err: anyhow::Error) -> Self {
        NoesisError::Other(err.to_string())
    }
}
