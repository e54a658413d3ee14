//! Error types for Enact.

use thiserror::Error;

/// Result type alias using Enact's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Enact.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Policy Errors
    // =========================================================================
    #[error("Policy error: {0}")]
    Policy(String),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    Validation(String),

    // =========================================================================
    // Registry Errors
    // =========================================================================
    #[error("Tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error("Group '{0}' is already defined")]
    DuplicateGroup(String),

    #[error("Group '{0}' does not exist")]
    UnknownGroup(String),

    // =========================================================================
    // Oversight Errors
    // =========================================================================
    #[error("Oversight error: {0}")]
    Oversight(String),

    // =========================================================================
    // Audit Errors
    // =========================================================================
    #[error("Audit sink error: {0}")]
    Audit(String),

    // =========================================================================
    // Generic Errors
    // =========================================================================
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create a policy error.
    pub fn policy(msg: impl Into<String>) -> Self {
        Self::Policy(msg.into())
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an oversight error.
    pub fn oversight(msg: impl Into<String>) -> Self {
        Self::Oversight(msg.into())
    }

    /// Create an audit sink error.
    pub fn audit(msg: impl Into<String>) -> Self {
        Self::Audit(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
