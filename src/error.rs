//! Error types for CapMitra.

use std::time::Duration;

/// Top-level error type for the loan-origination core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("Calculation error: {0}")]
    Calc(#[from] CalcError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to load data file {path}: {reason}")]
    DataFile { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Collaborator I/O errors.
///
/// Both variants are *transient* at the orchestration layer: the turn that hit
/// them does not advance the session state, and the user is asked to retry.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("Collaborator {name} timed out after {timeout:?}")]
    Timeout { name: String, timeout: Duration },

    #[error("Collaborator {name} failed: {reason}")]
    Failed { name: String, reason: String },
}

impl CollaboratorError {
    pub fn failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Plan-calculator input errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CalcError {
    #[error("Invalid tenure: {0} months (must be positive)")]
    InvalidTenure(u32),
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
