//! Error types for scrub.

use thiserror::Error;

/// Result type for scrub operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for scrub operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Configuration file could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A declarative rule is malformed (unknown category, bad context pattern).
    #[error("Invalid rule '{name}': {reason}")]
    InvalidRule {
        /// Name of the offending rule.
        name: String,
        /// Why the rule was rejected.
        reason: String,
    },

    /// A span is malformed (empty range, out-of-bounds positions).
    #[error("Invalid span: {0}")]
    InvalidSpan(String),

    /// Rule evaluation failed; the reasoning pass degrades to a no-op.
    #[error("Reasoning failed: {0}")]
    Reasoning(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create an invalid-rule error.
    pub fn invalid_rule(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidRule {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid-span error.
    pub fn invalid_span(msg: impl Into<String>) -> Self {
        Error::InvalidSpan(msg.into())
    }

    /// Create a reasoning error.
    pub fn reasoning(msg: impl Into<String>) -> Self {
        Error::Reasoning(msg.into())
    }
}
