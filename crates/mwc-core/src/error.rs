//! Error types for MWC Core
//!
//! Error taxonomy for identifiers, proof messages and persisted wallet state.

use std::fmt;

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// MWC Core errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or out-of-range identifier
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Proof message could not be decoded
    #[error("Invalid proof message: {0}")]
    InvalidMessage(String),

    /// Invalid key material
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Derived rewind nonce is not a usable secret key
    #[error("Invalid rewind nonce")]
    InvalidNonce,

    /// Invalid caller-supplied parameters
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// Hex decoding error
    #[error("Hex error: {0}")]
    Hex(#[from] hex::FromHexError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidIdentifier(_) => ErrorCategory::Identifier,
            Error::InvalidMessage(_) | Error::InvalidNonce => ErrorCategory::Proof,
            Error::InvalidKey(_) => ErrorCategory::Keys,
            Error::InvalidParameters(_) => ErrorCategory::Parameters,
            Error::Hex(_) | Error::Serialization(_) => ErrorCategory::Serialization,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Identifier-related errors
    Identifier,
    /// Bulletproof rewind / message errors
    Proof,
    /// Key-related errors
    Keys,
    /// Caller input errors
    Parameters,
    /// Encoding errors
    Serialization,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Identifier => write!(f, "Identifier"),
            ErrorCategory::Proof => write!(f, "Proof"),
            ErrorCategory::Keys => write!(f, "Keys"),
            ErrorCategory::Parameters => write!(f, "Parameters"),
            ErrorCategory::Serialization => write!(f, "Serialization"),
        }
    }
}
