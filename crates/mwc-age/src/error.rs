//! Error types for the age codec

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Age codec errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed container, bad stanza count or bad recipient key
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// The decryption device failed or refused a chunk
    #[error("Device error: {0}")]
    Device(String),

    /// Authenticated decryption or key derivation failed
    #[error("Crypto error: {0}")]
    Crypto(String),
}

impl Error {
    pub(crate) fn invalid_file() -> Self {
        Error::InvalidParameters("Invalid age file".to_string())
    }
}
