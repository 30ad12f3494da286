//! Error types for sync operations

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Node RPC failure, returned by [`crate::Node`] implementations
    #[error("Node error: {0}")]
    Node(String),

    /// Core type error
    #[error("Core error: {0}")]
    Core(#[from] mwc_core::Error),

    /// Sync error
    #[error("Sync error: {0}")]
    Sync(String),
}
