//! MimbleWimble-family currency parameters and constants
//!
//! This crate provides the supported currency variants (MimbleWimble Coin, Grin,
//! Epic Cash and their test networks) and the consensus parameters the wallet
//! scanner depends on.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod consensus;
pub mod currency;

pub use consensus::ConsensusParams;
pub use currency::Currency;

/// Error types for parameter operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unknown currency id
    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),
}

/// Result type for parameter operations
pub type Result<T> = std::result::Result<T, Error>;
