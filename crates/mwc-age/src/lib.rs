//! Age encryption for payment proofs and transaction responses
//!
//! Implements the subset of the age file format used between wallets: a
//! single X25519 recipient stanza (derived from the recipient's Ed25519
//! address key) and a ChaCha20-Poly1305 chunked payload. Passphrase (scrypt)
//! stanzas are rejected.
//!
//! Decryption is split: the host parses and validates the container, while an
//! [`AgeDecryptor`] holding the private key opens each payload chunk.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod decryptor;
pub mod error;
pub mod header;
pub mod keys;
pub mod retry;

pub use codec::{decrypt, encrypt, encrypt_with_rng};
pub use decryptor::{AgeDecryptor, SoftwareAgeDecryptor};
pub use error::{Error, Result};
pub use header::{Header, X25519Stanza};
pub use keys::{chunk_nonce, x25519_public_key, EncryptedFileKey};
pub use retry::retry_until_ok;

/// Length of the random file key
pub const FILE_KEY_LENGTH: usize = 16;

/// Length of the nonce that starts the payload
pub const PAYLOAD_NONCE_LENGTH: usize = 16;

/// Largest plaintext chunk
pub const MAXIMUM_PAYLOAD_CHUNK_LENGTH: usize = 1 << 16;

/// Length of the header MAC
pub const MAC_LENGTH: usize = 32;

/// Poly1305 tag length
pub const TAG_LENGTH: usize = 16;

/// Length of an X25519 (or Ed25519) public key
pub const X25519_KEY_LENGTH: usize = 32;
