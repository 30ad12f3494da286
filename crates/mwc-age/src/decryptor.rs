//! Chunk decryption capability
//!
//! The recipient's private key normally lives on a hardware wallet, so the
//! codec hands every payload chunk to an [`AgeDecryptor`] together with the
//! stanza it needs to recover the file key.

use crate::keys::{self, EncryptedFileKey};
use crate::{Error, Result, FILE_KEY_LENGTH, PAYLOAD_NONCE_LENGTH, X25519_KEY_LENGTH};
use async_trait::async_trait;
use curve25519_dalek::montgomery::MontgomeryPoint;
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

/// Decrypts one age payload chunk with a private key the caller never sees
#[async_trait]
pub trait AgeDecryptor: Send + Sync {
    /// Recover the file key from the stanza and open `chunk` with `chunk_nonce`
    async fn decrypt_age_chunk(
        &self,
        derivation_path: &str,
        ephemeral_public_key: &[u8; X25519_KEY_LENGTH],
        encrypted_file_key: &EncryptedFileKey,
        payload_nonce: &[u8; PAYLOAD_NONCE_LENGTH],
        chunk_nonce: &[u8; 12],
        chunk: &[u8],
    ) -> Result<Vec<u8>>;
}

/// In-process decryptor holding an Ed25519 key
///
/// Serves accounts whose key is not on a device, and tests.
pub struct SoftwareAgeDecryptor {
    signing_key: SigningKey,
}

impl SoftwareAgeDecryptor {
    /// Wrap an existing signing key
    pub fn new(signing_key: SigningKey) -> Self {
        Self { signing_key }
    }

    /// Create from a 32 byte Ed25519 seed
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::new(SigningKey::from_bytes(seed))
    }

    /// Generate a random key
    pub fn generate() -> Self {
        Self::new(SigningKey::generate(&mut OsRng))
    }

    /// Ed25519 public key to encrypt to
    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    fn file_key(
        &self,
        ephemeral_public_key: &[u8; X25519_KEY_LENGTH],
        encrypted_file_key: &EncryptedFileKey,
    ) -> Result<Zeroizing<[u8; FILE_KEY_LENGTH]>> {
        let ephemeral = MontgomeryPoint(*ephemeral_public_key);
        let own = self.signing_key.verifying_key().to_montgomery();
        let shared_secret = keys::shared_secret(&self.signing_key, &ephemeral)?;
        let wrap_key = keys::wrap_key(&shared_secret[..], &ephemeral, &own)?;
        let file_key = Zeroizing::new(keys::open(&wrap_key[..], &[0u8; 12], encrypted_file_key)?);
        if file_key.len() != FILE_KEY_LENGTH {
            return Err(Error::Crypto("Unexpected file key length".to_string()));
        }
        let mut output = Zeroizing::new([0u8; FILE_KEY_LENGTH]);
        output.copy_from_slice(&file_key[..]);
        Ok(output)
    }
}

#[async_trait]
impl AgeDecryptor for SoftwareAgeDecryptor {
    async fn decrypt_age_chunk(
        &self,
        derivation_path: &str,
        ephemeral_public_key: &[u8; X25519_KEY_LENGTH],
        encrypted_file_key: &EncryptedFileKey,
        payload_nonce: &[u8; PAYLOAD_NONCE_LENGTH],
        chunk_nonce: &[u8; 12],
        chunk: &[u8],
    ) -> Result<Vec<u8>> {
        tracing::trace!(derivation_path, chunk_len = chunk.len(), "Decrypting age chunk");
        let file_key = self.file_key(ephemeral_public_key, encrypted_file_key)?;
        let payload_key = keys::payload_key(&file_key[..], payload_nonce)?;
        keys::open(&payload_key[..], chunk_nonce, chunk)
    }
}

impl std::fmt::Debug for SoftwareAgeDecryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareAgeDecryptor")
            .field("public_key", &self.signing_key.verifying_key())
            .finish()
    }
}
