//! X25519 key agreement and key derivation
//!
//! Wallet addresses are Ed25519 keys, so the recipient's X25519 key is the
//! Montgomery form of its Ed25519 public key and the secret side uses the
//! clamped Ed25519 secret scalar.

use crate::{Error, Result, FILE_KEY_LENGTH, TAG_LENGTH, X25519_KEY_LENGTH};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use curve25519_dalek::edwards::CompressedEdwardsY;
use curve25519_dalek::montgomery::MontgomeryPoint;
use ed25519_dalek::SigningKey;
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rand::{CryptoRng, RngCore};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// HKDF info for the stanza wrap key
pub(crate) const X25519_STANZA_INFO: &[u8] = b"age-encryption.org/v1/X25519";
/// HKDF info for the header MAC key
pub(crate) const HEADER_INFO: &[u8] = b"header";
/// HKDF info for the payload key
pub(crate) const PAYLOAD_INFO: &[u8] = b"payload";

/// ChaCha20-Poly1305 nonce length
pub(crate) const CHACHA_NONCE_LENGTH: usize = 12;

const SYMMETRIC_KEY_LENGTH: usize = 32;

/// Symmetric key that is wiped on drop
pub(crate) type SymmetricKey = Zeroizing<[u8; SYMMETRIC_KEY_LENGTH]>;

/// Encrypted file key as carried in the stanza body
pub type EncryptedFileKey = [u8; FILE_KEY_LENGTH + TAG_LENGTH];

/// Convert an Ed25519 public key to the X25519 key used as an age recipient
///
/// Keys that do not decompress, and small-order points (the identity
/// included), are rejected: agreement with them always yields a zero secret.
pub fn x25519_public_key(ed25519_public_key: &[u8]) -> Result<MontgomeryPoint> {
    let invalid = || Error::InvalidParameters("Invalid recipient Ed25519 public key".to_string());
    let bytes: [u8; X25519_KEY_LENGTH] = ed25519_public_key.try_into().map_err(|_| invalid())?;
    let point = CompressedEdwardsY(bytes).decompress().ok_or_else(invalid)?;
    if point.is_small_order() {
        return Err(invalid());
    }
    let montgomery = point.to_montgomery();
    if is_zero(montgomery.as_bytes()) {
        return Err(invalid());
    }
    Ok(montgomery)
}

/// Fresh ephemeral key and the secret it shares with a recipient
pub(crate) struct EphemeralAgreement {
    pub(crate) public_key: MontgomeryPoint,
    pub(crate) shared_secret: SymmetricKey,
}

/// Generate an ephemeral key pair and agree on a secret with `recipient`
///
/// The ephemeral secret is wiped before returning, including when the shared
/// secret turns out to be degenerate.
pub(crate) fn ephemeral_agreement<R>(rng: &mut R, recipient: &MontgomeryPoint) -> Result<EphemeralAgreement>
where
    R: RngCore + CryptoRng,
{
    let signing_key = SigningKey::generate(rng);
    let public_key = signing_key.verifying_key().to_montgomery();
    let shared_secret = shared_secret(&signing_key, recipient)?;
    Ok(EphemeralAgreement {
        public_key,
        shared_secret,
    })
}

/// X25519 agreement between an Ed25519 signing key and a Montgomery point
pub(crate) fn shared_secret(signing_key: &SigningKey, public_key: &MontgomeryPoint) -> Result<SymmetricKey> {
    let scalar = Zeroizing::new(signing_key.to_scalar_bytes());
    let shared = Zeroizing::new(public_key.mul_clamped(*scalar).to_bytes());
    if is_zero(&shared[..]) {
        return Err(Error::Crypto("Degenerate shared secret".to_string()));
    }
    Ok(shared)
}

/// HKDF-SHA256 with a 32 byte output
pub(crate) fn hkdf_sha256(salt: Option<&[u8]>, ikm: &[u8], info: &[u8]) -> Result<SymmetricKey> {
    let hkdf = Hkdf::<Sha256>::new(salt, ikm);
    let mut output = Zeroizing::new([0u8; SYMMETRIC_KEY_LENGTH]);
    hkdf.expand(info, &mut output[..])
        .map_err(|_| Error::Crypto("HKDF expansion failed".to_string()))?;
    Ok(output)
}

/// Stanza wrap key for a shared secret
pub(crate) fn wrap_key(
    shared_secret: &[u8],
    ephemeral_public_key: &MontgomeryPoint,
    recipient_public_key: &MontgomeryPoint,
) -> Result<SymmetricKey> {
    let mut salt = [0u8; 2 * X25519_KEY_LENGTH];
    salt[..X25519_KEY_LENGTH].copy_from_slice(ephemeral_public_key.as_bytes());
    salt[X25519_KEY_LENGTH..].copy_from_slice(recipient_public_key.as_bytes());
    hkdf_sha256(Some(&salt), shared_secret, X25519_STANZA_INFO)
}

/// Payload key derived from the file key and payload nonce
pub(crate) fn payload_key(file_key: &[u8], payload_nonce: &[u8]) -> Result<SymmetricKey> {
    hkdf_sha256(Some(payload_nonce), file_key, PAYLOAD_INFO)
}

/// HMAC-SHA256 of the header text under the file key's header key
pub(crate) fn header_mac(file_key: &[u8], header: &[u8]) -> Result<[u8; 32]> {
    let key = hkdf_sha256(None, file_key, HEADER_INFO)?;
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(&key[..])
        .map_err(|_| Error::Crypto("Invalid HMAC key".to_string()))?;
    mac.update(header);
    let mut output = [0u8; 32];
    output.copy_from_slice(&mac.finalize().into_bytes());
    Ok(output)
}

/// Nonce of payload chunk `index`
///
/// The big-endian index fills bytes 3..11 and the last byte flags the final chunk.
pub fn chunk_nonce(index: u64, last: bool) -> [u8; CHACHA_NONCE_LENGTH] {
    let mut nonce = [0u8; CHACHA_NONCE_LENGTH];
    nonce[CHACHA_NONCE_LENGTH - 1 - 8..CHACHA_NONCE_LENGTH - 1].copy_from_slice(&index.to_be_bytes());
    nonce[CHACHA_NONCE_LENGTH - 1] = u8::from(last);
    nonce
}

/// ChaCha20-Poly1305 seal, returning ciphertext followed by the tag
pub(crate) fn seal(key: &[u8], nonce: &[u8; CHACHA_NONCE_LENGTH], plaintext: &[u8]) -> Result<Vec<u8>> {
    ChaCha20Poly1305::new(Key::from_slice(key))
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| Error::Crypto(e.to_string()))
}

/// ChaCha20-Poly1305 open of ciphertext followed by the tag
pub(crate) fn open(key: &[u8], nonce: &[u8; CHACHA_NONCE_LENGTH], ciphertext: &[u8]) -> Result<Vec<u8>> {
    ChaCha20Poly1305::new(Key::from_slice(key))
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|e| Error::Crypto(e.to_string()))
}

fn is_zero(bytes: &[u8]) -> bool {
    let zero = [0u8; X25519_KEY_LENGTH];
    bytes.len() == zero.len() && bool::from(bytes.ct_eq(&zero[..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn test_chunk_nonce_layout() {
        let nonce = chunk_nonce(0x0102, true);
        assert_eq!(nonce, [0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 2, 1]);
        let nonce = chunk_nonce(u64::MAX, false);
        assert_eq!(&nonce[..3], &[0, 0, 0]);
        assert_eq!(&nonce[3..11], &[0xff; 8]);
        assert_eq!(nonce[11], 0);
    }

    #[test]
    fn test_agreement_is_symmetric() {
        let recipient = SigningKey::generate(&mut OsRng);
        let recipient_x25519 = x25519_public_key(recipient.verifying_key().as_bytes()).unwrap();
        let agreement = ephemeral_agreement(&mut OsRng, &recipient_x25519).unwrap();
        let other_side = shared_secret(&recipient, &agreement.public_key).unwrap();
        assert_eq!(*agreement.shared_secret, *other_side);
    }

    #[test]
    fn test_rejects_bad_recipient_keys() {
        // identity point
        let mut identity = [0u8; 32];
        identity[0] = 1;
        assert!(matches!(x25519_public_key(&identity), Err(Error::InvalidParameters(_))));
        // y = 0 is a point of order four
        assert!(x25519_public_key(&[0u8; 32]).is_err());
        assert!(x25519_public_key(&[1u8; 31]).is_err());
    }

    #[test]
    fn test_seal_open() {
        let key = [7u8; 32];
        let nonce = chunk_nonce(3, false);
        let sealed = seal(&key, &nonce, b"payload").unwrap();
        assert_eq!(sealed.len(), 7 + TAG_LENGTH);
        assert_eq!(open(&key, &nonce, &sealed).unwrap(), b"payload");
        assert!(open(&key, &chunk_nonce(3, true), &sealed).is_err());
    }
}
