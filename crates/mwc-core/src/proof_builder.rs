//! Bulletproof rewind support
//!
//! Owned outputs carry a 20 byte message inside their bulletproof: two
//! reserved zero bytes, the switch commitment type and the output identifier.
//! The proof can only be rewound with a nonce derived from the wallet's root
//! public key and the output commitment.

use crate::identifier::Identifier;
use crate::operation::Commitment;
use crate::{Error, Result};
use secp256k1::{PublicKey, SecretKey};
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

/// Length of the message embedded in a bulletproof
pub const MESSAGE_LENGTH: usize = 20;

const RESERVED_LENGTH: usize = 2;
const SWITCH_TYPE_INDEX: usize = RESERVED_LENGTH;
const IDENTIFIER_OFFSET: usize = SWITCH_TYPE_INDEX + 1;

const NONCE_LENGTH: usize = 32;

/// Switch commitment type of an output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SwitchType {
    /// No switch commitment
    None = 0,
    /// Regular switch commitment
    Regular = 1,
}

impl TryFrom<u8> for SwitchType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(SwitchType::None),
            1 => Ok(SwitchType::Regular),
            other => Err(Error::InvalidMessage(format!("unknown switch type {}", other))),
        }
    }
}

impl From<SwitchType> for u8 {
    fn from(switch_type: SwitchType) -> Self {
        switch_type as u8
    }
}

/// Build the message embedded in an output's bulletproof
pub fn encode_message(identifier: &Identifier, switch_type: SwitchType) -> [u8; MESSAGE_LENGTH] {
    let mut message = [0u8; MESSAGE_LENGTH];
    message[SWITCH_TYPE_INDEX] = switch_type.into();
    message[IDENTIFIER_OFFSET..].copy_from_slice(&identifier.to_bytes());
    message
}

/// Split a rewound bulletproof message into its identifier and switch type
pub fn decode_message(message: &[u8]) -> Result<(Identifier, SwitchType)> {
    if message.len() != MESSAGE_LENGTH {
        debug!(length = message.len(), "Rejecting proof message with wrong length");
        return Err(Error::InvalidMessage(format!(
            "expected {} bytes, got {}",
            MESSAGE_LENGTH,
            message.len()
        )));
    }
    if message[..RESERVED_LENGTH].iter().any(|&byte| byte != 0) {
        debug!("Rejecting proof message with non-zero reserved bytes");
        return Err(Error::InvalidMessage("reserved bytes are not zero".to_string()));
    }
    let switch_type = SwitchType::try_from(message[SWITCH_TYPE_INDEX])?;
    let identifier = Identifier::from_bytes(&message[IDENTIFIER_OFFSET..])?;
    Ok((identifier, switch_type))
}

/// Derives per-output rewind nonces from the account's root public key
#[derive(Clone)]
pub struct ProofBuilder {
    rewind_hash: Zeroizing<[u8; NONCE_LENGTH]>,
}

impl ProofBuilder {
    /// Create from a serialized secp256k1 root public key
    pub fn new(root_public_key: &[u8]) -> Result<Self> {
        let public_key = PublicKey::from_slice(root_public_key)
            .map_err(|e| Error::InvalidKey(format!("root public key: {}", e)))?;
        let hash = blake2b_simd::Params::new()
            .hash_length(NONCE_LENGTH)
            .hash(&public_key.serialize());
        let mut rewind_hash = Zeroizing::new([0u8; NONCE_LENGTH]);
        rewind_hash.copy_from_slice(hash.as_bytes());
        Ok(Self { rewind_hash })
    }

    /// Rewind nonce for an output commitment
    ///
    /// Fails with [`Error::InvalidNonce`] when the derived bytes are not a
    /// valid secp256k1 secret key; such outputs cannot belong to the wallet.
    pub fn rewind_nonce(&self, commitment: &Commitment) -> Result<Zeroizing<[u8; NONCE_LENGTH]>> {
        let hash = blake2b_simd::Params::new()
            .hash_length(NONCE_LENGTH)
            .key(commitment.as_bytes())
            .hash(&self.rewind_hash[..]);
        if SecretKey::from_slice(hash.as_bytes()).is_err() {
            debug!(%commitment, "Rewind nonce is not a valid secret key");
            return Err(Error::InvalidNonce);
        }
        let mut nonce = Zeroizing::new([0u8; NONCE_LENGTH]);
        nonce.copy_from_slice(hash.as_bytes());
        Ok(nonce)
    }
}

impl std::fmt::Debug for ProofBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofBuilder").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_public_key() -> Vec<u8> {
        let secp = secp256k1::Secp256k1::new();
        let secret = SecretKey::from_slice(&[0x11; 32]).unwrap();
        PublicKey::from_secret_key(&secp, &secret).serialize().to_vec()
    }

    #[test]
    fn test_message_layout() {
        let identifier = Identifier::new(3, [0, 0, 42, 0]).unwrap();
        let message = encode_message(&identifier, SwitchType::Regular);
        assert_eq!(&message[..3], &[0, 0, 1]);
        assert_eq!(&message[3..], &identifier.to_bytes());
        assert_eq!(decode_message(&message).unwrap(), (identifier, SwitchType::Regular));
    }

    #[test]
    fn test_decode_rejects_malformed_messages() {
        let identifier = Identifier::new(3, [0, 0, 1, 0]).unwrap();
        let good = encode_message(&identifier, SwitchType::None);

        assert!(decode_message(&good[..19]).is_err());

        let mut reserved = good;
        reserved[1] = 1;
        assert!(matches!(decode_message(&reserved), Err(Error::InvalidMessage(_))));

        let mut switch = good;
        switch[2] = 2;
        assert!(matches!(decode_message(&switch), Err(Error::InvalidMessage(_))));

        let mut depth = good;
        depth[3] = 9;
        assert!(matches!(decode_message(&depth), Err(Error::InvalidIdentifier(_))));
    }

    #[test]
    fn test_rewind_nonce_is_deterministic_per_commitment() {
        let builder = ProofBuilder::new(&root_public_key()).unwrap();
        let first = Commitment::from_bytes([0x08; 33]);
        let second = Commitment::from_bytes([0x09; 33]);

        let nonce = builder.rewind_nonce(&first).unwrap();
        assert_eq!(*nonce, *builder.rewind_nonce(&first).unwrap());
        assert_ne!(*nonce, *builder.rewind_nonce(&second).unwrap());

        let other = ProofBuilder::new(&root_public_key()).unwrap();
        assert_eq!(*nonce, *other.rewind_nonce(&first).unwrap());
    }

    #[test]
    fn test_rewind_nonce_matches_keyed_blake2b() {
        let root = root_public_key();
        let builder = ProofBuilder::new(&root).unwrap();
        let commitment = Commitment::from_bytes([0x09; 33]);

        let rewind_hash = blake2b_simd::Params::new().hash_length(32).hash(&root);
        let expected = blake2b_simd::Params::new()
            .hash_length(32)
            .key(commitment.as_bytes())
            .hash(rewind_hash.as_bytes());
        assert_eq!(&builder.rewind_nonce(&commitment).unwrap()[..], expected.as_bytes());
    }

    #[test]
    fn test_rejections_are_logged_not_raised() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            assert!(decode_message(&[0u8; 5]).is_err());
            assert!(decode_message(&[1u8; MESSAGE_LENGTH]).is_err());
            let builder = ProofBuilder::new(&root_public_key()).unwrap();
            assert!(builder.rewind_nonce(&Commitment::from_bytes([0x08; 33])).is_ok());
        });
    }

    #[test]
    fn test_rejects_invalid_root_key() {
        assert!(matches!(ProofBuilder::new(&[0u8; 33]), Err(Error::InvalidKey(_))));
        assert!(ProofBuilder::new(&[0x02; 12]).is_err());
    }

    #[test]
    fn test_switch_type_serde() {
        assert_eq!(serde_json::to_string(&SwitchType::Regular).unwrap(), "1");
        assert_eq!(serde_json::from_str::<SwitchType>("0").unwrap(), SwitchType::None);
        assert!(serde_json::from_str::<SwitchType>("5").is_err());
    }
}
