//! Age file encryption and decryption

use crate::decryptor::AgeDecryptor;
use crate::header::{self, X25519Stanza};
use crate::keys::{self, EncryptedFileKey};
use crate::retry::retry_until_ok;
use crate::{
    Error, Result, FILE_KEY_LENGTH, MAXIMUM_PAYLOAD_CHUNK_LENGTH, PAYLOAD_NONCE_LENGTH, TAG_LENGTH,
};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

const ENCRYPTED_CHUNK_LENGTH: usize = MAXIMUM_PAYLOAD_CHUNK_LENGTH + TAG_LENGTH;

/// Encrypt `data` to the owner of an Ed25519 public key
pub fn encrypt(data: &[u8], recipient_ed25519_public_key: &[u8]) -> Result<Vec<u8>> {
    encrypt_with_rng(&mut OsRng, data, recipient_ed25519_public_key)
}

/// [`encrypt`] with a caller-supplied random source
pub fn encrypt_with_rng<R>(rng: &mut R, data: &[u8], recipient_ed25519_public_key: &[u8]) -> Result<Vec<u8>>
where
    R: RngCore + CryptoRng,
{
    let recipient = keys::x25519_public_key(recipient_ed25519_public_key)?;

    // Only success ends this loop; small-order recipients were rejected above.
    let agreement = retry_until_ok(None, |_| keys::ephemeral_agreement(&mut *rng, &recipient))?;
    let wrap_key = keys::wrap_key(&agreement.shared_secret[..], &agreement.public_key, &recipient)?;
    drop(agreement.shared_secret);

    let mut file_key = Zeroizing::new([0u8; FILE_KEY_LENGTH]);
    rng.fill_bytes(&mut file_key[..]);
    let encrypted_file_key: EncryptedFileKey = keys::seal(&wrap_key[..], &[0u8; 12], &file_key[..])?
        .try_into()
        .map_err(|_| Error::Crypto("Unexpected encrypted file key length".to_string()))?;

    let stanza = X25519Stanza {
        ephemeral_public_key: agreement.public_key.to_bytes(),
        encrypted_file_key,
    };
    let header_text = stanza.header_without_mac();
    let mac = keys::header_mac(&file_key[..], header_text.as_bytes())?;

    let mut payload_nonce = [0u8; PAYLOAD_NONCE_LENGTH];
    rng.fill_bytes(&mut payload_nonce);
    let payload_key = keys::payload_key(&file_key[..], &payload_nonce)?;
    drop(file_key);

    let header_text = header::complete_header(header_text, &mac);
    let number_of_chunks = data.len() / MAXIMUM_PAYLOAD_CHUNK_LENGTH + 1;
    let mut age_file = Vec::with_capacity(
        header_text.len() + PAYLOAD_NONCE_LENGTH + data.len() + number_of_chunks * TAG_LENGTH,
    );
    age_file.extend_from_slice(header_text.as_bytes());
    age_file.extend_from_slice(&payload_nonce);

    for index in 0..number_of_chunks {
        let start = index * MAXIMUM_PAYLOAD_CHUNK_LENGTH;
        let end = (start + MAXIMUM_PAYLOAD_CHUNK_LENGTH).min(data.len());
        let nonce = keys::chunk_nonce(index as u64, index + 1 == number_of_chunks);
        age_file.extend_from_slice(&keys::seal(&payload_key[..], &nonce, &data[start..end])?);
    }

    tracing::debug!(
        data_len = data.len(),
        chunks = number_of_chunks,
        "Encrypted age payload"
    );
    Ok(age_file)
}

/// Decrypt an age file, delegating every chunk to `decryptor`
///
/// `derivation_path` selects the account key on the decryptor.
pub async fn decrypt<D>(derivation_path: &str, age_file: &[u8], decryptor: &D) -> Result<Vec<u8>>
where
    D: AgeDecryptor + ?Sized,
{
    let (header, payload) = header::parse(age_file)?;
    if payload.len() < PAYLOAD_NONCE_LENGTH + TAG_LENGTH {
        return Err(Error::invalid_file());
    }
    let (payload_nonce, chunks) = payload.split_at(PAYLOAD_NONCE_LENGTH);
    let payload_nonce: [u8; PAYLOAD_NONCE_LENGTH] =
        payload_nonce.try_into().map_err(|_| Error::invalid_file())?;

    let number_of_chunks = chunks.len().div_ceil(ENCRYPTED_CHUNK_LENGTH);
    let mut data = Vec::with_capacity(chunks.len().saturating_sub(number_of_chunks * TAG_LENGTH));
    for (index, chunk) in chunks.chunks(ENCRYPTED_CHUNK_LENGTH).enumerate() {
        if chunk.len() < TAG_LENGTH {
            return Err(Error::invalid_file());
        }
        let nonce = keys::chunk_nonce(index as u64, index + 1 == number_of_chunks);
        let plaintext = decryptor
            .decrypt_age_chunk(
                derivation_path,
                &header.stanza.ephemeral_public_key,
                &header.stanza.encrypted_file_key,
                &payload_nonce,
                &nonce,
                chunk,
            )
            .await?;
        data.extend_from_slice(&plaintext);
    }

    tracing::debug!(data_len = data.len(), chunks = number_of_chunks, "Decrypted age payload");
    Ok(data)
}
