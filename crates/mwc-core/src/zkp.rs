//! Bulletproof primitives used by the scanner
//!
//! The range proof implementation lives outside this crate (a native
//! secp256k1-zkp binding on desktop, a wasm build elsewhere). Implementors
//! report failure as `None`/`false` rather than an error: a proof that does not
//! rewind simply belongs to somebody else.

use crate::operation::Commitment;
use async_trait::async_trait;

/// Value and message recovered by rewinding a bulletproof
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewoundProof {
    /// Output amount in atomic units
    pub value: u64,
    /// Message embedded by the output's creator
    pub message: Vec<u8>,
}

/// Bulletproof rewind and verification
#[async_trait]
pub trait Secp256k1Zkp: Send + Sync {
    /// Rewind `proof` for `commitment` with `nonce`
    async fn rewind_bulletproof(
        &self,
        proof: &[u8],
        commitment: &Commitment,
        nonce: &[u8; 32],
    ) -> Option<RewoundProof>;

    /// Verify `proof` for `commitment` with optional extra committed data
    async fn verify_bulletproof(&self, proof: &[u8], commitment: &Commitment, extra: &[u8]) -> bool;
}
