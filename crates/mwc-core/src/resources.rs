//! Persisted per-account scanner resources
//!
//! The raw forms are what gets written to account storage: every byte field
//! is hex and heights are decimal strings so they survive JSON round trips
//! without precision loss.

use crate::identifier::Identifier;
use crate::recent_height::{BlockHash, RecentHeight, BLOCK_HASH_LENGTH};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Scanner state stored alongside an account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountResources {
    /// Compressed secp256k1 root public key used to derive rewind nonces
    pub root_public_key: Vec<u8>,
    /// Reorg-detection checkpoint ladder, newest first
    pub recent_heights: Vec<RecentHeight>,
    /// Next unused output identifier
    pub next_identifier: Identifier,
    /// Sequence number of the next transaction the account creates
    pub next_transaction_sequence_number: u64,
}

/// Serialized checkpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentHeightRaw {
    /// Decimal height
    pub height: String,
    /// Hex block hash
    pub hash: String,
}

/// Serialized account resources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResourcesRaw {
    /// Hex root public key
    pub root_public_key: String,
    /// Serialized checkpoints
    pub recent_heights: Vec<RecentHeightRaw>,
    /// Hex identifier
    pub next_identifier: String,
    /// Next transaction sequence number
    pub next_transaction_sequence_number: u64,
}

impl From<RecentHeight> for RecentHeightRaw {
    fn from(recent_height: RecentHeight) -> Self {
        Self {
            height: recent_height.height().to_string(),
            hash: hex::encode(recent_height.hash()),
        }
    }
}

impl TryFrom<RecentHeightRaw> for RecentHeight {
    type Error = Error;

    fn try_from(raw: RecentHeightRaw) -> Result<Self> {
        let height = raw
            .height
            .parse::<u64>()
            .map_err(|e| Error::Serialization(format!("Invalid height {:?}: {}", raw.height, e)))?;
        let hash: BlockHash = hex::decode(&raw.hash)?.try_into().map_err(|bytes: Vec<u8>| {
            Error::Serialization(format!(
                "Block hash must be {} bytes, got {}",
                BLOCK_HASH_LENGTH,
                bytes.len()
            ))
        })?;
        Ok(RecentHeight::new(height, hash))
    }
}

impl AccountResources {
    /// Convert to the storage form
    pub fn to_raw(&self) -> AccountResourcesRaw {
        AccountResourcesRaw {
            root_public_key: hex::encode(&self.root_public_key),
            recent_heights: self
                .recent_heights
                .iter()
                .copied()
                .map(RecentHeightRaw::from)
                .collect(),
            next_identifier: self.next_identifier.to_string(),
            next_transaction_sequence_number: self.next_transaction_sequence_number,
        }
    }

    /// Restore from the storage form
    pub fn from_raw(raw: &AccountResourcesRaw) -> Result<Self> {
        Ok(Self {
            root_public_key: hex::decode(&raw.root_public_key)?,
            recent_heights: raw
                .recent_heights
                .iter()
                .cloned()
                .map(RecentHeight::try_from)
                .collect::<Result<Vec<_>>>()?,
            next_identifier: raw.next_identifier.parse()?,
            next_transaction_sequence_number: raw.next_transaction_sequence_number,
        })
    }
}
