//! Wallet operations
//!
//! An operation is one entry of an account's history. The scanner creates
//! `IN`/`COINBASE_REWARD` operations for discovered outputs and updates them as
//! confirmations, spends and reorgs resolve; `OUT` operations come from the
//! transaction layer and are only confirmed here.

use crate::identifier::Identifier;
use crate::proof_builder::SwitchType;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Length of a Pedersen commitment
pub const COMMITMENT_LENGTH: usize = 33;

/// Pedersen commitment of an output
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Commitment([u8; COMMITMENT_LENGTH]);

impl Commitment {
    /// Wrap raw commitment bytes
    pub const fn from_bytes(bytes: [u8; COMMITMENT_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Parse from a byte slice
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; COMMITMENT_LENGTH] = bytes.try_into().map_err(|_| {
            Error::InvalidParameters(format!(
                "commitment must be {} bytes, got {}",
                COMMITMENT_LENGTH,
                bytes.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; COMMITMENT_LENGTH] {
        &self.0
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({})", self)
    }
}

impl FromStr for Commitment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_slice(&hex::decode(s)?)
    }
}

impl Serialize for Commitment {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Commitment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        encoded.parse().map_err(serde::de::Error::custom)
    }
}

/// Operation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    /// Received output
    In,
    /// Sent transaction
    Out,
    /// Mined block reward
    CoinbaseReward,
    /// Placeholder for an output that was received and then cancelled
    None,
}

impl OperationType {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::In => "IN",
            OperationType::Out => "OUT",
            OperationType::CoinbaseReward => "COINBASE_REWARD",
            OperationType::None => "NONE",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Currency-specific operation fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationExtra {
    /// Commitment of the received output
    pub output_commitment: Option<Commitment>,
    /// Identifier recovered from the output's bulletproof
    pub identifier: Option<Identifier>,
    /// Switch commitment type recovered from the output's bulletproof
    pub switch_type: Option<SwitchType>,
    /// Whether the output has been spent
    #[serde(default)]
    pub spent: bool,
    /// Excess of the transaction kernel, when the wallet knows it
    #[serde(with = "hex_option", default)]
    pub kernel_excess: Option<Vec<u8>>,
    /// Kernel offset, when the wallet knows it
    #[serde(with = "hex_option", default)]
    pub kernel_offset: Option<Vec<u8>>,
    /// Recipient's payment proof signature
    #[serde(with = "hex_option", default)]
    pub recipient_payment_proof_signature: Option<Vec<u8>>,
}

/// Account history entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Unique id, see [`encode_operation_id`]
    pub id: String,
    /// Transaction hash (empty for scanned outputs)
    pub hash: String,
    /// Operation type
    #[serde(rename = "type")]
    pub op_type: OperationType,
    /// Amount in atomic units
    pub value: u64,
    /// Fee in atomic units, unknown for received outputs
    pub fee: Option<u64>,
    /// Sender addresses
    pub senders: Vec<String>,
    /// Recipient addresses
    pub recipients: Vec<String>,
    /// Confirmation height
    pub block_height: Option<u64>,
    /// Hex hash of the confirming block
    pub block_hash: Option<String>,
    /// Owning account
    pub account_id: String,
    /// Block or creation time
    pub date: DateTime<Utc>,
    /// Currency-specific fields
    pub extra: OperationExtra,
}

impl Operation {
    /// Copy the fields the account's own record is authoritative for
    ///
    /// Used when a rescan rediscovers an operation the account already knows:
    /// chain-derived fields stay as scanned, user-facing fields come from `other`.
    pub fn fold_from(&mut self, other: &Operation) {
        self.hash = other.hash.clone();
        self.op_type = other.op_type;
        self.fee = other.fee;
        self.date = other.date;
        self.senders = other.senders.clone();
        self.recipients = other.recipients.clone();
        self.extra.spent = other.extra.spent;
        self.extra.kernel_excess = other.extra.kernel_excess.clone();
        self.extra.kernel_offset = other.extra.kernel_offset.clone();
        self.extra.recipient_payment_proof_signature =
            other.extra.recipient_payment_proof_signature.clone();
    }

    /// Set or clear the confirming block
    pub fn set_confirmation(&mut self, confirmation: Option<(u64, &[u8])>) {
        match confirmation {
            Some((height, hash)) => {
                self.block_height = Some(height);
                self.block_hash = Some(hex::encode(hash));
            }
            None => {
                self.block_height = None;
                self.block_hash = None;
            }
        }
    }
}

/// Build an operation id
pub fn encode_operation_id(account_id: &str, hash: &str, op_type: OperationType) -> String {
    format!("{}-{}-{}", account_id, hash, op_type)
}

mod hex_option {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_some(&hex::encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|encoded| hex::decode(encoded).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn received() -> Operation {
        let commitment = Commitment::from_bytes([0x08; 33]);
        Operation {
            id: encode_operation_id("acct", &commitment.to_string(), OperationType::In),
            hash: String::new(),
            op_type: OperationType::In,
            value: 5_000_000_000,
            fee: None,
            senders: vec![],
            recipients: vec![],
            block_height: Some(1_300_000),
            block_hash: Some("ab".repeat(32)),
            account_id: "acct".to_string(),
            date: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            extra: OperationExtra {
                output_commitment: Some(commitment),
                identifier: Some(Identifier::new(3, [0, 0, 1, 0]).unwrap()),
                switch_type: Some(SwitchType::Regular),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_operation_id() {
        assert_eq!(
            encode_operation_id("js:2:mimblewimble_coin:x:", "abcd", OperationType::CoinbaseReward),
            "js:2:mimblewimble_coin:x:-abcd-COINBASE_REWARD"
        );
    }

    #[test]
    fn test_commitment_parsing() {
        let commitment: Commitment = "09".repeat(33).parse().unwrap();
        assert_eq!(commitment.as_bytes(), &[0x09; 33]);
        assert!("09".repeat(32).parse::<Commitment>().is_err());
        assert!("zz".parse::<Commitment>().is_err());
    }

    #[test]
    fn test_fold_from_keeps_scanned_fields() {
        let mut scanned = received();
        let mut stored = received();
        stored.hash = "tx".to_string();
        stored.fee = Some(10);
        stored.senders = vec!["grin1sender".to_string()];
        stored.block_height = Some(1);
        stored.extra.spent = true;
        stored.extra.kernel_excess = Some(vec![1, 2, 3]);

        scanned.fold_from(&stored);
        assert_eq!(scanned.hash, "tx");
        assert_eq!(scanned.fee, Some(10));
        assert_eq!(scanned.senders, stored.senders);
        assert!(scanned.extra.spent);
        assert_eq!(scanned.extra.kernel_excess, Some(vec![1, 2, 3]));
        assert_eq!(scanned.block_height, Some(1_300_000));
    }

    #[test]
    fn test_serde_shape() {
        let operation = received();
        let json = serde_json::to_value(&operation).unwrap();
        assert_eq!(json["type"], "IN");
        assert_eq!(json["blockHeight"], 1_300_000);
        assert_eq!(json["extra"]["switchType"], 1);
        assert_eq!(json["extra"]["outputCommitment"], "08".repeat(33));
        assert!(json["extra"]["kernelExcess"].is_null());

        let back: Operation = serde_json::from_value(json).unwrap();
        assert_eq!(back, operation);
    }

    #[test]
    fn test_set_confirmation() {
        let mut operation = received();
        operation.set_confirmation(Some((7, &[0xcd; 32])));
        assert_eq!(operation.block_height, Some(7));
        assert_eq!(operation.block_hash, Some("cd".repeat(32)));
        operation.set_confirmation(None);
        assert_eq!(operation.block_height, None);
        assert_eq!(operation.block_hash, None);
    }
}
