//! MimbleWimble-family wallet core
//!
//! This crate holds the types shared by the output scanner and the rest of the
//! wallet: derivation identifiers, reorg checkpoints, the proof builder used to
//! rewind bulletproofs, wallet operations and persisted account resources.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod identifier;
pub mod operation;
pub mod proof_builder;
pub mod recent_height;
pub mod resources;
pub mod zkp;

pub use error::{Error, ErrorCategory, Result};
pub use identifier::Identifier;
pub use mwc_params::{ConsensusParams, Currency};
pub use operation::{
    encode_operation_id, Commitment, Operation, OperationExtra, OperationType,
    COMMITMENT_LENGTH,
};
pub use proof_builder::{decode_message, encode_message, ProofBuilder, SwitchType, MESSAGE_LENGTH};
pub use recent_height::{BlockHash, RecentHeight, BLOCK_HASH_LENGTH};
pub use resources::{AccountResources, AccountResourcesRaw, RecentHeightRaw};
pub use zkp::{RewoundProof, Secp256k1Zkp};
