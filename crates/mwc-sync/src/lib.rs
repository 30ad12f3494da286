//! Output scanning and balance reconciliation
//!
//! Walks the chain from the account's last trusted checkpoint to the node's
//! tip, identifies outputs the wallet can rewind, re-checks previously seen
//! outputs for spends and reorgs, and confirms pending sends. The node and
//! the bulletproof engine are supplied by the caller through the [`Node`] and
//! [`mwc_core::Secp256k1Zkp`] traits.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod ladder;
pub mod node;
pub mod progress;
pub mod replay;
pub mod sync;

pub use error::{Error, Result};
pub use ladder::MAXIMUM_NUMBER_OF_RECENT_HEIGHTS;
pub use node::{
    Header, KernelStatus, Node, NodeOutput, OutputPage, OutputStatus, OutputType, PmmrIndices, Tip,
};
pub use progress::{ChannelSink, ProgressSink, ScanEvent, SyncProgress};
pub use sync::{AccountScanState, SyncConfig, SyncEngine, SyncOutcome};
