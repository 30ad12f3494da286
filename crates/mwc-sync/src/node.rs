//! Chain node capability
//!
//! The scanner only needs a handful of read-only queries. The RPC client that
//! answers them (and its retry policy) belongs to the caller; any error it
//! returns aborts the sync pass.

use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mwc_core::{BlockHash, Commitment};
use serde::{Deserialize, Serialize};

/// Chain tip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tip {
    /// Tip height (0 while the node is still syncing)
    pub height: u64,
    /// Tip block hash
    pub hash: BlockHash,
}

/// Block header fields the scanner uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Block hash
    pub hash: BlockHash,
    /// Block timestamp
    pub timestamp: DateTime<Utc>,
}

/// Output PMMR index range covering a height range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PmmrIndices {
    /// First output index
    pub start_index: u64,
    /// Last output index
    pub end_index: u64,
}

/// Output kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputType {
    /// Block reward
    Coinbase,
    /// Regular transaction output
    Transaction,
}

/// Unspent output as listed by the node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeOutput {
    /// Output commitment
    pub commitment: Commitment,
    /// Bulletproof range proof
    pub proof: Vec<u8>,
    /// Output kind
    pub output_type: OutputType,
    /// Height of the block that created the output
    pub height: u64,
}

/// One page of outputs
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutputPage {
    /// Highest index in the requested range
    pub highest_index: u64,
    /// Last index covered by this page
    pub last_retrieved_index: u64,
    /// Unspent outputs in the page
    pub outputs: Vec<NodeOutput>,
}

impl OutputPage {
    /// Whether more pages follow
    pub fn has_more(&self) -> bool {
        self.highest_index > self.last_retrieved_index
    }
}

/// Lookup result for a single output
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutputStatus {
    /// Height of the block containing the output, `None` if it is not unspent
    pub height: Option<u64>,
    /// Bulletproof range proof
    pub proof: Vec<u8>,
}

/// Lookup result for a kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KernelStatus {
    /// Height of the block containing the kernel, `None` if not found
    pub height: Option<u64>,
}

/// Read-only chain queries
#[async_trait]
pub trait Node: Send + Sync {
    /// Current tip
    async fn get_tip(&self) -> Result<Tip>;

    /// Header at `height`
    async fn get_header(&self, height: u64) -> Result<Header>;

    /// Output index range for blocks `start_height..=end_height`
    async fn get_pmmr_indices(&self, start_height: u64, end_height: u64) -> Result<PmmrIndices>;

    /// Unspent outputs with index in `start_index..=end_index`, at most `group_size` of them
    async fn get_outputs(&self, start_index: u64, end_index: u64, group_size: u64) -> Result<OutputPage>;

    /// Look up an output by commitment
    async fn get_output(&self, commitment: &Commitment) -> Result<OutputStatus>;

    /// Look up a kernel by excess within `min_height..=max_height`
    async fn get_kernel(&self, excess: &[u8], min_height: u64, max_height: u64) -> Result<KernelStatus>;
}
