//! Reorg-detection checkpoints

use crate::resources::RecentHeightRaw;
use serde::{Deserialize, Serialize};

/// Length of a block hash
pub const BLOCK_HASH_LENGTH: usize = 32;

/// Block hash bytes
pub type BlockHash = [u8; BLOCK_HASH_LENGTH];

/// A height and the hash the chain had at that height when it was recorded
///
/// Immutable once constructed. A wallet keeps a ladder of these from the tip
/// down to geometrically older heights so a reorg can be located without
/// replaying the whole history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RecentHeightRaw", into = "RecentHeightRaw")]
pub struct RecentHeight {
    height: u64,
    hash: BlockHash,
}

impl RecentHeight {
    /// Create a checkpoint
    pub const fn new(height: u64, hash: BlockHash) -> Self {
        Self { height, hash }
    }

    /// Checkpoint height
    pub const fn height(&self) -> u64 {
        self.height
    }

    /// Block hash at the checkpoint height
    pub const fn hash(&self) -> &BlockHash {
        &self.hash
    }

    /// Check whether the chain still has `hash` at this checkpoint's height
    pub fn matches(&self, hash: &BlockHash) -> bool {
        self.hash == *hash
    }
}
