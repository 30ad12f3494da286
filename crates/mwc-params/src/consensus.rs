//! Consensus parameters for MimbleWimble-family currencies

use crate::currency::Currency;

/// One minute blocks on every supported chain
const BLOCK_TIME_SECONDS: u64 = 60;

/// Blocks per day at the target block time
const BLOCK_HEIGHT_DAY: u64 = 24 * 60 * 60 / BLOCK_TIME_SECONDS;

/// Blocks per week at the target block time
const BLOCK_HEIGHT_WEEK: u64 = 7 * BLOCK_HEIGHT_DAY;

/// Consensus parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsensusParams {
    /// Currency these parameters belong to
    pub currency: Currency,
    /// Target block time in seconds
    pub block_time_seconds: u64,
    /// Coinbase maturity (blocks)
    pub coinbase_maturity: u64,
    /// Number of blocks in one week
    pub block_height_week: u64,
    /// First height a hardware wallet account can own outputs at
    pub hardware_wallet_starting_height: u64,
    /// Whether output identifiers carry an encoded block height
    pub identifier_height_supported: bool,
}

impl ConsensusParams {
    /// Get consensus params for a currency
    pub const fn for_currency(currency: Currency) -> Self {
        let (hardware_wallet_starting_height, identifier_height_supported) = match currency {
            Currency::MimbleWimbleCoin => (1_239_928, true),
            Currency::MimbleWimbleCoinFloonet => (1_115_028, true),
            Currency::Grin => (1_687_446, false),
            Currency::GrinTestnet => (1_195_819, false),
            Currency::EpicCash => (1_802_549, true),
            Currency::EpicCashFloonet => (9, true),
        };
        Self {
            currency,
            block_time_seconds: BLOCK_TIME_SECONDS,
            coinbase_maturity: BLOCK_HEIGHT_DAY,
            block_height_week: BLOCK_HEIGHT_WEEK,
            hardware_wallet_starting_height,
            identifier_height_supported,
        }
    }

    /// Maximum distance an identifier height may sit above its output height
    /// before it is treated as belonging to the previous height epoch
    pub const fn identifier_height_overage_threshold(&self) -> u64 {
        self.block_height_week
    }

    /// Maximum age of an identifier height relative to its output height
    pub const fn replay_detection_threshold(&self) -> u64 {
        self.block_height_week
    }

    /// Search window around a recorded height when looking for a kernel
    pub const fn kernel_height_variation_threshold(&self) -> u64 {
        self.block_height_week
    }

    /// Height at which a coinbase output created at `block_height` becomes spendable
    pub const fn coinbase_spendable_height(&self, block_height: u64) -> u64 {
        block_height
            .saturating_add(self.coinbase_maturity)
            .saturating_sub(1)
    }

    /// Check if a coinbase output at `block_height` is mature at `at_height`
    pub const fn is_coinbase_mature(&self, block_height: u64, at_height: u64) -> bool {
        at_height >= self.coinbase_spendable_height(block_height)
    }
}
