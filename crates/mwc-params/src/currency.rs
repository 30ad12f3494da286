//! Supported MimbleWimble-family currencies

use crate::consensus::ConsensusParams;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Currency variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Currency {
    /// MimbleWimble Coin mainnet
    MimbleWimbleCoin,
    /// MimbleWimble Coin floonet
    MimbleWimbleCoinFloonet,
    /// Grin mainnet
    Grin,
    /// Grin testnet
    GrinTestnet,
    /// Epic Cash mainnet
    EpicCash,
    /// Epic Cash floonet
    EpicCashFloonet,
}

impl Currency {
    /// Every supported currency
    pub const ALL: [Currency; 6] = [
        Currency::MimbleWimbleCoin,
        Currency::MimbleWimbleCoinFloonet,
        Currency::Grin,
        Currency::GrinTestnet,
        Currency::EpicCash,
        Currency::EpicCashFloonet,
    ];

    /// Stable currency id
    pub const fn id(&self) -> &'static str {
        match self {
            Self::MimbleWimbleCoin => "mimblewimble_coin",
            Self::MimbleWimbleCoinFloonet => "mimblewimble_coin_floonet",
            Self::Grin => "grin",
            Self::GrinTestnet => "grin_testnet",
            Self::EpicCash => "epic_cash",
            Self::EpicCashFloonet => "epic_cash_floonet",
        }
    }

    /// Human-readable name
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MimbleWimbleCoin => "MimbleWimble Coin",
            Self::MimbleWimbleCoinFloonet => "MimbleWimble Coin Floonet",
            Self::Grin => "Grin",
            Self::GrinTestnet => "Grin Testnet",
            Self::EpicCash => "Epic Cash",
            Self::EpicCashFloonet => "Epic Cash Floonet",
        }
    }

    /// Whether this is a test network
    pub const fn is_testnet(&self) -> bool {
        matches!(
            self,
            Self::MimbleWimbleCoinFloonet | Self::GrinTestnet | Self::EpicCashFloonet
        )
    }

    /// Consensus parameters for this currency
    pub const fn consensus(&self) -> ConsensusParams {
        ConsensusParams::for_currency(*self)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Currency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|currency| currency.id() == s)
            .ok_or_else(|| Error::InvalidCurrency(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_ids_round_trip() {
        for currency in Currency::ALL {
            assert_eq!(currency.id().parse::<Currency>().unwrap(), currency);
        }
    }

    #[test]
    fn test_unknown_currency() {
        assert!(matches!(
            "bitcoin".parse::<Currency>(),
            Err(Error::InvalidCurrency(_))
        ));
    }

    #[test]
    fn test_testnet_flags() {
        assert!(!Currency::MimbleWimbleCoin.is_testnet());
        assert!(Currency::GrinTestnet.is_testnet());
        assert!(Currency::EpicCashFloonet.is_testnet());
    }

    #[test]
    fn test_serde_uses_ids() {
        let json = serde_json::to_string(&Currency::EpicCashFloonet).unwrap();
        assert_eq!(json, "\"epic_cash_floonet\"");
        let back: Currency = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Currency::EpicCashFloonet);
    }
}
