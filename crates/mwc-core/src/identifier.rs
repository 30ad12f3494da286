//! Output derivation identifiers
//!
//! An identifier is the derivation path of an output's blinding factor. It is
//! embedded in the bulletproof message so a wallet can recognise its outputs,
//! and on currencies that support it the last path carries the block height the
//! output was created for.

use crate::{Error, Result};
use mwc_params::Currency;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Number of derivation paths an identifier can hold
pub const MAXIMUM_DEPTH: u8 = 4;

/// Number of paths that make up the identifier's value (the rest are extras)
const VALUE_DEPTH: usize = 3;

/// Index of the path holding an encoded height
const HEIGHT_PATH_INDEX: usize = 3;

/// Fixed-width path identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Identifier {
    depth: u8,
    paths: [u32; MAXIMUM_DEPTH as usize],
}

impl Identifier {
    /// Serialized length: depth byte followed by four big-endian paths
    pub const LENGTH: usize = 1 + 4 * MAXIMUM_DEPTH as usize;

    /// Largest height that fits in the height path
    pub const MAXIMUM_HEIGHT: u64 = u32::MAX as u64;

    /// Root identifier (depth 0)
    pub const fn root() -> Self {
        Self {
            depth: 0,
            paths: [0; MAXIMUM_DEPTH as usize],
        }
    }

    /// Create from a depth and paths
    pub fn new(depth: u8, paths: [u32; MAXIMUM_DEPTH as usize]) -> Result<Self> {
        if depth > MAXIMUM_DEPTH {
            return Err(Error::InvalidIdentifier(format!(
                "depth {} exceeds maximum {}",
                depth, MAXIMUM_DEPTH
            )));
        }
        Ok(Self { depth, paths })
    }

    /// Parse from serialized bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::LENGTH {
            return Err(Error::InvalidIdentifier(format!(
                "expected {} bytes, got {}",
                Self::LENGTH,
                bytes.len()
            )));
        }
        let mut paths = [0u32; MAXIMUM_DEPTH as usize];
        for (path, chunk) in paths.iter_mut().zip(bytes[1..].chunks_exact(4)) {
            *path = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Self::new(bytes[0], paths)
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> [u8; Self::LENGTH] {
        let mut bytes = [0u8; Self::LENGTH];
        bytes[0] = self.depth;
        for (chunk, path) in bytes[1..].chunks_exact_mut(4).zip(self.paths.iter()) {
            chunk.copy_from_slice(&path.to_be_bytes());
        }
        bytes
    }

    /// Identifier depth
    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// All four paths (paths past the depth are zero for well-formed identifiers)
    pub fn paths(&self) -> &[u32; MAXIMUM_DEPTH as usize] {
        &self.paths
    }

    /// Height encoded in the identifier, if the currency encodes one and it is present
    pub fn height(&self, currency: Currency) -> Option<u64> {
        if !currency.consensus().identifier_height_supported
            || self.depth != MAXIMUM_DEPTH
            || self.paths[HEIGHT_PATH_INDEX] == 0
        {
            return None;
        }
        Some(u64::from(self.paths[HEIGHT_PATH_INDEX]))
    }

    /// Encode a height into the identifier's height path
    ///
    /// Heights are stored modulo `MAXIMUM_HEIGHT + 1`. Currencies without
    /// identifier heights get the identifier back unchanged.
    pub fn with_height(&self, currency: Currency, height: u64) -> Self {
        if !currency.consensus().identifier_height_supported {
            return *self;
        }
        let mut identifier = self.remove_extras(currency);
        identifier.depth = MAXIMUM_DEPTH;
        identifier.paths[HEIGHT_PATH_INDEX] = (height % (Self::MAXIMUM_HEIGHT + 1)) as u32;
        identifier
    }

    /// Strip the height path so only the identifier's value remains
    pub fn remove_extras(&self, currency: Currency) -> Self {
        let mut identifier = *self;
        if currency.consensus().identifier_height_supported && identifier.depth == MAXIMUM_DEPTH {
            identifier.depth = VALUE_DEPTH as u8;
            identifier.paths[HEIGHT_PATH_INDEX] = 0;
        }
        identifier
    }

    /// Check if this identifier's value is at least `other`'s value
    pub fn includes_value(&self, other: &Identifier) -> bool {
        self.value_paths() >= other.value_paths()
    }

    /// Lexicographically next identifier
    ///
    /// Returns `None` for the root identifier or when the last value path
    /// would overflow.
    pub fn next(&self) -> Option<Self> {
        let last = usize::from(self.depth).min(VALUE_DEPTH).checked_sub(1)?;
        let mut identifier = *self;
        identifier.paths[last] = identifier.paths[last].checked_add(1)?;
        Some(identifier)
    }

    fn value_paths(&self) -> [u32; VALUE_DEPTH] {
        let mut value = [0u32; VALUE_DEPTH];
        let depth = usize::from(self.depth).min(VALUE_DEPTH);
        value[..depth].copy_from_slice(&self.paths[..depth]);
        value
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.to_bytes()))
    }
}

impl FromStr for Identifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_bytes(&hex::decode(s)?)
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        encoded.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(depth: u8, paths: [u32; 4]) -> Identifier {
        Identifier::new(depth, paths).unwrap()
    }

    #[test]
    fn test_serialized_layout() {
        let identifier = id(3, [0, 0, 0x0102_0304, 0]);
        let bytes = identifier.to_bytes();
        assert_eq!(bytes.len(), 17);
        assert_eq!(bytes[0], 3);
        assert_eq!(&bytes[9..13], &[1, 2, 3, 4]);
        assert_eq!(Identifier::from_bytes(&bytes).unwrap(), identifier);
    }

    #[test]
    fn test_rejects_bad_length_and_depth() {
        assert!(Identifier::from_bytes(&[0u8; 16]).is_err());
        let mut bytes = [0u8; 17];
        bytes[0] = 5;
        assert!(matches!(
            Identifier::from_bytes(&bytes),
            Err(Error::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_height_is_currency_parameterized() {
        let identifier = id(3, [0, 0, 7, 0]).with_height(Currency::MimbleWimbleCoin, 1_300_000);
        assert_eq!(identifier.depth(), 4);
        assert_eq!(identifier.height(Currency::MimbleWimbleCoin), Some(1_300_000));
        assert_eq!(identifier.height(Currency::Grin), None);

        let grin = id(3, [0, 0, 7, 0]).with_height(Currency::Grin, 1_300_000);
        assert_eq!(grin, id(3, [0, 0, 7, 0]));
    }

    #[test]
    fn test_height_wraps_at_maximum() {
        let identifier =
            Identifier::root().with_height(Currency::EpicCash, Identifier::MAXIMUM_HEIGHT + 6);
        assert_eq!(identifier.height(Currency::EpicCash), Some(5));
    }

    #[test]
    fn test_remove_extras() {
        let identifier = id(4, [0, 0, 9, 1_000]);
        assert_eq!(identifier.remove_extras(Currency::MimbleWimbleCoin), id(3, [0, 0, 9, 0]));
        assert_eq!(identifier.remove_extras(Currency::Grin), identifier);
    }

    #[test]
    fn test_includes_value_ignores_height() {
        let low = id(4, [0, 0, 5, 900_000]);
        let high = id(3, [0, 0, 6, 0]);
        assert!(high.includes_value(&low));
        assert!(!low.includes_value(&high));
        assert!(low.includes_value(&id(3, [0, 0, 5, 0])));
        assert!(low.includes_value(&Identifier::root()));
    }

    #[test]
    fn test_next() {
        assert_eq!(id(3, [0, 0, 5, 0]).next(), Some(id(3, [0, 0, 6, 0])));
        assert_eq!(Identifier::root().next(), None);
        assert_eq!(id(3, [0, 0, u32::MAX, 0]).next(), None);
    }

    #[test]
    fn test_hex_and_serde() {
        let identifier = id(3, [0, 0, 1, 0]);
        let encoded = identifier.to_string();
        assert_eq!(encoded, "0300000000000000000000000100000000");
        assert_eq!(encoded.parse::<Identifier>().unwrap(), identifier);

        let json = serde_json::to_string(&identifier).unwrap();
        assert_eq!(json, format!("\"{}\"", encoded));
        assert_eq!(serde_json::from_str::<Identifier>(&json).unwrap(), identifier);
    }
}
