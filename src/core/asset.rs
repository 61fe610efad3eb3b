//! Asset identifiers.
//!
//! Inside the ledger an asset is a tagged variant. On the wire it stays a
//! single address, with one reserved value standing for the native currency.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::utils::constants::NATIVE_ASSET_ADDRESS;
use crate::utils::crypto::Address;

/// Native currency or a fungible token contract
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Asset {
    /// The chain's native currency
    Native,
    /// A fungible token, identified by its contract address
    Token(Address),
}

impl Asset {
    /// Reserved address of the native currency
    pub const NATIVE_ADDRESS: Address = Address::new(NATIVE_ASSET_ADDRESS);

    /// Map an external address to an asset
    pub fn from_address(address: Address) -> Self {
        if address == Self::NATIVE_ADDRESS {
            Asset::Native
        } else {
            Asset::Token(address)
        }
    }

    /// External address of this asset
    pub fn address(&self) -> Address {
        match self {
            Asset::Native => Self::NATIVE_ADDRESS,
            Asset::Token(address) => *address,
        }
    }

    /// Whether this is the native currency
    pub fn is_native(&self) -> bool {
        matches!(self, Asset::Native)
    }
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Native => write!(f, "Native"),
            Asset::Token(address) => write!(f, "Token({})", address),
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address())
    }
}

impl From<Address> for Asset {
    fn from(address: Address) -> Self {
        Self::from_address(address)
    }
}

impl FromStr for Asset {
    type Err = Error;

    /// Accepts an address, or `native` / `eth` as shorthand for the sentinel
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "native" | "eth" => Ok(Asset::Native),
            _ => Address::from_hex(s).map(Self::from_address),
        }
    }
}

impl Serialize for Asset {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.address().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Asset {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Address::deserialize(deserializer).map(Self::from_address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_maps_to_native() {
        let sentinel = Address::from_hex("0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE").unwrap();
        assert_eq!(Asset::from_address(sentinel), Asset::Native);
        assert_eq!(Asset::Native.address(), sentinel);
    }

    #[test]
    fn test_token_roundtrip() {
        let token = Address::from_low_u64(42);
        let asset = Asset::from(token);
        assert_eq!(asset, Asset::Token(token));
        assert_eq!(asset.address(), token);
        assert!(!asset.is_native());
    }

    #[test]
    fn test_parse() {
        assert_eq!("native".parse::<Asset>().unwrap(), Asset::Native);
        assert_eq!("ETH".parse::<Asset>().unwrap(), Asset::Native);
        let token = Address::from_low_u64(7);
        assert_eq!(token.to_hex().parse::<Asset>().unwrap(), Asset::Token(token));
        assert!("nonsense".parse::<Asset>().is_err());
    }

    #[test]
    fn test_serde_uses_wire_address() {
        let json = serde_json::to_string(&Asset::Native).unwrap();
        assert_eq!(json, "\"0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee\"");
        let back: Asset = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Asset::Native);
    }
}
