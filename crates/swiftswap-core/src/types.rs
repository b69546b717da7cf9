//! Core type definitions for SwiftSwap

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

pub use alloy_primitives::{Address, TxHash, I256, U256};

/// An ERC-20 token known to the client.
///
/// Two descriptors refer to the same token iff their addresses are equal.
/// Addresses are parsed into 20-byte values, so hex case never matters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenDescriptor {
    pub address: Address,
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    pub decimals: u8,
}

impl TokenDescriptor {
    pub fn new(address: Address, symbol: impl Into<String>, decimals: u8) -> Self {
        let symbol = symbol.into();
        Self {
            address,
            name: symbol.clone(),
            symbol,
            decimals,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl PartialEq for TokenDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for TokenDescriptor {}

impl Hash for TokenDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

impl fmt::Display for TokenDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.symbol, self.address)
    }
}

/// Network type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Localhost,
    Sepolia,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Localhost => "localhost",
            Self::Sepolia => "sepolia",
        }
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            Self::Localhost => 31337,
            Self::Sepolia => 11155111,
        }
    }

    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        match chain_id {
            31337 => Some(Self::Localhost),
            11155111 => Some(Self::Sepolia),
            _ => None,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Block number
pub type BlockNumber = u64;

/// Constants
pub mod constants {
    /// Basis points in 100%
    pub const BPS_DENOMINATOR: u16 = 10_000;

    /// Default slippage tolerance (0.5%)
    pub const DEFAULT_SLIPPAGE_BPS: u16 = 50;

    /// Lowest usable tick for a full-range position
    pub const MIN_TICK: i32 = -887_272;

    /// Highest usable tick for a full-range position
    pub const MAX_TICK: i32 = 887_272;

    /// Decimals used by the deployed test tokens
    pub const DEFAULT_TOKEN_DECIMALS: u8 = 18;

    /// Pool fee tiers in hundredths of a basis point
    pub mod fee_tiers {
        pub const LOW: u32 = 100;
        pub const MEDIUM: u32 = 500;
        pub const HIGH: u32 = 3000;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_equality_ignores_hex_case() {
        let lower: Address = "0x5fbdb2315678afecb367f032d93f642f64180aa3"
            .parse()
            .unwrap();
        let mixed: Address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
            .parse()
            .unwrap();

        let a = TokenDescriptor::new(lower, "TKA", 18);
        let b = TokenDescriptor::new(mixed, "SWIFT", 18);
        assert_eq!(a, b);
    }

    #[test]
    fn test_token_inequality_by_address() {
        let a = TokenDescriptor::new(Address::repeat_byte(1), "TKA", 18);
        let b = TokenDescriptor::new(Address::repeat_byte(2), "TKA", 18);
        assert_ne!(a, b);
    }

    #[test]
    fn test_network_chain_ids() {
        assert_eq!(Network::Localhost.chain_id(), 31337);
        assert_eq!(Network::from_chain_id(11155111), Some(Network::Sepolia));
        assert_eq!(Network::from_chain_id(1), None);
        assert_eq!(Network::Sepolia.as_str(), "sepolia");
    }
}
