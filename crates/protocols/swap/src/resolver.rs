//! Pool registry and pair resolution
//!
//! Pools are known up front from configuration; there is no on-chain
//! discovery and no multi-hop routing. A pair either has a deployed pool or
//! it does not.

use std::collections::HashMap;

use swiftswap_core::{Address, AppConfig, DexError, Error, TokenDescriptor};

use crate::state::{PairKey, PoolHandle, Resolution};

/// Known tokens and the pool deployed for each pair
#[derive(Debug, Clone, Default)]
pub struct PoolRegistry {
    tokens: Vec<TokenDescriptor>,
    pools: HashMap<PairKey, PoolHandle>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from the configured token and pool tables
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        config.validate()?;

        let mut registry = Self::new();
        for token in &config.tokens {
            let name = if token.name.is_empty() {
                token.symbol.clone()
            } else {
                token.name.clone()
            };
            registry.add_token(
                TokenDescriptor::new(token.address, &token.symbol, token.decimals).with_name(name),
            )?;
        }

        for pool in &config.pools {
            let (a, b) = pool
                .symbols()
                .ok_or_else(|| Error::Config(format!("Malformed pool pair '{}'", pool.pair)))?;
            let token_a = registry.require_token(a)?.clone();
            let token_b = registry.require_token(b)?.clone();
            registry.add_pool(PoolHandle::new(pool.address, token_a, token_b, pool.fee)?)?;
        }

        tracing::debug!(
            "Pool registry: {} tokens, {} pools",
            registry.tokens.len(),
            registry.pools.len()
        );
        Ok(registry)
    }

    pub fn add_token(&mut self, token: TokenDescriptor) -> Result<(), Error> {
        if self.tokens.iter().any(|t| t == &token) {
            return Err(Error::Config(format!(
                "Token {} registered twice",
                token.address
            )));
        }
        self.tokens.push(token);
        Ok(())
    }

    pub fn add_pool(&mut self, pool: PoolHandle) -> Result<(), Error> {
        let key = pool.key();
        if let Some(existing) = self.pools.get(&key) {
            return Err(Error::Config(format!(
                "Pair {} already served by pool {}",
                pool.label(),
                existing.address
            )));
        }
        self.pools.insert(key, pool);
        Ok(())
    }

    /// Look a token up by symbol (case-insensitive) or by address
    pub fn token(&self, symbol_or_address: &str) -> Option<&TokenDescriptor> {
        if let Ok(address) = symbol_or_address.parse::<Address>() {
            return self.token_by_address(address);
        }
        self.tokens
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol_or_address))
    }

    pub fn token_by_address(&self, address: Address) -> Option<&TokenDescriptor> {
        self.tokens.iter().find(|t| t.address == address)
    }

    /// Like [`PoolRegistry::token`], failing with `UnknownToken`
    pub fn require_token(&self, symbol_or_address: &str) -> Result<&TokenDescriptor, DexError> {
        self.token(symbol_or_address)
            .ok_or_else(|| DexError::UnknownToken {
                token: symbol_or_address.to_string(),
            })
    }

    pub fn tokens(&self) -> &[TokenDescriptor] {
        &self.tokens
    }

    /// All pools, ordered by label for stable listings
    pub fn pools(&self) -> Vec<&PoolHandle> {
        let mut pools: Vec<_> = self.pools.values().collect();
        pools.sort_by_key(|p| p.label());
        pools
    }

    pub fn pool_by_address(&self, address: Address) -> Option<&PoolHandle> {
        self.pools.values().find(|p| p.address == address)
    }

    /// Resolve the pool serving a pair, in either direction
    pub fn resolve(
        &self,
        token_in: &TokenDescriptor,
        token_out: &TokenDescriptor,
    ) -> Result<Resolution, DexError> {
        resolve(self, token_in, token_out)
    }
}

/// Resolve `token_in`/`token_out` against `registry`.
///
/// Symmetric: both directions produce the same resolution.
pub fn resolve(
    registry: &PoolRegistry,
    token_in: &TokenDescriptor,
    token_out: &TokenDescriptor,
) -> Result<Resolution, DexError> {
    let key = PairKey::of(token_in, token_out)?;
    Ok(match registry.pools.get(&key) {
        Some(pool) => Resolution::Found(pool.clone()),
        None => Resolution::NotFound(key),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use swiftswap_core::{PoolConfig, TokenConfig};

    fn config() -> AppConfig {
        let token = |symbol: &str, byte: u8| TokenConfig {
            symbol: symbol.into(),
            name: String::new(),
            address: Address::repeat_byte(byte),
            decimals: 18,
        };
        AppConfig {
            tokens: vec![token("SWIFT", 1), token("BOLT", 2), token("FLASH", 3)],
            pools: vec![
                PoolConfig {
                    pair: "SWIFT-BOLT".into(),
                    address: Address::repeat_byte(0xa1),
                    fee: Some(500),
                },
                PoolConfig {
                    pair: "BOLT-FLASH".into(),
                    address: Address::repeat_byte(0xa2),
                    fee: Some(3000),
                },
            ],
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_resolve_is_symmetric() {
        let registry = PoolRegistry::from_config(&config()).unwrap();
        let swift = registry.token("SWIFT").unwrap();
        let bolt = registry.token("bolt").unwrap();
        let flash = registry.token("FLASH").unwrap();

        for (a, b) in [(swift, bolt), (bolt, flash), (swift, flash)] {
            assert_eq!(
                registry.resolve(a, b).unwrap(),
                registry.resolve(b, a).unwrap()
            );
        }

        let found = registry.resolve(bolt, swift).unwrap();
        assert_eq!(found.pool().unwrap().address, Address::repeat_byte(0xa1));
    }

    #[test]
    fn test_missing_pool_is_not_found() {
        let registry = PoolRegistry::from_config(&config()).unwrap();
        let swift = registry.token("SWIFT").unwrap();
        let flash = registry.token("FLASH").unwrap();

        let resolution = registry.resolve(swift, flash).unwrap();
        assert!(!resolution.is_found());
        assert!(resolution.pool().is_none());
        assert_eq!(
            resolution.key(),
            PairKey::new(swift.address, flash.address).unwrap()
        );
    }

    #[test]
    fn test_same_token_is_invalid_pair() {
        let registry = PoolRegistry::from_config(&config()).unwrap();
        let swift = registry.token("SWIFT").unwrap();
        assert!(matches!(
            registry.resolve(swift, swift),
            Err(DexError::InvalidPair { .. })
        ));
    }

    #[test]
    fn test_token_lookup_by_address() {
        let registry = PoolRegistry::from_config(&config()).unwrap();
        let by_address = registry
            .token("0x0202020202020202020202020202020202020202")
            .unwrap();
        assert_eq!(by_address.symbol, "BOLT");
        assert!(registry.token("DOGE").is_none());
        assert!(matches!(
            registry.require_token("DOGE"),
            Err(DexError::UnknownToken { .. })
        ));
    }

    #[test]
    fn test_pools_sorted_by_label() {
        let registry = PoolRegistry::from_config(&config()).unwrap();
        let labels: Vec<String> = registry.pools().iter().map(|p| p.label()).collect();
        assert_eq!(labels, vec!["BOLT-FLASH", "SWIFT-BOLT"]);
    }

    #[test]
    fn test_duplicate_pool_rejected() {
        let mut cfg = config();
        cfg.pools.push(PoolConfig {
            pair: "BOLT-SWIFT".into(),
            address: Address::repeat_byte(0xa3),
            fee: None,
        });
        assert!(matches!(
            PoolRegistry::from_config(&cfg),
            Err(Error::Config(_))
        ));
    }
}
