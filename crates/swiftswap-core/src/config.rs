//! Configuration types for SwiftSwap

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{BPS_DENOMINATOR, DEFAULT_SLIPPAGE_BPS, DEFAULT_TOKEN_DECIMALS};
use crate::{Address, Error, Network};

/// JSON-RPC connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// RPC URL (e.g., "http://127.0.0.1:8545")
    pub url: String,

    /// Per-request timeout for reads and submissions
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// How often to poll for a transaction receipt
    #[serde(default = "default_receipt_poll_ms")]
    pub receipt_poll_ms: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_receipt_poll_ms() -> u64 {
    1_000
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8545".to_string(),
            request_timeout_secs: default_request_timeout_secs(),
            receipt_poll_ms: default_receipt_poll_ms(),
        }
    }
}

/// Polling intervals and cache freshness windows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_quote_interval_ms")]
    pub quote_interval_ms: u64,

    #[serde(default = "default_balance_interval_ms")]
    pub balance_interval_ms: u64,

    #[serde(default = "default_allowance_freshness_ms")]
    pub allowance_freshness_ms: u64,

    /// How long a finished transaction stays listed before it is dropped
    #[serde(default = "default_tx_retention_secs")]
    pub tx_retention_secs: u64,
}

fn default_quote_interval_ms() -> u64 {
    5_000
}

fn default_balance_interval_ms() -> u64 {
    10_000
}

fn default_allowance_freshness_ms() -> u64 {
    10_000
}

fn default_tx_retention_secs() -> u64 {
    10 * 60
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            quote_interval_ms: default_quote_interval_ms(),
            balance_interval_ms: default_balance_interval_ms(),
            allowance_freshness_ms: default_allowance_freshness_ms(),
            tx_retention_secs: default_tx_retention_secs(),
        }
    }
}

/// A tradeable token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    pub address: Address,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

fn default_decimals() -> u8 {
    DEFAULT_TOKEN_DECIMALS
}

/// A deployed pool, keyed by "SYM0-SYM1"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    pub pair: String,
    pub address: Address,
    /// Fee tier in hundredths of a basis point
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<u32>,
}

impl PoolConfig {
    /// Split the pair key into its two symbols
    pub fn symbols(&self) -> Option<(&str, &str)> {
        let (a, b) = self.pair.split_once('-')?;
        if a.is_empty() || b.is_empty() {
            return None;
        }
        Some((a, b))
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// RPC connection settings
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Network the deployment lives on
    #[serde(default = "default_network")]
    pub network: Network,

    /// API server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Default account used as transaction sender and allowance owner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<Address>,

    /// Default slippage tolerance in basis points
    #[serde(default = "default_slippage_bps")]
    pub default_slippage_bps: u16,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub tokens: Vec<TokenConfig>,

    #[serde(default)]
    pub pools: Vec<PoolConfig>,
}

fn default_network() -> Network {
    Network::Localhost
}

fn default_api_port() -> u16 {
    18545
}

fn default_slippage_bps() -> u16 {
    DEFAULT_SLIPPAGE_BPS
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rpc: RpcConfig::default(),
            network: default_network(),
            api_port: default_api_port(),
            account: None,
            default_slippage_bps: default_slippage_bps(),
            polling: PollingConfig::default(),
            tokens: Vec::new(),
            pools: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_json(&raw)
    }

    /// Parse configuration from a JSON string
    pub fn from_json(raw: &str) -> Result<Self, Error> {
        serde_json::from_str(raw).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Replace tokens and pools with the contents of a deployment file
    pub fn apply_deployment(&mut self, deployment: &Deployment) {
        if let Some(network) = Network::from_chain_id(deployment.chain_id) {
            self.network = network;
        }
        self.tokens = deployment.token_configs();
        self.pools = deployment.pool_configs();
    }

    /// Check internal consistency of the token and pool tables
    pub fn validate(&self) -> Result<(), Error> {
        if self.default_slippage_bps > BPS_DENOMINATOR {
            return Err(Error::Config(format!(
                "default_slippage_bps {} exceeds {}",
                self.default_slippage_bps, BPS_DENOMINATOR
            )));
        }

        let mut symbols = HashSet::new();
        for token in &self.tokens {
            if !symbols.insert(token.symbol.as_str()) {
                return Err(Error::Config(format!("Duplicate token symbol {}", token.symbol)));
            }
        }

        for pool in &self.pools {
            let (a, b) = pool
                .symbols()
                .ok_or_else(|| Error::Config(format!("Malformed pool pair '{}'", pool.pair)))?;
            if a == b {
                return Err(Error::Config(format!(
                    "Pool {} pairs {} with itself",
                    pool.pair, a
                )));
            }
            for symbol in [a, b] {
                if !symbols.contains(symbol) {
                    return Err(Error::Config(format!(
                        "Pool {} references unknown token {}",
                        pool.pair, symbol
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Contract addresses written by the deployment script
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployedContracts {
    pub factory: Address,
    pub router: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployedToken {
    pub address: Address,
    #[serde(default)]
    pub name: String,
    pub symbol: String,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployedPool {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<u32>,
}

/// Deployment output (`deployed-addresses.json`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub network: String,
    pub chain_id: u64,
    pub contracts: DeployedContracts,
    pub tokens: BTreeMap<String, DeployedToken>,
    pub pools: BTreeMap<String, DeployedPool>,
}

/// Display metadata applied to the deployed test tokens: (deployed, symbol, name)
const DISPLAY_TOKENS: [(&str, &str, &str); 3] = [
    ("TKA", "SWIFT", "Swift Protocol"),
    ("TKB", "BOLT", "Bolt Network"),
    ("TKC", "FLASH", "Flash Finance"),
];

fn display_symbol(deployed: &str) -> (String, Option<&'static str>) {
    DISPLAY_TOKENS
        .iter()
        .find(|(sym, _, _)| *sym == deployed)
        .map(|(_, symbol, name)| (symbol.to_string(), Some(*name)))
        .unwrap_or_else(|| (deployed.to_string(), None))
}

impl Deployment {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&raw).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn token_configs(&self) -> Vec<TokenConfig> {
        self.tokens
            .iter()
            .map(|(key, token)| {
                let (symbol, display_name) = display_symbol(key);
                TokenConfig {
                    symbol,
                    name: display_name
                        .map(str::to_string)
                        .unwrap_or_else(|| token.name.clone()),
                    address: token.address,
                    decimals: token.decimals,
                }
            })
            .collect()
    }

    pub fn pool_configs(&self) -> Vec<PoolConfig> {
        self.pools
            .iter()
            .map(|(pair, pool)| {
                let pair = match pair.split_once('-') {
                    Some((a, b)) => format!("{}-{}", display_symbol(a).0, display_symbol(b).0),
                    None => pair.clone(),
                };
                PoolConfig {
                    pair,
                    address: pool.address,
                    fee: pool.fee,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPLOYMENT: &str = r#"{
        "network": "localhost",
        "chainId": 31337,
        "contracts": {
            "factory": "0x5FbDB2315678afecb367f032d93F642f64180aa3",
            "router": "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"
        },
        "tokens": {
            "TKA": { "address": "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0", "name": "Token A", "symbol": "TKA", "decimals": 18 },
            "TKB": { "address": "0xCf7Ed3AccA5a467e9e704C703E8D87F634fB0Fc9", "name": "Token B", "symbol": "TKB", "decimals": 18 },
            "TKC": { "address": "0xDc64a140Aa3E981100a9becA4E685f962f0cF6C9", "name": "Token C", "symbol": "TKC", "decimals": 18 }
        },
        "pools": {
            "TKA-TKB": {
                "address": "0x75537828f2ce51be7289709686A69CbFDbB714F1",
                "token0": "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0",
                "token1": "0xCf7Ed3AccA5a467e9e704C703E8D87F634fB0Fc9",
                "fee": 500
            }
        }
    }"#;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.rpc.url, "http://127.0.0.1:8545");
        assert_eq!(config.network, Network::Localhost);
        assert_eq!(config.api_port, 18545);
        assert_eq!(config.default_slippage_bps, 50);
        assert_eq!(config.polling.quote_interval_ms, 5_000);
        assert_eq!(config.polling.balance_interval_ms, 10_000);
        assert_eq!(config.polling.tx_retention_secs, 600);
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed = AppConfig::from_json(&json).unwrap();
        assert_eq!(parsed.rpc.url, config.rpc.url);
        assert_eq!(parsed.api_port, config.api_port);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed = AppConfig::from_json(r#"{ "rpc": { "url": "http://node:8545" } }"#).unwrap();
        assert_eq!(parsed.rpc.url, "http://node:8545");
        assert_eq!(parsed.rpc.request_timeout_secs, 30);
        assert_eq!(parsed.network, Network::Localhost);
    }

    #[test]
    fn test_apply_deployment_renames_test_tokens() {
        let deployment: Deployment = serde_json::from_str(DEPLOYMENT).unwrap();
        let mut config = AppConfig::default();
        config.apply_deployment(&deployment);

        let symbols: Vec<&str> = config.tokens.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["SWIFT", "BOLT", "FLASH"]);
        assert_eq!(config.tokens[0].name, "Swift Protocol");
        assert_eq!(config.pools.len(), 1);
        assert_eq!(config.pools[0].pair, "SWIFT-BOLT");
        assert_eq!(config.pools[0].fee, Some(500));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_pool_token() {
        let config = AppConfig {
            pools: vec![PoolConfig {
                pair: "SWIFT-BOLT".into(),
                address: Address::repeat_byte(9),
                fee: None,
            }],
            ..AppConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_self_pair() {
        let config = AppConfig {
            tokens: vec![TokenConfig {
                symbol: "SWIFT".into(),
                name: String::new(),
                address: Address::repeat_byte(1),
                decimals: 18,
            }],
            pools: vec![PoolConfig {
                pair: "SWIFT-SWIFT".into(),
                address: Address::repeat_byte(9),
                fee: None,
            }],
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_excess_slippage() {
        let config = AppConfig {
            default_slippage_bps: 10_001,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
