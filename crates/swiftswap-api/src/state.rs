//! Application state shared across API handlers

use std::sync::Arc;
use std::time::{Duration, Instant};

use evm_client::ChainClient;
use swap::{PipelineContext, PoolRegistry, SlippageTolerance, SwapSession};
use swiftswap_core::{Address, AppConfig, DexError, Error};
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors raised by the API layer itself
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Invalid address: {reason}")]
    InvalidAddress { reason: String },
}

/// Connected wallet account
#[derive(Clone, Debug)]
pub struct WalletState {
    pub address: Address,
    pub connected_at: Instant,
}

impl WalletState {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            connected_at: Instant::now(),
        }
    }
}

/// Parse a hex account address (any letter case)
pub fn parse_address(value: &str) -> Result<Address, StateError> {
    value
        .trim()
        .parse::<Address>()
        .map_err(|e| StateError::InvalidAddress {
            reason: format!("'{}': {}", value, e),
        })
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RwLock<AppConfig>,
    pipeline: PipelineContext,
    wallet: RwLock<Option<WalletState>>,
}

impl AppState {
    /// Build state from config, resolving its token and pool tables
    pub fn new(config: AppConfig, client: Arc<dyn ChainClient>) -> Result<Self, Error> {
        let registry = PoolRegistry::from_config(&config)?;
        Ok(Self::from_parts(config, registry, client))
    }

    /// Build state around an existing registry
    pub fn from_parts(
        config: AppConfig,
        registry: PoolRegistry,
        client: Arc<dyn ChainClient>,
    ) -> Self {
        let pipeline = PipelineContext::new(client, Arc::new(registry), &config.polling);
        let wallet = config.account.map(WalletState::new);
        Self {
            inner: Arc::new(AppStateInner {
                config: RwLock::new(config),
                pipeline,
                wallet: RwLock::new(wallet),
            }),
        }
    }

    pub async fn config(&self) -> AppConfig {
        self.inner.config.read().await.clone()
    }

    pub fn pipeline(&self) -> &PipelineContext {
        &self.inner.pipeline
    }

    pub fn client(&self) -> &dyn ChainClient {
        self.inner.pipeline.client.as_ref()
    }

    pub fn registry(&self) -> &PoolRegistry {
        &self.inner.pipeline.registry
    }

    /// A fresh swap session over the shared pipeline
    pub fn session(&self) -> SwapSession {
        SwapSession::new(self.inner.pipeline.clone())
    }

    pub async fn default_slippage(&self) -> Result<SlippageTolerance, DexError> {
        SlippageTolerance::from_bps(self.inner.config.read().await.default_slippage_bps)
    }

    /// How long a handler waits on a single chain read
    pub async fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.inner.config.read().await.rpc.request_timeout_secs)
    }

    pub async fn wallet(&self) -> Option<WalletState> {
        self.inner.wallet.read().await.clone()
    }

    pub async fn set_wallet(&self, address: &str) -> Result<Address, StateError> {
        let address = parse_address(address)?;
        tracing::info!("Wallet connected: {}", address);
        *self.inner.wallet.write().await = Some(WalletState::new(address));
        Ok(address)
    }

    pub async fn disconnect_wallet(&self) {
        *self.inner.wallet.write().await = None;
    }

    /// The explicit `from` address if given, else the connected account
    pub async fn account(&self, from: Option<&str>) -> Result<Option<Address>, StateError> {
        match from {
            Some(from) => parse_address(from).map(Some),
            None => Ok(self.wallet().await.map(|w| w.address)),
        }
    }
}
