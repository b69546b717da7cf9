//! evm-client: Chain client seam and alloy-backed JSON-RPC implementation
//!
//! The swap pipeline only talks to the chain through [`ChainClient`]: issue a
//! typed read, submit a write and get its hash, await that hash's inclusion.
//! [`RpcClient`] implements it against an HTTP JSON-RPC endpoint; tests
//! substitute scripted fakes.

pub mod calls;
pub mod events;
pub mod status;

use std::future::IntoFuture;
use std::time::Duration;

use alloy::network::{Ethereum, ReceiptResponse, TransactionBuilder};
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::types::{Filter, TransactionRequest};
use alloy::sol_types::SolEvent;
use alloy::transports::{RpcError, TransportErrorKind};
use async_trait::async_trait;
use swiftswap_core::{Address, BlockNumber, ClientError, Network, RpcConfig, TxHash, U256};

pub use calls::{ReadCall, WriteCall};
pub use events::SwapEvent;
pub use status::{detect_status, ChainStatus};

/// EIP-1193 "user rejected request"
const USER_REJECTED_CODE: i64 = 4001;

/// Result type for chain client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Outcome of a mined transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inclusion {
    pub hash: TxHash,
    pub block_number: Option<BlockNumber>,
    pub success: bool,
}

/// Everything the swap pipeline needs from a chain connection
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Issue a read-only call and decode its `uint256` result
    async fn read(&self, call: &ReadCall) -> Result<U256>;

    /// Submit a write and return its transaction hash once accepted
    async fn submit(&self, call: &WriteCall, from: Address) -> Result<TxHash>;

    /// Wait until the transaction is mined. No deadline is applied here.
    async fn wait_for_inclusion(&self, hash: TxHash) -> Result<Inclusion>;

    /// `Swap` events emitted by `pool` within the last `lookback_blocks`
    async fn swap_events(&self, pool: Address, lookback_blocks: u64) -> Result<Vec<SwapEvent>>;

    /// Check connectivity and chain identity
    async fn status(&self) -> ChainStatus;
}

/// JSON-RPC chain client over HTTP
#[derive(Clone)]
pub struct RpcClient {
    provider: RootProvider<Ethereum>,
    config: RpcConfig,
    network: Network,
}

impl RpcClient {
    /// Create a client for the configured endpoint (no network traffic)
    pub fn new(config: RpcConfig, network: Network) -> Result<Self> {
        let url = url::Url::parse(&config.url).map_err(|e| ClientError::Transport {
            message: format!("Invalid RPC URL {}: {}", config.url, e),
        })?;

        Ok(Self {
            provider: RootProvider::new_http(url),
            config,
            network,
        })
    }

    /// Get the underlying provider (for advanced usage)
    pub fn provider(&self) -> &RootProvider<Ethereum> {
        &self.provider
    }

    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs)
    }

    async fn timed_request<T, F>(&self, fut: F) -> Result<T>
    where
        F: std::future::Future<Output = std::result::Result<T, RpcError<TransportErrorKind>>>
            + Send,
    {
        let timeout = self.request_timeout();
        tokio::time::timeout(timeout, fut)
            .await
            .map_err(|_| ClientError::Timeout {
                secs: timeout.as_secs(),
            })?
            .map_err(classify_rpc_error)
    }
}

#[async_trait]
impl ChainClient for RpcClient {
    async fn read(&self, call: &ReadCall) -> Result<U256> {
        let tx = TransactionRequest::default()
            .with_to(call.target())
            .with_input(call.calldata());

        let data = self.timed_request(self.provider.call(tx).into_future()).await?;
        call.decode(&data)
    }

    async fn submit(&self, call: &WriteCall, from: Address) -> Result<TxHash> {
        let tx = TransactionRequest::default()
            .with_from(from)
            .with_to(call.target())
            .with_input(call.calldata()?);

        tracing::debug!("Submitting {} to {}", call.name(), call.target());
        // The signer may hold this request open while the user decides, so
        // only the transport layer's own limits apply here.
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(classify_rpc_error)?;
        Ok(*pending.tx_hash())
    }

    async fn wait_for_inclusion(&self, hash: TxHash) -> Result<Inclusion> {
        let interval = Duration::from_millis(self.config.receipt_poll_ms);
        loop {
            let receipt = self
                .timed_request(self.provider.get_transaction_receipt(hash).into_future())
                .await;

            match receipt {
                Ok(Some(receipt)) => {
                    return Ok(Inclusion {
                        hash,
                        block_number: receipt.block_number(),
                        success: receipt.status(),
                    });
                }
                Ok(None) => {}
                // A single failed poll does not fail the transaction
                Err(e) => tracing::debug!("Receipt poll for {} failed: {}", hash, e),
            }

            tokio::time::sleep(interval).await;
        }
    }

    async fn swap_events(&self, pool: Address, lookback_blocks: u64) -> Result<Vec<SwapEvent>> {
        let head = self
            .timed_request(self.provider.get_block_number().into_future())
            .await?;
        let filter = Filter::new()
            .address(pool)
            .event_signature(calls::IPool::Swap::SIGNATURE_HASH)
            .from_block(head.saturating_sub(lookback_blocks))
            .to_block(head);

        let logs = self.timed_request(self.provider.get_logs(&filter)).await?;
        let mut events = Vec::with_capacity(logs.len());
        for log in &logs {
            match SwapEvent::from_log(log) {
                Ok(event) => events.push(event),
                Err(e) => tracing::debug!("Skipping undecodable log from {}: {}", pool, e),
            }
        }
        Ok(events)
    }

    async fn status(&self) -> ChainStatus {
        match tokio::time::timeout(
            self.request_timeout(),
            detect_status(&self.provider, self.network),
        )
        .await
        {
            Ok(status) => status,
            Err(_) => ChainStatus::offline(self.network),
        }
    }
}

/// Map an alloy RPC error onto the client error taxonomy
fn classify_rpc_error(err: RpcError<TransportErrorKind>) -> ClientError {
    match err.as_error_resp() {
        Some(payload) => {
            let message = payload.message.to_string();
            if payload.code == USER_REJECTED_CODE || is_rejection_message(&message) {
                ClientError::UserRejected
            } else {
                ClientError::Reverted { reason: message }
            }
        }
        None => ClientError::Transport {
            message: err.to_string(),
        },
    }
}

fn is_rejection_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("user rejected") || lower.contains("user denied")
}
