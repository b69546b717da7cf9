//! Chain status detection
//!
//! Checks the RPC endpoint for liveness, chain id and head block.

use alloy::providers::Provider;
use serde::{Deserialize, Serialize};
use swiftswap_core::{BlockNumber, Network};

/// Chain status detected through probing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainStatus {
    /// Endpoint is reachable and responding
    pub is_online: bool,

    /// Chain id reported by the endpoint
    pub chain_id: Option<u64>,

    /// Latest block number
    pub block_number: BlockNumber,

    /// Chain id the configured deployment lives on
    pub expected_chain_id: u64,
}

impl ChainStatus {
    pub fn offline(expected: Network) -> Self {
        Self {
            is_online: false,
            chain_id: None,
            block_number: 0,
            expected_chain_id: expected.chain_id(),
        }
    }

    /// The endpoint serves the chain the deployment was made on
    pub fn is_expected_network(&self) -> bool {
        self.chain_id == Some(self.expected_chain_id)
    }

    pub fn network(&self) -> Option<Network> {
        self.chain_id.and_then(Network::from_chain_id)
    }
}

/// Detect chain status by probing the provider
pub async fn detect_status<P: Provider>(provider: &P, expected: Network) -> ChainStatus {
    let block_number = match provider.get_block_number().await {
        Ok(n) => n,
        Err(e) => {
            tracing::debug!("Chain status check failed: {}", e);
            return ChainStatus::offline(expected);
        }
    };

    let chain_id = provider.get_chain_id().await.ok();

    ChainStatus {
        is_online: true,
        chain_id,
        block_number,
        expected_chain_id: expected.chain_id(),
    }
}
