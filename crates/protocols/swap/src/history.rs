//! Recent swaps on a pool
//!
//! Reads the pool's `Swap` logs over a bounded block window and presents
//! them newest first, in the direction the trader saw them.

use evm_client::{ChainClient, SwapEvent};
use serde::{Deserialize, Serialize};
use swiftswap_core::{Address, BlockNumber, ClientError, TxHash, U256};

use crate::state::PoolHandle;

/// Most swaps listed per pool
pub const RECENT_SWAPS_LIMIT: usize = 20;

/// Blocks searched back from the head
pub const RECENT_SWAPS_LOOKBACK: u64 = 5_000;

/// Direction relative to the pool's token0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapSide {
    /// token0 left the pool
    Buy,
    Sell,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentSwap {
    pub tx_hash: Option<TxHash>,
    pub block_number: Option<BlockNumber>,
    pub sender: Address,
    pub side: SwapSide,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
    pub amount_out: U256,
}

impl RecentSwap {
    /// Orient a raw pool event. Positive pool deltas are what the trader paid.
    pub fn from_event(pool: &PoolHandle, event: &SwapEvent) -> Self {
        let token0_in = event.amount0.is_positive();
        let (token_in, token_out, paid, received) = if token0_in {
            (pool.token0.address, pool.token1.address, event.amount0, event.amount1)
        } else {
            (pool.token1.address, pool.token0.address, event.amount1, event.amount0)
        };

        Self {
            tx_hash: event.tx_hash,
            block_number: event.block_number,
            sender: event.sender,
            side: if event.amount0.is_negative() {
                SwapSide::Buy
            } else {
                SwapSide::Sell
            },
            token_in,
            token_out,
            amount_in: paid.unsigned_abs(),
            amount_out: received.unsigned_abs(),
        }
    }
}

/// Up to `limit` swaps on `pool`, newest first
pub async fn recent_swaps(
    client: &dyn ChainClient,
    pool: &PoolHandle,
    limit: usize,
) -> Result<Vec<RecentSwap>, ClientError> {
    let mut events = client
        .swap_events(pool.address, RECENT_SWAPS_LOOKBACK)
        .await?;
    events.sort_by_key(|e| std::cmp::Reverse(e.position()));
    events.truncate(limit.min(RECENT_SWAPS_LIMIT));

    tracing::trace!("{} recent swaps on {}", events.len(), pool.label());
    Ok(events
        .iter()
        .map(|event| RecentSwap::from_event(pool, event))
        .collect())
}
