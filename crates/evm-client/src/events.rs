//! Pool event decoding

use alloy::rpc::types::Log;
use alloy::sol_types::SolEvent;
use swiftswap_core::{Address, BlockNumber, ClientError, TxHash, I256};

use crate::calls::IPool;
use crate::Result;

/// One decoded `Swap` log from a pool
///
/// Amounts are signed from the pool's side: positive flowed into the pool,
/// negative flowed out to the recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapEvent {
    pub pool: Address,
    pub tx_hash: Option<TxHash>,
    pub block_number: Option<BlockNumber>,
    pub log_index: Option<u64>,
    pub sender: Address,
    pub recipient: Address,
    pub amount0: I256,
    pub amount1: I256,
}

impl SwapEvent {
    /// Decode a raw RPC log, which must carry the `Swap` topic
    pub fn from_log(log: &Log) -> Result<Self> {
        let decoded = IPool::Swap::decode_log(&log.inner).map_err(|e| ClientError::Decode {
            message: format!("Swap log: {}", e),
        })?;
        let event = &decoded.data;

        Ok(Self {
            pool: log.inner.address,
            tx_hash: log.transaction_hash,
            block_number: log.block_number,
            log_index: log.log_index,
            sender: event.sender,
            recipient: event.recipient,
            amount0: event.amount0,
            amount1: event.amount1,
        })
    }

    /// Chain position used for newest-first ordering
    pub fn position(&self) -> (BlockNumber, u64) {
        (
            self.block_number.unwrap_or_default(),
            self.log_index.unwrap_or_default(),
        )
    }
}
