//! Allowance Gatekeeper and balance tracking
//!
//! Decides whether an approval must precede a swap or liquidity action and
//! builds the approval intent. The spender is always the pool; with no pool
//! resolved there is nothing to approve and approval is disabled.

use std::time::Duration;

use evm_client::{ChainClient, ReadCall};
use swiftswap_core::{Address, ClientError, DexError, TokenDescriptor, U256};

use crate::cache::ReadCache;
use crate::state::{ApprovalStatus, PoolHandle, TransactionIntent};

/// `true` iff the allowance does not cover the amount
pub fn needs_approval(allowance: U256, required: U256) -> bool {
    allowance < required
}

/// Approval status for the current selection.
///
/// `allowance` is `None` while it has not been read yet.
pub fn approval_status(
    spender: Option<&PoolHandle>,
    allowance: Option<U256>,
    required: U256,
) -> ApprovalStatus {
    if spender.is_none() {
        return ApprovalStatus::Disabled;
    }
    if required.is_zero() {
        return ApprovalStatus::NotRequired;
    }
    match allowance {
        None => ApprovalStatus::Disabled,
        Some(allowance) if needs_approval(allowance, required) => ApprovalStatus::Required,
        Some(_) => ApprovalStatus::NotRequired,
    }
}

/// Build an approval of exactly `amount` of `token` toward the pool
pub fn approve_intent(
    token: &TokenDescriptor,
    spender: Option<&PoolHandle>,
    amount: U256,
) -> Result<TransactionIntent, DexError> {
    let pool = spender.ok_or_else(|| DexError::NoRoute {
        token_in: token.symbol.clone(),
        token_out: "?".to_string(),
    })?;
    if !pool.contains(token.address) {
        return Err(DexError::NoRoute {
            token_in: token.symbol.clone(),
            token_out: pool.label(),
        });
    }
    if amount.is_zero() {
        return Err(DexError::InvalidAmount {
            message: "approval amount must be positive".to_string(),
        });
    }

    Ok(TransactionIntent::Approve {
        token: token.address,
        spender: pool.address,
        amount,
    })
}

/// Cached allowance reads and approval decisions
#[derive(Debug)]
pub struct AllowanceGatekeeper {
    cache: ReadCache,
}

impl AllowanceGatekeeper {
    pub fn new(freshness: Duration) -> Self {
        Self {
            cache: ReadCache::new(freshness),
        }
    }

    pub fn cache(&self) -> &ReadCache {
        &self.cache
    }

    pub async fn get_allowance(
        &self,
        client: &dyn ChainClient,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ClientError> {
        let call = ReadCall::Allowance {
            token,
            owner,
            spender,
        };
        self.cache.get(client, &call).await
    }

    /// Read the allowance toward `spender` (if any) and decide
    pub async fn status(
        &self,
        client: &dyn ChainClient,
        token: Address,
        owner: Address,
        spender: Option<&PoolHandle>,
        required: U256,
    ) -> Result<ApprovalStatus, ClientError> {
        let allowance = match spender {
            Some(pool) if !required.is_zero() => {
                Some(self.get_allowance(client, token, owner, pool.address).await?)
            }
            _ => None,
        };
        Ok(approval_status(spender, allowance, required))
    }

    pub fn approve(
        &self,
        token: &TokenDescriptor,
        spender: Option<&PoolHandle>,
        amount: U256,
    ) -> Result<TransactionIntent, DexError> {
        approve_intent(token, spender, amount)
    }

    pub async fn invalidate(&self, token: Address, owner: Address, spender: Address) {
        self.cache
            .invalidate(&ReadCall::Allowance {
                token,
                owner,
                spender,
            })
            .await;
    }
}

/// Cached token balances
#[derive(Debug)]
pub struct BalanceTracker {
    cache: ReadCache,
}

impl BalanceTracker {
    pub fn new(freshness: Duration) -> Self {
        Self {
            cache: ReadCache::new(freshness),
        }
    }

    pub fn cache(&self) -> &ReadCache {
        &self.cache
    }

    pub async fn balance_of(
        &self,
        client: &dyn ChainClient,
        token: Address,
        owner: Address,
    ) -> Result<U256, ClientError> {
        self.cache
            .get(client, &ReadCall::BalanceOf { token, owner })
            .await
    }

    pub async fn invalidate(&self, token: Address, owner: Address) {
        self.cache
            .invalidate(&ReadCall::BalanceOf { token, owner })
            .await;
    }
}
