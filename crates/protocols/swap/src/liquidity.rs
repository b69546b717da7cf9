//! Liquidity provision
//!
//! Full-range add/remove intents, the approvals adding needs, and the
//! caller's LP positions across configured pools.

use serde::{Deserialize, Serialize};
use swiftswap_core::constants::{MAX_TICK, MIN_TICK};
use swiftswap_core::{Address, ClientError, DexError, U256};

use evm_client::{ChainClient, ReadCall};

use crate::allowance::AllowanceGatekeeper;
use crate::resolver::PoolRegistry;
use crate::state::{ApprovalStatus, PoolHandle, TransactionIntent};

/// Amounts for a full-range deposit, in token0/token1 order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityRequest {
    pub amount0: U256,
    pub amount1: U256,
    #[serde(default)]
    pub amount0_min: U256,
    #[serde(default)]
    pub amount1_min: U256,
}

impl LiquidityRequest {
    /// Deposit with no minimums
    pub fn new(amount0: U256, amount1: U256) -> Self {
        Self {
            amount0,
            amount1,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), DexError> {
        if self.amount0.is_zero() || self.amount1.is_zero() {
            return Err(DexError::InvalidAmount {
                message: "both token amounts must be positive".to_string(),
            });
        }
        if self.amount0_min > self.amount0 || self.amount1_min > self.amount1 {
            return Err(DexError::InvalidAmount {
                message: "minimum exceeds deposit amount".to_string(),
            });
        }
        Ok(())
    }
}

fn require_pool(pool: Option<&PoolHandle>) -> Result<&PoolHandle, DexError> {
    pool.ok_or_else(|| DexError::NoRoute {
        token_in: "?".to_string(),
        token_out: "?".to_string(),
    })
}

/// Build a full-range `addLiquidity` intent
pub fn add_liquidity_intent(
    pool: Option<&PoolHandle>,
    request: &LiquidityRequest,
) -> Result<TransactionIntent, DexError> {
    let pool = require_pool(pool)?;
    request.validate()?;

    Ok(TransactionIntent::AddLiquidity {
        pool: pool.address,
        token0: pool.token0.address,
        token1: pool.token1.address,
        amount0: request.amount0,
        amount1: request.amount1,
        amount0_min: request.amount0_min,
        amount1_min: request.amount1_min,
        tick_lower: MIN_TICK,
        tick_upper: MAX_TICK,
    })
}

/// Build a `removeLiquidity` intent burning `liquidity` LP units
pub fn remove_liquidity_intent(
    pool: Option<&PoolHandle>,
    liquidity: U256,
) -> Result<TransactionIntent, DexError> {
    let pool = require_pool(pool)?;
    if liquidity.is_zero() {
        return Err(DexError::InvalidAmount {
            message: "liquidity to remove must be positive".to_string(),
        });
    }

    Ok(TransactionIntent::RemoveLiquidity {
        pool: pool.address,
        token0: pool.token0.address,
        token1: pool.token1.address,
        liquidity,
    })
}

/// Approval status of token0 and token1 toward the pool.
///
/// Adding is allowed only when both are `NotRequired`.
pub async fn liquidity_approvals(
    gatekeeper: &AllowanceGatekeeper,
    client: &dyn ChainClient,
    owner: Address,
    pool: &PoolHandle,
    request: &LiquidityRequest,
) -> Result<(ApprovalStatus, ApprovalStatus), ClientError> {
    let status0 = gatekeeper
        .status(client, pool.token0.address, owner, Some(pool), request.amount0)
        .await?;
    let status1 = gatekeeper
        .status(client, pool.token1.address, owner, Some(pool), request.amount1)
        .await?;
    Ok((status0, status1))
}

/// LP balance held in one pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Position {
    pub pool: PoolHandle,
    pub liquidity: U256,
}

/// LP balances of `owner` across every configured pool.
///
/// Pools with a zero balance are omitted; pools that fail to read are
/// logged and skipped.
pub async fn fetch_positions(
    client: &dyn ChainClient,
    registry: &PoolRegistry,
    owner: Address,
) -> Vec<Position> {
    let pools = registry.pools();
    let reads = pools.iter().map(|pool| {
        let call = ReadCall::BalanceOf {
            token: pool.address,
            owner,
        };
        async move { (*pool, client.read(&call).await) }
    });

    futures::future::join_all(reads)
        .await
        .into_iter()
        .filter_map(|(pool, result)| match result {
            Ok(liquidity) if !liquidity.is_zero() => Some(Position {
                pool: pool.clone(),
                liquidity,
            }),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Failed to read LP balance for {}: {}", pool.label(), e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{pool, registry, FakeChainClient, OWNER};
    use std::time::Duration;

    #[test]
    fn test_add_liquidity_full_range() {
        let p = pool();
        let intent =
            add_liquidity_intent(Some(&p), &LiquidityRequest::new(U256::from(10), U256::from(20)))
                .unwrap();
        match intent {
            TransactionIntent::AddLiquidity {
                pool,
                tick_lower,
                tick_upper,
                amount0_min,
                amount1_min,
                ..
            } => {
                assert_eq!(pool, p.address);
                assert_eq!(tick_lower, -887_272);
                assert_eq!(tick_upper, 887_272);
                assert_eq!(amount0_min, U256::ZERO);
                assert_eq!(amount1_min, U256::ZERO);
            }
            other => panic!("unexpected intent {:?}", other),
        }
    }

    #[test]
    fn test_add_liquidity_validation() {
        let p = pool();
        assert!(matches!(
            add_liquidity_intent(None, &LiquidityRequest::new(U256::from(1), U256::from(1))),
            Err(DexError::NoRoute { .. })
        ));
        assert!(matches!(
            add_liquidity_intent(Some(&p), &LiquidityRequest::new(U256::ZERO, U256::from(1))),
            Err(DexError::InvalidAmount { .. })
        ));

        let request = LiquidityRequest {
            amount0_min: U256::from(11),
            ..LiquidityRequest::new(U256::from(10), U256::from(10))
        };
        assert!(add_liquidity_intent(Some(&p), &request).is_err());
    }

    #[test]
    fn test_remove_liquidity_rejects_zero() {
        let p = pool();
        assert!(matches!(
            remove_liquidity_intent(Some(&p), U256::ZERO),
            Err(DexError::InvalidAmount { .. })
        ));
        let intent = remove_liquidity_intent(Some(&p), U256::from(5)).unwrap();
        assert_eq!(intent.write_call().name(), "removeLiquidity");
    }

    #[tokio::test(start_paused = true)]
    async fn test_liquidity_approvals_per_token() {
        let client = FakeChainClient::new();
        let p = pool();
        client.set_read(
            ReadCall::Allowance {
                token: p.token0.address,
                owner: OWNER,
                spender: p.address,
            },
            U256::from(100),
        );

        let gatekeeper = AllowanceGatekeeper::new(Duration::from_secs(10));
        let (a, b) = liquidity_approvals(
            &gatekeeper,
            &client,
            OWNER,
            &p,
            &LiquidityRequest::new(U256::from(100), U256::from(100)),
        )
        .await
        .unwrap();
        assert_eq!(a, ApprovalStatus::NotRequired);
        assert_eq!(b, ApprovalStatus::Required);
    }

    #[tokio::test]
    async fn test_positions_skip_zero_and_failures() {
        let client = FakeChainClient::new();
        let mut registry = registry();
        let second = PoolHandle::new(
            Address::repeat_byte(0xef),
            crate::testing::bolt(),
            crate::testing::flash(),
            Some(3000),
        )
        .unwrap();
        registry.add_pool(second.clone()).unwrap();

        client.set_read(
            ReadCall::BalanceOf {
                token: pool().address,
                owner: OWNER,
            },
            U256::from(77),
        );
        client.fail_read(
            ReadCall::BalanceOf {
                token: second.address,
                owner: OWNER,
            },
            ClientError::Timeout { secs: 30 },
        );

        let positions = fetch_positions(&client, &registry, OWNER).await;
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].pool, pool());
        assert_eq!(positions[0].liquidity, U256::from(77));

        let nobody = fetch_positions(&client, &registry, Address::repeat_byte(0x42)).await;
        assert!(nobody.is_empty());
    }
}
