//! Swap Pipeline State Types
//!
//! Pairs, pools, quotes, transaction intents and their lifecycle states.

use std::fmt;

use evm_client::{ReadCall, WriteCall};
use serde::{Deserialize, Serialize};
use swiftswap_core::{Address, DexError, TokenDescriptor, TxHash, U256};
use tokio::time::Instant;

/// Unordered token pair, stored as (lower, higher) address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairKey {
    token0: Address,
    token1: Address,
}

impl PairKey {
    /// Build the normalized key. Fails when both sides are the same token.
    pub fn new(a: Address, b: Address) -> Result<Self, DexError> {
        if a == b {
            return Err(DexError::InvalidPair {
                token: a.to_string(),
            });
        }
        let (token0, token1) = if a < b { (a, b) } else { (b, a) };
        Ok(Self { token0, token1 })
    }

    /// Same as [`PairKey::new`], reporting the symbol on failure
    pub fn of(a: &TokenDescriptor, b: &TokenDescriptor) -> Result<Self, DexError> {
        Self::new(a.address, b.address).map_err(|_| DexError::InvalidPair {
            token: a.symbol.clone(),
        })
    }

    pub fn token0(&self) -> Address {
        self.token0
    }

    pub fn token1(&self) -> Address {
        self.token1
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.token0, self.token1)
    }
}

/// A deployed pool for one pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolHandle {
    pub address: Address,
    /// Token with the lower address
    pub token0: TokenDescriptor,
    pub token1: TokenDescriptor,
    /// Fee tier in hundredths of a basis point, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<u32>,
}

impl PoolHandle {
    /// Create a handle, ordering the tokens by address
    pub fn new(
        address: Address,
        a: TokenDescriptor,
        b: TokenDescriptor,
        fee: Option<u32>,
    ) -> Result<Self, DexError> {
        PairKey::of(&a, &b)?;
        let (token0, token1) = if a.address < b.address { (a, b) } else { (b, a) };
        Ok(Self {
            address,
            token0,
            token1,
            fee,
        })
    }

    pub fn key(&self) -> PairKey {
        PairKey {
            token0: self.token0.address,
            token1: self.token1.address,
        }
    }

    pub fn contains(&self, token: Address) -> bool {
        self.token0.address == token || self.token1.address == token
    }

    /// The counterpart of `token` in this pool
    pub fn other(&self, token: Address) -> Option<&TokenDescriptor> {
        if self.token0.address == token {
            Some(&self.token1)
        } else if self.token1.address == token {
            Some(&self.token0)
        } else {
            None
        }
    }

    /// Display label such as "SWIFT-BOLT"
    pub fn label(&self) -> String {
        format!("{}-{}", self.token0.symbol, self.token1.symbol)
    }
}

/// Result of resolving a pair against the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(PoolHandle),
    /// No pool deployed for this pair. Not an error.
    NotFound(PairKey),
}

impl Resolution {
    pub fn pool(&self) -> Option<&PoolHandle> {
        match self {
            Self::Found(pool) => Some(pool),
            Self::NotFound(_) => None,
        }
    }

    pub fn key(&self) -> PairKey {
        match self {
            Self::Found(pool) => pool.key(),
            Self::NotFound(key) => *key,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Inputs a quote is requested for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteParams {
    pub pool: Address,
    pub token_in: Address,
    pub amount_in: U256,
}

impl QuoteParams {
    pub fn new(pool: &PoolHandle, token_in: Address, amount_in: U256) -> Self {
        Self {
            pool: pool.address,
            token_in,
            amount_in,
        }
    }

    pub(crate) fn read_call(&self) -> ReadCall {
        ReadCall::GetQuote {
            pool: self.pool,
            token_in: self.token_in,
            amount_in: self.amount_in,
        }
    }
}

/// Pool-reported output amount for one exact input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub pool: Address,
    pub token_in: Address,
    pub amount_in: U256,
    pub amount_out: U256,
    pub fetched_at: Instant,
}

impl Quote {
    /// A quote is only valid for the exact inputs it was fetched for
    pub fn matches(&self, params: &QuoteParams) -> bool {
        self.pool == params.pool
            && self.token_in == params.token_in
            && self.amount_in == params.amount_in
    }
}

/// What the UI should show for the current quote
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum QuoteState {
    /// Nothing requested: zero amount or no pool
    #[default]
    Idle,
    Pending,
    Ready(Quote),
    Failed { reason: String },
}

impl QuoteState {
    pub fn quote(&self) -> Option<&Quote> {
        match self {
            Self::Ready(quote) => Some(quote),
            _ => None,
        }
    }
}

/// Allowance of `owner`'s `token` toward `spender`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allowance {
    pub token: Address,
    pub owner: Address,
    pub spender: Address,
    pub amount: U256,
}

/// Whether an approval must precede the next action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// No spender (no pool) or allowance not yet known
    Disabled,
    NotRequired,
    Required,
}

/// Label for an intent, used in logs and listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Approve,
    Swap,
    AddLiquidity,
    RemoveLiquidity,
    Mint,
}

impl IntentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Swap => "swap",
            Self::AddLiquidity => "add_liquidity",
            Self::RemoveLiquidity => "remove_liquidity",
            Self::Mint => "mint",
        }
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state-changing action the user asked for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionIntent {
    Approve {
        token: Address,
        spender: Address,
        amount: U256,
    },
    Swap {
        pool: Address,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        min_amount_out: U256,
    },
    AddLiquidity {
        pool: Address,
        token0: Address,
        token1: Address,
        amount0: U256,
        amount1: U256,
        amount0_min: U256,
        amount1_min: U256,
        tick_lower: i32,
        tick_upper: i32,
    },
    RemoveLiquidity {
        pool: Address,
        token0: Address,
        token1: Address,
        liquidity: U256,
    },
    /// Faucet mint of a test token
    Mint {
        token: Address,
        to: Address,
        amount: U256,
    },
}

impl TransactionIntent {
    pub fn kind(&self) -> IntentKind {
        match self {
            Self::Approve { .. } => IntentKind::Approve,
            Self::Swap { .. } => IntentKind::Swap,
            Self::AddLiquidity { .. } => IntentKind::AddLiquidity,
            Self::RemoveLiquidity { .. } => IntentKind::RemoveLiquidity,
            Self::Mint { .. } => IntentKind::Mint,
        }
    }

    /// The contract call this intent submits
    pub fn write_call(&self) -> WriteCall {
        match self {
            Self::Approve {
                token,
                spender,
                amount,
            } => WriteCall::Approve {
                token: *token,
                spender: *spender,
                amount: *amount,
            },
            Self::Swap {
                pool,
                token_in,
                amount_in,
                min_amount_out,
                ..
            } => WriteCall::Swap {
                pool: *pool,
                token_in: *token_in,
                amount_in: *amount_in,
                min_amount_out: *min_amount_out,
            },
            Self::AddLiquidity {
                pool,
                amount0,
                amount1,
                amount0_min,
                amount1_min,
                tick_lower,
                tick_upper,
                ..
            } => WriteCall::AddLiquidity {
                pool: *pool,
                amount0: *amount0,
                amount1: *amount1,
                amount0_min: *amount0_min,
                amount1_min: *amount1_min,
                tick_lower: *tick_lower,
                tick_upper: *tick_upper,
            },
            Self::RemoveLiquidity {
                pool, liquidity, ..
            } => WriteCall::RemoveLiquidity {
                pool: *pool,
                liquidity: *liquidity,
            },
            Self::Mint { token, to, amount } => WriteCall::Mint {
                token: *token,
                to: *to,
                amount: *amount,
            },
        }
    }

    /// Cached reads for `owner` that no longer hold once this intent confirms
    pub fn stale_reads(&self, owner: Address) -> Vec<ReadCall> {
        let balance = |token: Address| ReadCall::BalanceOf { token, owner };
        let allowance = |token: Address, spender: Address| ReadCall::Allowance {
            token,
            owner,
            spender,
        };

        match self {
            Self::Approve { token, spender, .. } => vec![allowance(*token, *spender)],
            Self::Swap {
                pool,
                token_in,
                token_out,
                ..
            } => vec![
                balance(*token_in),
                balance(*token_out),
                allowance(*token_in, *pool),
                allowance(*token_out, *pool),
            ],
            Self::AddLiquidity {
                pool,
                token0,
                token1,
                ..
            } => vec![
                balance(*token0),
                balance(*token1),
                balance(*pool),
                allowance(*token0, *pool),
                allowance(*token1, *pool),
            ],
            Self::RemoveLiquidity {
                pool,
                token0,
                token1,
                ..
            } => vec![balance(*token0), balance(*token1), balance(*pool)],
            // The recipient may differ from the submitter
            Self::Mint { token, to, .. } => vec![ReadCall::BalanceOf {
                token: *token,
                owner: *to,
            }],
        }
    }
}

/// Why a transaction did not confirm
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "message", rename_all = "snake_case")]
pub enum FailureReason {
    UserRejected,
    RevertedOrTimeout(String),
    Transport(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserRejected => write!(f, "rejected by user"),
            Self::RevertedOrTimeout(reason) => write!(f, "reverted: {}", reason),
            Self::Transport(message) => write!(f, "transport error: {}", message),
        }
    }
}

/// Lifecycle of one submitted intent
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum TxState {
    #[default]
    Idle,
    Submitting,
    Pending(TxHash),
    Confirmed(TxHash),
    Failed(FailureReason),
}

impl TxState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed(_) | Self::Failed(_))
    }

    pub fn hash(&self) -> Option<TxHash> {
        match self {
            Self::Pending(hash) | Self::Confirmed(hash) => Some(*hash),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Submitting => 1,
            Self::Pending(_) => 2,
            Self::Confirmed(_) | Self::Failed(_) => 3,
        }
    }

    /// States only move forward and terminal states are final
    pub fn can_transition_to(&self, next: &TxState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            // Rejection and transport failures happen before a hash exists
            Self::Failed(FailureReason::UserRejected) | Self::Failed(FailureReason::Transport(_)) => {
                matches!(self, Self::Submitting)
            }
            Self::Failed(FailureReason::RevertedOrTimeout(_)) => {
                matches!(self, Self::Submitting | Self::Pending(_))
            }
            Self::Confirmed(hash) => self.hash() == Some(*hash),
            _ => next.rank() == self.rank() + 1,
        }
    }
}
