//! Data Transfer Objects for API requests and responses
//!
//! Token amounts travel as decimal strings of base units.

use serde::{Deserialize, Serialize};
use swap::{
    ApprovalStatus, IntentKind, PoolHandle, Position, RecentSwap, SwapSide, TrackedTxInfo,
    TxHandle, TxState,
};
use swiftswap_core::{Address, DexError, TokenDescriptor, TxHash, U256};
use uuid::Uuid;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Chain status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainStatusResponse {
    pub connected: bool,
    pub url: String,
    pub network: String,
    pub chain_id: Option<u64>,
    pub expected_chain_id: u64,
    /// Endpoint serves the chain the deployment lives on
    pub network_matches: bool,
    pub block_number: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenDto {
    pub address: Address,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
}

impl From<&TokenDescriptor> for TokenDto {
    fn from(token: &TokenDescriptor) -> Self {
        Self {
            address: token.address,
            symbol: token.symbol.clone(),
            name: token.name.clone(),
            decimals: token.decimals,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokensResponse {
    pub tokens: Vec<TokenDto>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolDto {
    pub address: Address,
    pub label: String,
    pub token0: TokenDto,
    pub token1: TokenDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<u32>,
}

impl From<&PoolHandle> for PoolDto {
    fn from(pool: &PoolHandle) -> Self {
        Self {
            address: pool.address,
            label: pool.label(),
            token0: (&pool.token0).into(),
            token1: (&pool.token1).into(),
            fee: pool.fee,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolsResponse {
    pub pools: Vec<PoolDto>,
    pub count: usize,
}

/// Pair selection by symbol or address
#[derive(Debug, Clone, Deserialize)]
pub struct PairQuery {
    pub token_in: String,
    pub token_out: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<PoolDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteRequest {
    pub token_in: String,
    pub token_out: String,
    pub amount_in: String,
    /// Defaults to the configured slippage
    #[serde(default)]
    pub slippage_bps: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteResponse {
    pub pool: Address,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: String,
    pub amount_out: String,
    /// Human-readable output in token_out units
    pub amount_out_formatted: String,
    pub min_amount_out: String,
    pub slippage_bps: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AllowanceQuery {
    pub token_in: String,
    pub token_out: String,
    /// Defaults to the connected account
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowanceResponse {
    pub token: Address,
    pub owner: Address,
    /// Absent when no pool serves the pair
    pub spender: Option<Address>,
    pub allowance: Option<String>,
    pub required: String,
    pub status: ApprovalStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceDto {
    pub token: TokenDto,
    pub balance: String,
    pub formatted: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancesResponse {
    pub owner: Address,
    pub balances: Vec<BalanceDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApproveRequest {
    pub token_in: String,
    pub token_out: String,
    pub amount: String,
    #[serde(default)]
    pub from: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwapRequest {
    pub token_in: String,
    pub token_out: String,
    pub amount_in: String,
    #[serde(default)]
    pub slippage_bps: Option<u16>,
    #[serde(default)]
    pub from: Option<String>,
}

/// Faucet mint; `amount` defaults to 1000 whole tokens
#[derive(Debug, Clone, Deserialize)]
pub struct FaucetRequest {
    pub token: String,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecentSwapsQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentSwapDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    pub sender: Address,
    pub side: SwapSide,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: String,
    pub amount_out: String,
}

impl From<&RecentSwap> for RecentSwapDto {
    fn from(swap: &RecentSwap) -> Self {
        Self {
            tx_hash: swap.tx_hash,
            block_number: swap.block_number,
            sender: swap.sender,
            side: swap.side,
            token_in: swap.token_in,
            token_out: swap.token_out,
            amount_in: swap.amount_in.to_string(),
            amount_out: swap.amount_out.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentSwapsResponse {
    pub pool: Address,
    pub swaps: Vec<RecentSwapDto>,
    pub count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddLiquidityRequest {
    pub token_a: String,
    pub token_b: String,
    pub amount_a: String,
    pub amount_b: String,
    #[serde(default)]
    pub amount_a_min: Option<String>,
    #[serde(default)]
    pub amount_b_min: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoveLiquidityRequest {
    pub token_a: String,
    pub token_b: String,
    pub liquidity: String,
    #[serde(default)]
    pub from: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionDto {
    pub pool: PoolDto,
    pub liquidity: String,
}

impl From<&Position> for PositionDto {
    fn from(position: &Position) -> Self {
        Self {
            pool: (&position.pool).into(),
            liquidity: position.liquidity.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionsResponse {
    pub owner: Address,
    pub positions: Vec<PositionDto>,
}

/// Returned as soon as an intent is handed to the executor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxSubmittedResponse {
    pub id: Uuid,
    pub kind: IntentKind,
    pub state: TxState,
}

impl From<&TxHandle> for TxSubmittedResponse {
    fn from(handle: &TxHandle) -> Self {
        Self {
            id: handle.id(),
            kind: handle.kind(),
            state: handle.state(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxDto {
    pub id: Uuid,
    pub kind: IntentKind,
    pub from: Address,
    pub state: TxState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<TxHash>,
    pub elapsed_secs: u64,
}

impl From<TrackedTxInfo> for TxDto {
    fn from(info: TrackedTxInfo) -> Self {
        Self {
            id: info.id,
            kind: info.kind,
            from: info.from,
            hash: info.state.hash(),
            state: info.state,
            elapsed_secs: info.elapsed_secs,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxListResponse {
    pub transactions: Vec<TxDto>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PruneResponse {
    pub removed: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletRequest {
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletResponse {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

/// Generic API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("not_found", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("bad_request", message)
    }
}

impl From<&DexError> for ApiError {
    fn from(err: &DexError) -> Self {
        Self::new(err.error_code(), err.to_string())
    }
}

/// Parse a decimal string of base units
pub fn parse_base_units(value: &str) -> Result<U256, DexError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DexError::InvalidAmount {
            message: format!("'{}' is not a decimal integer", value),
        });
    }
    U256::from_str_radix(trimmed, 10).map_err(|e| DexError::InvalidAmount {
        message: format!("'{}': {}", value, e),
    })
}
