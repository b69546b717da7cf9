//! Liquidity routes

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use swap::{
    add_liquidity_intent, fetch_positions, liquidity_approvals, remove_liquidity_intent,
    ApprovalStatus, LiquidityRequest, PoolHandle,
};
use swiftswap_core::{Address, DexError, TokenDescriptor, U256};

use super::{
    amount, client_error, dex_error, no_route, optional_amount, pair_tokens, require_account,
    state_error, ApiResult, HandlerError,
};
use crate::dto::{
    AddLiquidityRequest, PositionsResponse, RemoveLiquidityRequest, TxSubmittedResponse,
};
use crate::state::parse_address;
use crate::AppState;

/// Create liquidity routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/liquidity/add", post(add_liquidity))
        .route("/liquidity/remove", post(remove_liquidity))
        .route("/positions/:owner", get(get_positions))
}

fn require_pool(
    state: &AppState,
    a: &TokenDescriptor,
    b: &TokenDescriptor,
) -> Result<PoolHandle, HandlerError> {
    let resolution = state.registry().resolve(a, b).map_err(dex_error)?;
    resolution
        .pool()
        .cloned()
        .ok_or_else(|| dex_error(no_route(a, b)))
}

/// POST /liquidity/add - Full-range deposit into the pair's pool
async fn add_liquidity(
    State(state): State<AppState>,
    Json(request): Json<AddLiquidityRequest>,
) -> ApiResult<TxSubmittedResponse> {
    let (token_a, token_b) = pair_tokens(&state, &request.token_a, &request.token_b)?;
    let pool = require_pool(&state, &token_a, &token_b)?;
    let owner = require_account(&state, request.from.as_deref()).await?;

    let amount_a = amount(&request.amount_a)?;
    let amount_b = amount(&request.amount_b)?;
    let min_a = optional_amount(request.amount_a_min.as_deref())?;
    let min_b = optional_amount(request.amount_b_min.as_deref())?;

    // Callers name tokens in any order; the pool wants token0 first
    let a_is_token0 = pool.token0.address == token_a.address;
    let liquidity = if a_is_token0 {
        LiquidityRequest {
            amount0: amount_a,
            amount1: amount_b,
            amount0_min: min_a,
            amount1_min: min_b,
        }
    } else {
        LiquidityRequest {
            amount0: amount_b,
            amount1: amount_a,
            amount0_min: min_b,
            amount1_min: min_a,
        }
    };

    let intent = add_liquidity_intent(Some(&pool), &liquidity).map_err(dex_error)?;

    let gatekeeper = &state.pipeline().caches.allowances;
    let (status0, status1) =
        liquidity_approvals(gatekeeper, state.client(), owner, &pool, &liquidity)
            .await
            .map_err(client_error)?;
    for (status, token, required) in [
        (status0, &pool.token0, liquidity.amount0),
        (status1, &pool.token1, liquidity.amount1),
    ] {
        if status == ApprovalStatus::Required {
            let available = gatekeeper
                .get_allowance(state.client(), token.address, owner, pool.address)
                .await
                .map_err(client_error)?;
            tracing::debug!(
                "Liquidity add blocked on {} approval for {}",
                token.symbol,
                pool.label()
            );
            return Err(dex_error(DexError::ApprovalRequired {
                required,
                available,
            }));
        }
    }

    let handle = state.pipeline().executor.submit(intent, owner).await;
    Ok(Json((&handle).into()))
}

/// POST /liquidity/remove - Burn LP units from the pair's pool
async fn remove_liquidity(
    State(state): State<AppState>,
    Json(request): Json<RemoveLiquidityRequest>,
) -> ApiResult<TxSubmittedResponse> {
    let (token_a, token_b) = pair_tokens(&state, &request.token_a, &request.token_b)?;
    let pool = require_pool(&state, &token_a, &token_b)?;
    let owner = require_account(&state, request.from.as_deref()).await?;
    let liquidity: U256 = amount(&request.liquidity)?;

    let intent = remove_liquidity_intent(Some(&pool), liquidity).map_err(dex_error)?;
    let handle = state.pipeline().executor.submit(intent, owner).await;
    Ok(Json((&handle).into()))
}

/// GET /positions/:owner - LP balances across configured pools
async fn get_positions(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> ApiResult<PositionsResponse> {
    let owner: Address = parse_address(&owner).map_err(state_error)?;
    let positions = fetch_positions(state.client(), state.registry(), owner).await;

    Ok(Json(PositionsResponse {
        owner,
        positions: positions.iter().map(Into::into).collect(),
    }))
}
