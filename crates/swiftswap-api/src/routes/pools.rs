//! Token and pool discovery routes

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use swap::{recent_swaps, Resolution, RECENT_SWAPS_LIMIT};

use super::{client_error, dex_error, pair_tokens, state_error, ApiResult};
use crate::dto::{
    ApiError, PairQuery, PoolDto, PoolsResponse, RecentSwapsQuery, RecentSwapsResponse,
    ResolveResponse, TokenDto, TokensResponse,
};
use crate::state::parse_address;
use crate::AppState;

/// Create token and pool routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tokens", get(get_tokens))
        .route("/pools", get(get_pools))
        .route("/pools/resolve", get(resolve_pool))
        .route("/pools/:address/swaps", get(get_recent_swaps))
}

/// GET /tokens - Configured tokens
async fn get_tokens(State(state): State<AppState>) -> Json<TokensResponse> {
    let tokens: Vec<TokenDto> = state.registry().tokens().iter().map(Into::into).collect();
    let count = tokens.len();
    Json(TokensResponse { tokens, count })
}

/// GET /pools - Deployed pools
async fn get_pools(State(state): State<AppState>) -> Json<PoolsResponse> {
    let pools: Vec<PoolDto> = state
        .registry()
        .pools()
        .into_iter()
        .map(Into::into)
        .collect();
    let count = pools.len();
    Json(PoolsResponse { pools, count })
}

/// GET /pools/resolve?token_in=&token_out= - Pool serving a pair
async fn resolve_pool(
    State(state): State<AppState>,
    Query(query): Query<PairQuery>,
) -> ApiResult<ResolveResponse> {
    let (token_in, token_out) = pair_tokens(&state, &query.token_in, &query.token_out)?;
    let resolution = state
        .registry()
        .resolve(&token_in, &token_out)
        .map_err(dex_error)?;

    Ok(Json(match resolution {
        Resolution::Found(pool) => ResolveResponse {
            found: true,
            pool: Some((&pool).into()),
        },
        Resolution::NotFound(_) => ResolveResponse {
            found: false,
            pool: None,
        },
    }))
}

/// GET /pools/:address/swaps?limit= - Latest swaps on a configured pool
async fn get_recent_swaps(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(query): Query<RecentSwapsQuery>,
) -> ApiResult<RecentSwapsResponse> {
    let address = parse_address(&address).map_err(state_error)?;
    let pool = state
        .registry()
        .pool_by_address(address)
        .cloned()
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ApiError::not_found(format!("Pool not found: {}", address))),
            )
        })?;

    let limit = query.limit.unwrap_or(RECENT_SWAPS_LIMIT);
    let swaps = recent_swaps(state.client(), &pool, limit)
        .await
        .map_err(client_error)?;

    let swaps: Vec<_> = swaps.iter().map(Into::into).collect();
    Ok(Json(RecentSwapsResponse {
        pool: pool.address,
        count: swaps.len(),
        swaps,
    }))
}
