//! API route handlers

pub mod chain;
pub mod faucet;
pub mod health;
pub mod liquidity;
pub mod pools;
pub mod swap;
pub mod tx;
pub mod wallet;

use axum::{http::StatusCode, routing::get, Json, Router};
use swiftswap_core::{Address, ClientError, DexError, TokenDescriptor, U256};

use crate::dto::{parse_base_units, ApiError};
use crate::state::StateError;
use crate::AppState;

pub(crate) type HandlerError = (StatusCode, Json<ApiError>);
pub(crate) type ApiResult<T> = Result<Json<T>, HandlerError>;

/// Create the API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/chain", chain::router())
        .nest("/wallet", wallet::router())
        .merge(pools::router())
        .merge(swap::router())
        .merge(liquidity::router())
        .merge(tx::router())
        .merge(faucet::router())
        .with_state(state)
}

pub(crate) fn dex_error(err: DexError) -> HandlerError {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        tracing::warn!("Request failed: {}", err);
    }
    (status, Json(ApiError::from(&err)))
}

pub(crate) fn client_error(err: ClientError) -> HandlerError {
    dex_error(err.into())
}

pub(crate) fn state_error(err: StateError) -> HandlerError {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError::bad_request(err.to_string())),
    )
}

pub(crate) fn amount(value: &str) -> Result<U256, HandlerError> {
    parse_base_units(value).map_err(dex_error)
}

pub(crate) fn optional_amount(value: Option<&str>) -> Result<U256, HandlerError> {
    value.map(amount).transpose().map(Option::unwrap_or_default)
}

/// Look up both tokens of a pair by symbol or address
pub(crate) fn pair_tokens(
    state: &AppState,
    a: &str,
    b: &str,
) -> Result<(TokenDescriptor, TokenDescriptor), HandlerError> {
    let registry = state.registry();
    let a = registry.require_token(a).map_err(dex_error)?.clone();
    let b = registry.require_token(b).map_err(dex_error)?.clone();
    Ok((a, b))
}

/// The account to act for, failing when none is connected
pub(crate) async fn require_account(
    state: &AppState,
    from: Option<&str>,
) -> Result<Address, HandlerError> {
    state
        .account(from)
        .await
        .map_err(state_error)?
        .ok_or_else(|| dex_error(DexError::WalletNotConnected))
}

pub(crate) fn no_route(a: &TokenDescriptor, b: &TokenDescriptor) -> DexError {
    DexError::NoRoute {
        token_in: a.symbol.clone(),
        token_out: b.symbol.clone(),
    }
}
