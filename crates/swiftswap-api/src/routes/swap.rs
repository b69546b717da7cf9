//! Quote, allowance and swap routes

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use swap::{
    approval_status, approve_intent, fetch_quote, format_amount, min_amount_out, QuoteOutcome,
    SlippageTolerance,
};
use swiftswap_core::DexError;

use super::{
    amount, client_error, dex_error, no_route, optional_amount, pair_tokens, require_account,
    state_error, ApiResult, HandlerError,
};
use crate::dto::{
    AllowanceQuery, AllowanceResponse, ApproveRequest, BalanceDto, BalancesResponse, QuoteRequest,
    QuoteResponse, SwapRequest, TxSubmittedResponse,
};
use crate::state::parse_address;
use crate::AppState;

/// Create swap routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/quote", post(get_quote))
        .route("/allowance", get(get_allowance))
        .route("/balances/:owner", get(get_balances))
        .route("/approve", post(approve))
        .route("/swap", post(swap))
}

async fn slippage_or_default(
    state: &AppState,
    bps: Option<u16>,
) -> Result<SlippageTolerance, HandlerError> {
    match bps {
        Some(bps) => SlippageTolerance::from_bps(bps),
        None => state.default_slippage().await,
    }
    .map_err(dex_error)
}

/// POST /quote - One-shot quote with slippage-protected minimum
async fn get_quote(
    State(state): State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> ApiResult<QuoteResponse> {
    let (token_in, token_out) = pair_tokens(&state, &request.token_in, &request.token_out)?;
    let resolution = state
        .registry()
        .resolve(&token_in, &token_out)
        .map_err(dex_error)?;
    let pool = resolution
        .pool()
        .ok_or_else(|| dex_error(no_route(&token_in, &token_out)))?;

    let amount_in = amount(&request.amount_in)?;
    let slippage = slippage_or_default(&state, request.slippage_bps).await?;

    let quote = match fetch_quote(state.client(), Some(pool), token_in.address, amount_in).await {
        QuoteOutcome::Ready(quote) => quote,
        QuoteOutcome::Failed(reason) => {
            return Err(dex_error(DexError::QuoteUnavailable { reason }))
        }
        QuoteOutcome::Absent => {
            return Err(dex_error(DexError::InvalidAmount {
                message: "amount must be positive".to_string(),
            }))
        }
    };

    Ok(Json(QuoteResponse {
        pool: pool.address,
        token_in: token_in.address,
        token_out: token_out.address,
        amount_in: quote.amount_in.to_string(),
        amount_out: quote.amount_out.to_string(),
        amount_out_formatted: format_amount(quote.amount_out, token_out.decimals),
        min_amount_out: min_amount_out(quote.amount_out, slippage).to_string(),
        slippage_bps: slippage.bps(),
    }))
}

/// GET /allowance - Allowance of token_in toward the pair's pool
async fn get_allowance(
    State(state): State<AppState>,
    Query(query): Query<AllowanceQuery>,
) -> ApiResult<AllowanceResponse> {
    let (token_in, token_out) = pair_tokens(&state, &query.token_in, &query.token_out)?;
    let resolution = state
        .registry()
        .resolve(&token_in, &token_out)
        .map_err(dex_error)?;
    let owner = require_account(&state, query.owner.as_deref()).await?;
    let required = optional_amount(query.amount.as_deref())?;

    let pool = resolution.pool();
    let allowance = match pool {
        Some(pool) => Some(
            state
                .pipeline()
                .caches
                .allowances
                .get_allowance(state.client(), token_in.address, owner, pool.address)
                .await
                .map_err(client_error)?,
        ),
        None => None,
    };

    Ok(Json(AllowanceResponse {
        token: token_in.address,
        owner,
        spender: pool.map(|p| p.address),
        allowance: allowance.map(|a| a.to_string()),
        required: required.to_string(),
        status: approval_status(pool, allowance, required),
    }))
}

/// GET /balances/:owner - Balances of every configured token
async fn get_balances(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> ApiResult<BalancesResponse> {
    let owner = parse_address(&owner).map_err(state_error)?;
    let tracker = &state.pipeline().caches.balances;

    let mut balances = Vec::new();
    for token in state.registry().tokens() {
        let balance = tracker
            .balance_of(state.client(), token.address, owner)
            .await
            .map_err(client_error)?;
        balances.push(BalanceDto {
            token: token.into(),
            balance: balance.to_string(),
            formatted: format_amount(balance, token.decimals),
        });
    }

    Ok(Json(BalancesResponse { owner, balances }))
}

/// POST /approve - Approve exactly `amount` of token_in for the pool
async fn approve(
    State(state): State<AppState>,
    Json(request): Json<ApproveRequest>,
) -> ApiResult<TxSubmittedResponse> {
    let (token_in, token_out) = pair_tokens(&state, &request.token_in, &request.token_out)?;
    let resolution = state
        .registry()
        .resolve(&token_in, &token_out)
        .map_err(dex_error)?;
    if !resolution.is_found() {
        return Err(dex_error(no_route(&token_in, &token_out)));
    }
    let owner = require_account(&state, request.from.as_deref()).await?;
    let value = amount(&request.amount)?;

    let intent = approve_intent(&token_in, resolution.pool(), value).map_err(dex_error)?;
    let handle = state.pipeline().executor.submit(intent, owner).await;
    Ok(Json((&handle).into()))
}

/// POST /swap - Quote, check allowance, and submit a protected swap
async fn swap(
    State(state): State<AppState>,
    Json(request): Json<SwapRequest>,
) -> ApiResult<TxSubmittedResponse> {
    let slippage = slippage_or_default(&state, request.slippage_bps).await?;
    let account = state
        .account(request.from.as_deref())
        .await
        .map_err(state_error)?;

    let mut session = state.session();
    session
        .select_symbols(&request.token_in, &request.token_out)
        .map_err(dex_error)?;
    if let Some(account) = account {
        session.connect(account);
    }
    session.set_amount(amount(&request.amount_in)?);

    // Only worth waiting for a quote the guards could accept
    if session.pool().is_some() && session.owner().is_some() {
        let timeout = state.request_timeout().await;
        if tokio::time::timeout(timeout, session.settled_quote())
            .await
            .is_err()
        {
            tracing::debug!("Quote did not settle within {:?}", timeout);
        }
    }

    let handle = session.swap(slippage).await.map_err(dex_error)?;
    Ok(Json((&handle).into()))
}
