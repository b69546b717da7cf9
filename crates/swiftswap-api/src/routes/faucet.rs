//! Test-token faucet route

use axum::{extract::State, routing::post, Json, Router};
use swap::faucet_intent;

use super::{dex_error, require_account, state_error, ApiResult};
use crate::dto::{FaucetRequest, TxSubmittedResponse};
use crate::state::parse_address;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/faucet", post(mint))
}

/// POST /faucet - Mint test tokens, to the connected account unless `to` is set
async fn mint(
    State(state): State<AppState>,
    Json(request): Json<FaucetRequest>,
) -> ApiResult<TxSubmittedResponse> {
    let token = state
        .registry()
        .require_token(&request.token)
        .map_err(dex_error)?
        .clone();
    let owner = require_account(&state, request.from.as_deref()).await?;
    let to = match request.to.as_deref() {
        Some(to) => parse_address(to).map_err(state_error)?,
        None => owner,
    };
    let amount = request.amount.as_deref().map(super::amount).transpose()?;

    let intent = faucet_intent(&token, to, amount).map_err(dex_error)?;
    tracing::debug!("Faucet mint of {} to {}", token.symbol, to);
    let handle = state.pipeline().executor.submit(intent, owner).await;
    Ok(Json((&handle).into()))
}
