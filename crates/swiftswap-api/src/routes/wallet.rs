//! Wallet connection endpoints

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use super::{state_error, ApiResult};
use crate::dto::{WalletRequest, WalletResponse};
use crate::AppState;

/// Create wallet routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_wallet))
        .route("/connect", post(connect))
        .route("/disconnect", post(disconnect))
}

/// GET /wallet - Current account
async fn get_wallet(State(state): State<AppState>) -> Json<WalletResponse> {
    let wallet = state.wallet().await;
    Json(WalletResponse {
        connected: wallet.is_some(),
        address: wallet.map(|w| w.address),
    })
}

/// POST /wallet/connect - Use an account for approvals and swaps
async fn connect(
    State(state): State<AppState>,
    Json(request): Json<WalletRequest>,
) -> ApiResult<WalletResponse> {
    let address = state
        .set_wallet(&request.address)
        .await
        .map_err(state_error)?;
    Ok(Json(WalletResponse {
        connected: true,
        address: Some(address),
    }))
}

/// POST /wallet/disconnect
async fn disconnect(State(state): State<AppState>) -> Json<WalletResponse> {
    state.disconnect_wallet().await;
    Json(WalletResponse {
        connected: false,
        address: None,
    })
}
