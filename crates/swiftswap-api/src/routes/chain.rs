//! Chain status endpoint

use axum::{extract::State, routing::get, Json, Router};

use crate::dto::ChainStatusResponse;
use crate::AppState;

/// Create chain routes
pub fn router() -> Router<AppState> {
    Router::new().route("/status", get(get_status))
}

/// GET /chain/status - Check the RPC endpoint
pub async fn get_status(State(state): State<AppState>) -> Json<ChainStatusResponse> {
    let config = state.config().await;
    let status = state.client().status().await;

    if status.is_online && !status.is_expected_network() {
        tracing::warn!(
            "RPC endpoint reports chain {:?}, deployment expects {}",
            status.chain_id,
            status.expected_chain_id
        );
    }

    Json(ChainStatusResponse {
        connected: status.is_online,
        url: config.rpc.url,
        network: config.network.as_str().to_string(),
        chain_id: status.chain_id,
        expected_chain_id: status.expected_chain_id,
        network_matches: status.is_expected_network(),
        block_number: status.block_number,
    })
}
