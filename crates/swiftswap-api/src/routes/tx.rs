//! Transaction tracking routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use super::ApiResult;
use crate::dto::{ApiError, PruneResponse, TxDto, TxListResponse};
use crate::AppState;

/// Create transaction routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tx", get(list_transactions))
        .route("/tx/prune", post(prune_transactions))
        .route("/tx/:id", get(get_transaction))
}

/// GET /tx - Every tracked transaction, oldest first
async fn list_transactions(State(state): State<AppState>) -> ApiResult<TxListResponse> {
    let transactions: Vec<TxDto> = state
        .pipeline()
        .executor
        .tracked()
        .await
        .into_iter()
        .map(Into::into)
        .collect();
    let count = transactions.len();
    Ok(Json(TxListResponse {
        transactions,
        count,
    }))
}

/// GET /tx/:id - Current state of one tracked transaction
async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<TxDto> {
    let id = Uuid::parse_str(&id).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError::bad_request(format!("Invalid transaction id: {}", e))),
        )
    })?;

    state
        .pipeline()
        .executor
        .tracked()
        .await
        .into_iter()
        .find(|info| info.id == id)
        .map(|info| Json(info.into()))
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ApiError::not_found(format!("Transaction not found: {}", id))),
            )
        })
}

/// POST /tx/prune - Forget transactions that reached a final state
async fn prune_transactions(State(state): State<AppState>) -> ApiResult<PruneResponse> {
    let removed = state.pipeline().executor.prune_terminal().await;
    if removed > 0 {
        tracing::debug!("Pruned {} finished transactions", removed);
    }
    Ok(Json(PruneResponse { removed }))
}
