use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use konsul_core::ChatMessage;

use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/chat/history/{a}/{b}", get(get_history))
}

/// Every message exchanged between `a` and `b`, oldest first.
pub async fn get_history(
    Authenticated(_user): Authenticated,
    State(state): State<Arc<AppState>>,
    Path((a, b)): Path<(String, String)>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let messages = state.chat_lists.history_between(&a, &b).await?;
    Ok(Json(messages))
}
