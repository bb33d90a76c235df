use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chat_list::ConversationSummary;
use konsul_core::Role;

use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chatlist/{id}", get(list_conversations))
        .route("/chatlist/{id}/read", post(mark_read))
}

/// Inbox of `user_id`, newest activity first. Only the user themselves or an admin.
pub async fn list_conversations(
    Authenticated(user): Authenticated,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<ConversationSummary>>, ApiError> {
    if user.id != user_id && user.role != Role::Admin {
        return Err(ApiError::Forbidden("not your chat list".into()));
    }
    let conversations = state.chat_lists.list_conversations(&user_id).await?;
    Ok(Json(conversations))
}

pub async fn mark_read(
    Authenticated(user): Authenticated,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.chat_lists.mark_read(&id, &user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
