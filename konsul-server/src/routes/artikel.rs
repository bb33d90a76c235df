use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use storage::ArticleRecord;

use crate::articles::NewArticle;
use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/artikel", post(create_article))
}

pub async fn create_article(
    Authenticated(user): Authenticated,
    State(state): State<Arc<AppState>>,
    Json(article): Json<NewArticle>,
) -> Result<(StatusCode, Json<ArticleRecord>), ApiError> {
    let record = state.articles.create(article, &user).await?;
    Ok((StatusCode::CREATED, Json(record)))
}
