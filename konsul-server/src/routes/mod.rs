//! Axum router construction.
//!
//! [`build`] assembles the application router: health, the WebSocket endpoint and the `/api`
//! routes, wrapped in request tracing and permissive CORS.

mod artikel;
mod chat;
mod chatlist;
mod health;
mod jadwal;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::hub::ws_handler;
use crate::state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .merge(chat::router())
        .merge(chatlist::router())
        .merge(jadwal::router())
        .merge(artikel::router());

    Router::new()
        .merge(health::router())
        .route("/ws", get(ws_handler))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
