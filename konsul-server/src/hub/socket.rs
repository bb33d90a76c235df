//! WebSocket upgrade and per-connection loop.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use konsul_core::AuthUser;
use tracing::{debug, error, warn};

use crate::auth::Authenticated;
use crate::state::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Authenticated(user): Authenticated,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| serve_connection(socket, user, state))
        .into_response()
}

async fn serve_connection(socket: WebSocket, user: AuthUser, state: Arc<AppState>) {
    let hub = &state.hub;
    let (connection_id, mut outbound) = match hub.connect(user.clone()).await {
        Ok(pair) => pair,
        Err(e) => {
            error!(user_id = %user.id, error = %e, "Could not open chat connection");
            return;
        }
    };

    let (mut sender, mut receiver) = socket.split();

    let mut writer = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    error!(error = %e, "Could not encode event");
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    hub.handle_frame(connection_id, &user, text.as_str()).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(connection_id, error = %e, "WebSocket read failed");
                    break;
                }
            },
            _ = &mut writer => {
                debug!(connection_id, "writer finished");
                break;
            }
        }
    }

    hub.disconnect(connection_id).await;
    writer.abort();
}
