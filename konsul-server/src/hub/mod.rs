//! # Hub
//!
//! Real-time messaging over WebSocket. A new connection receives a `connected` event and the
//! most recent history; every `chat message` frame goes through the handler chain (auth,
//! persistence, chat list, delivery) one at a time, so clients see messages in the order they
//! were stored.

mod delivery_handler;
mod registry;
mod socket;

pub use delivery_handler::DeliveryHandler;
pub use registry::{ConnectionRegistry, DEFAULT_OUTBOUND_CAPACITY};
pub use socket::ws_handler;

use std::sync::Arc;

use chrono::Utc;
use handler_chain::ChainSink;
use konsul_core::{
    AuthUser, ChatMessage, ClientEvent, Delivery, Inbound, IncomingChatMessage, KonsulError,
    MessageSink, Result, ServerEvent,
};
use storage::ChatRepository;
use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};

const DELIVERY_FAILED: &str = "message could not be delivered";
const MESSAGE_EXISTS: &str = "message already exists";

pub struct Hub {
    messages: ChatRepository,
    registry: Arc<ConnectionRegistry>,
    sink: Arc<ChainSink>,
    history_limit: i64,
}

impl Hub {
    pub fn new(
        messages: ChatRepository,
        registry: Arc<ConnectionRegistry>,
        sink: Arc<ChainSink>,
        history_limit: i64,
    ) -> Self {
        Self {
            messages,
            registry,
            sink,
            history_limit,
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn sink(&self) -> Arc<dyn MessageSink> {
        self.sink.clone()
    }

    /// Most recent messages, oldest first.
    pub async fn history(&self) -> Result<Vec<ChatMessage>> {
        self.messages
            .recent(self.history_limit)
            .await?
            .into_iter()
            .map(ChatMessage::try_from)
            .collect()
    }

    /// Registers `user` and queues the greeting and history. Submissions are held off meanwhile,
    /// so a message is either in the history or delivered live, never both or neither.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn connect(&self, user: AuthUser) -> Result<(u64, mpsc::Receiver<ServerEvent>)> {
        let _paused = self.sink.pause().await;
        let history = self.history().await?;
        info!(count = history.len(), "step: history loaded for new connection");
        let greeting = ServerEvent::Connected {
            message: format!("connected as {}", user.id),
        };
        Ok(self
            .registry
            .register(user, vec![greeting, ServerEvent::ChatHistory(history)])
            .await)
    }

    /// Runs one client message through the chain. On failure the submitting connection gets an
    /// `error` event and nobody else hears about it.
    #[instrument(skip(self, user, incoming), fields(user_id = %user.id))]
    pub async fn submit(
        &self,
        connection_id: u64,
        user: &AuthUser,
        incoming: IncomingChatMessage,
    ) -> Result<ChatMessage> {
        let result = match incoming.into_message(user, Utc::now()) {
            Ok(message) => {
                self.sink
                    .submit(Inbound::from_connection(message, connection_id, user.clone()))
                    .await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            let shown = if let KonsulError::Conflict(_) = e {
                warn!(error = %e, "Duplicate message rejected");
                MESSAGE_EXISTS.to_string()
            } else if e.is_client_error() {
                warn!(error = %e, "Message rejected");
                e.to_string()
            } else {
                error!(error = %e, "Message dropped");
                DELIVERY_FAILED.to_string()
            };
            self.report(connection_id, shown).await;
        }
        result
    }

    /// Handles one text frame from `connection_id`.
    pub async fn handle_frame(&self, connection_id: u64, user: &AuthUser, raw: &str) {
        match serde_json::from_str::<ClientEvent>(raw) {
            Ok(ClientEvent::ChatMessage(incoming)) => {
                let _ = self.submit(connection_id, user, incoming).await;
            }
            Err(e) => {
                warn!(connection_id, error = %e, "Unreadable frame");
                self.report(connection_id, format!("unreadable frame: {}", e))
                    .await;
            }
        }
    }

    pub async fn disconnect(&self, connection_id: u64) {
        self.registry.unregister(connection_id).await;
    }

    async fn report(&self, connection_id: u64, message: String) {
        if let Err(e) = self
            .registry
            .send_to_connection(connection_id, &ServerEvent::error(message))
            .await
        {
            warn!(connection_id, error = %e, "Could not report error to client");
        }
    }
}
