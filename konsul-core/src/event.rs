//! Wire events exchanged over a chat connection.
//!
//! Every frame is a JSON object `{"event": "<name>", "data": <payload>}`; the event names are the
//! ones existing clients already listen for (`chat history`, `chat message`).

use serde::{Deserialize, Serialize};

use crate::types::{ChatMessage, IncomingChatMessage};

/// Server → client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "connected")]
    Connected { message: String },
    #[serde(rename = "chat history")]
    ChatHistory(Vec<ChatMessage>),
    #[serde(rename = "chat message")]
    ChatMessage(ChatMessage),
    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Connected { .. } => "connected",
            ServerEvent::ChatHistory(_) => "chat history",
            ServerEvent::ChatMessage(_) => "chat message",
            ServerEvent::Error { .. } => "error",
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }
}

/// Client → server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "chat message")]
    ChatMessage(IncomingChatMessage),
}
