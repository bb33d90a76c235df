//! Core types: identities, roles, chat messages, the inbound envelope, and the Handler/Middleware traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{KonsulError, Result};

/// Role carried in an auth token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Dokter,
    Masyarakat,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Dokter => "dokter",
            Role::Masyarakat => "masyarakat",
        }
    }
}

impl FromStr for Role {
    type Err = KonsulError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "admin" => Ok(Role::Admin),
            "dokter" => Ok(Role::Dokter),
            "masyarakat" => Ok(Role::Masyarakat),
            other => Err(KonsulError::Validation(format!("unknown role '{}'", other))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated caller as returned by the auth gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub role: Role,
}

impl AuthUser {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    /// Chat role of this user; admins do not take part in consultations.
    pub fn chat_role(&self) -> Option<ChatRole> {
        match self.role {
            Role::Dokter => Some(ChatRole::Doctor),
            Role::Masyarakat => Some(ChatRole::Citizen),
            Role::Admin => None,
        }
    }

    /// Fails with `Forbidden` unless the user's role is one of `allowed`.
    pub fn require_role(&self, allowed: &[Role]) -> Result<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(KonsulError::Forbidden(format!(
                "role {} is not allowed here",
                self.role
            )))
        }
    }
}

/// Side of a consultation a chat participant is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChatRole {
    #[serde(rename = "doctor", alias = "dokter", alias = "Doctor", alias = "Dokter")]
    Doctor,
    #[serde(
        rename = "citizen",
        alias = "masyarakat",
        alias = "Citizen",
        alias = "Masyarakat"
    )]
    Citizen,
}

impl ChatRole {
    /// Tag stored on chat messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::Doctor => "doctor",
            ChatRole::Citizen => "citizen",
        }
    }

    /// Tag stored on chat-list participants.
    pub fn participant_label(&self) -> &'static str {
        match self {
            ChatRole::Doctor => "Doctor",
            ChatRole::Citizen => "Citizen",
        }
    }

    pub fn counterpart(&self) -> ChatRole {
        match self {
            ChatRole::Doctor => ChatRole::Citizen,
            ChatRole::Citizen => ChatRole::Doctor,
        }
    }
}

impl FromStr for ChatRole {
    type Err = KonsulError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "doctor" | "Doctor" | "dokter" | "Dokter" => Ok(ChatRole::Doctor),
            "citizen" | "Citizen" | "masyarakat" | "Masyarakat" => Ok(ChatRole::Citizen),
            other => Err(KonsulError::Validation(format!(
                "unknown chat role '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Image,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
        }
    }
}

impl FromStr for MessageType {
    type Err = KonsulError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(MessageType::Text),
            "image" => Ok(MessageType::Image),
            other => Err(KonsulError::Validation(format!(
                "unknown message type '{}'",
                other
            ))),
        }
    }
}

/// A persisted (or about to be persisted) chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub role: ChatRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Plain text message with a fresh id, stamped at `created_at`.
    pub fn text(
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        role: ChatRole,
        text: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            text: Some(text.into()),
            media_url: None,
            message_type: MessageType::Text,
            role,
            appointment_id: None,
            created_at,
        }
    }

    pub fn with_appointment(mut self, appointment_id: impl Into<String>) -> Self {
        self.appointment_id = Some(appointment_id.into());
        self
    }

    /// Text shown in inbox previews: the text, or a placeholder for media-only messages.
    pub fn preview(&self) -> String {
        match (&self.text, self.message_type) {
            (Some(t), _) if !t.trim().is_empty() => t.clone(),
            (_, MessageType::Image) => "[image]".to_string(),
            _ => String::new(),
        }
    }

    /// Checks the shape invariants every stored message must satisfy.
    pub fn validate(&self) -> Result<()> {
        if self.sender_id.trim().is_empty() {
            return Err(KonsulError::Validation("senderId is required".into()));
        }
        if self.receiver_id.trim().is_empty() {
            return Err(KonsulError::Validation("receiverId is required".into()));
        }
        if self.sender_id == self.receiver_id {
            return Err(KonsulError::Validation(
                "senderId and receiverId must differ".into(),
            ));
        }
        let has_text = self.text.as_deref().is_some_and(|t| !t.trim().is_empty());
        let has_media = self
            .media_url
            .as_deref()
            .is_some_and(|m| !m.trim().is_empty());
        match self.message_type {
            MessageType::Text if !has_text => {
                Err(KonsulError::Validation("text message without text".into()))
            }
            MessageType::Image if !has_media => Err(KonsulError::Validation(
                "image message without mediaUrl".into(),
            )),
            _ => Ok(()),
        }
    }
}

/// Client-submitted message; id, timestamp, sender and role are filled in when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingChatMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub sender_id: Option<String>,
    pub receiver_id: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(rename = "type", default)]
    pub message_type: MessageType,
    #[serde(default)]
    pub role: Option<ChatRole>,
    #[serde(default)]
    pub appointment_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl IncomingChatMessage {
    /// Completes the payload for `sender` and validates it.
    pub fn into_message(self, sender: &AuthUser, now: DateTime<Utc>) -> Result<ChatMessage> {
        let role = match (self.role, sender.chat_role()) {
            (Some(role), _) => role,
            (None, Some(role)) => role,
            (None, None) => {
                return Err(KonsulError::Validation(
                    "role is required for this account".into(),
                ))
            }
        };
        let message = ChatMessage {
            id: self
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            sender_id: self.sender_id.unwrap_or_else(|| sender.id.clone()),
            receiver_id: self.receiver_id,
            text: self.text,
            media_url: self.media_url,
            message_type: self.message_type,
            role,
            appointment_id: self.appointment_id.filter(|a| !a.trim().is_empty()),
            created_at: self.created_at.unwrap_or(now),
        };
        message.validate()?;
        Ok(message)
    }
}

/// Where an inbound message came from.
#[derive(Debug, Clone, PartialEq)]
pub enum Origin {
    /// A live client connection authenticated as `user`.
    Connection { connection_id: u64, user: AuthUser },
    /// Generated by the server itself (e.g. the auto-message scheduler).
    System,
}

/// How a persisted message is pushed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Every connected client, sender included.
    Broadcast,
    /// Only the connections of the sender and the receiver.
    Participants,
}

/// Unit of work flowing through the handler chain.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub message: ChatMessage,
    pub origin: Origin,
    pub delivery: DeliveryMode,
}

impl Inbound {
    pub fn from_connection(message: ChatMessage, connection_id: u64, user: AuthUser) -> Self {
        Self {
            message,
            origin: Origin::Connection {
                connection_id,
                user,
            },
            delivery: DeliveryMode::Broadcast,
        }
    }

    pub fn system(message: ChatMessage) -> Self {
        Self {
            message,
            origin: Origin::System,
            delivery: DeliveryMode::Participants,
        }
    }

    pub fn connection_id(&self) -> Option<u64> {
        match &self.origin {
            Origin::Connection { connection_id, .. } => Some(*connection_id),
            Origin::System => None,
        }
    }
}

/// Handler result for the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerResponse {
    /// Pass to next handler.
    Continue,
    /// Stop the chain.
    Stop,
    /// Skip this handler, try next.
    Ignore,
    /// Stop the chain; the message reached `n` connections.
    Delivered(usize),
}

/// Handler with optional before / handle / after. Chain runs all before, then handle until
/// Stop/Delivered, then all after in reverse.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn before(&self, _inbound: &Inbound) -> Result<bool> {
        Ok(true)
    }
    async fn handle(&self, _inbound: &Inbound) -> Result<HandlerResponse> {
        Ok(HandlerResponse::Continue)
    }
    async fn after(&self, _inbound: &Inbound, _response: &HandlerResponse) -> Result<()> {
        Ok(())
    }
}

/// Middleware wraps every handler: `before` may veto the message, `after` sees the final response.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn before(&self, inbound: &Inbound) -> Result<bool>;
    async fn after(&self, inbound: &Inbound, response: &HandlerResponse) -> Result<()>;
}
