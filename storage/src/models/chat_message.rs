//! Chat message record for persistence.
//!
//! Maps to the `chat_messages` table and is used by ChatRepository.

use chrono::{DateTime, Utc};
use konsul_core::{ChatMessage, KonsulError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatMessageRecord {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub text: Option<String>,
    pub media_url: Option<String>,
    pub message_type: String,
    pub role: String,
    pub appointment_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&ChatMessage> for ChatMessageRecord {
    fn from(message: &ChatMessage) -> Self {
        Self {
            id: message.id.clone(),
            sender_id: message.sender_id.clone(),
            receiver_id: message.receiver_id.clone(),
            text: message.text.clone(),
            media_url: message.media_url.clone(),
            message_type: message.message_type.as_str().to_string(),
            role: message.role.as_str().to_string(),
            appointment_id: message.appointment_id.clone(),
            created_at: message.created_at,
        }
    }
}

impl TryFrom<ChatMessageRecord> for ChatMessage {
    type Error = KonsulError;

    fn try_from(record: ChatMessageRecord) -> Result<Self, Self::Error> {
        Ok(ChatMessage {
            message_type: record.message_type.parse()?,
            role: record.role.parse()?,
            id: record.id,
            sender_id: record.sender_id,
            receiver_id: record.receiver_id,
            text: record.text,
            media_url: record.media_url,
            appointment_id: record.appointment_id,
            created_at: record.created_at,
        })
    }
}
