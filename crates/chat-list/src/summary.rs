use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One inbox row as seen by one participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: String,
    pub last_message: String,
    pub last_message_date: DateTime<Utc>,
    /// The viewer's own unread count.
    pub unread_count: i64,
    pub participant: ParticipantSummary,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<String>,
}

/// The other side of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSummary {
    pub id: String,
    pub role: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}
