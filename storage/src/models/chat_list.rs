//! Conversation summary row (`chat_lists`). Unread counters live in `chat_list_unread`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatListStatus {
    Ongoing,
    Done,
}

impl ChatListStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatListStatus::Ongoing => "ongoing",
            ChatListStatus::Done => "done",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatListRecord {
    pub id: String,
    pub participant_a: String,
    pub role_a: String,
    pub participant_b: String,
    pub role_b: String,
    pub last_message: String,
    pub last_message_date: DateTime<Utc>,
    pub appointment_id: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatListRecord {
    /// New ongoing conversation between `(a, role_a)` and `(b, role_b)`.
    pub fn new(
        (participant_a, role_a): (String, String),
        (participant_b, role_b): (String, String),
        last_message: String,
        last_message_date: DateTime<Utc>,
        appointment_id: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            participant_a,
            role_a,
            participant_b,
            role_b,
            last_message,
            last_message_date,
            appointment_id,
            status: ChatListStatus::Ongoing.as_str().to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participant_a == user_id || self.participant_b == user_id
    }

    /// The other participant's `(id, role)`, or None when `user_id` is not in this conversation.
    pub fn other_participant(&self, user_id: &str) -> Option<(&str, &str)> {
        if self.participant_a == user_id {
            Some((self.participant_b.as_str(), self.role_b.as_str()))
        } else if self.participant_b == user_id {
            Some((self.participant_a.as_str(), self.role_a.as_str()))
        } else {
            None
        }
    }
}
