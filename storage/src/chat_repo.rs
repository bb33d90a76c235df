//! Chat message repository: append-only persistence and history queries.
//!
//! Ordering is `created_at` then insertion order (`rowid`), so messages stamped in the same
//! instant keep the order they were stored in.

use crate::error::StorageResult;
use crate::models::ChatMessageRecord;
use crate::sqlite_pool::SqlitePoolManager;
use tracing::{debug, info};

const COLUMNS: &str =
    "id, sender_id, receiver_id, text, media_url, message_type, role, appointment_id, created_at";

#[derive(Clone)]
pub struct ChatRepository {
    pool_manager: SqlitePoolManager,
}

impl ChatRepository {
    pub fn new(pool_manager: SqlitePoolManager) -> Self {
        Self { pool_manager }
    }

    pub async fn save(&self, message: &ChatMessageRecord) -> StorageResult<()> {
        let pool = self.pool_manager.pool();

        sqlx::query(
            r#"
            INSERT INTO chat_messages (id, sender_id, receiver_id, text, media_url, message_type, role, appointment_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&message.id)
        .bind(&message.sender_id)
        .bind(&message.receiver_id)
        .bind(&message.text)
        .bind(&message.media_url)
        .bind(&message.message_type)
        .bind(&message.role)
        .bind(&message.appointment_id)
        .bind(message.created_at)
        .execute(pool)
        .await?;

        info!(
            message_id = %message.id,
            sender_id = %message.sender_id,
            receiver_id = %message.receiver_id,
            "Saved chat message"
        );
        Ok(())
    }

    pub async fn get_by_id(&self, message_id: &str) -> StorageResult<Option<ChatMessageRecord>> {
        let sql = format!("SELECT {} FROM chat_messages WHERE id = ?", COLUMNS);
        let message = sqlx::query_as::<_, ChatMessageRecord>(&sql)
            .bind(message_id)
            .fetch_optional(self.pool_manager.pool())
            .await?;
        Ok(message)
    }

    /// The `limit` most recent messages, returned oldest first.
    pub async fn recent(&self, limit: i64) -> StorageResult<Vec<ChatMessageRecord>> {
        let sql = format!(
            r#"
            SELECT {cols} FROM (
                SELECT rowid AS seq, {cols} FROM chat_messages
                ORDER BY created_at DESC, seq DESC
                LIMIT ?
            )
            ORDER BY created_at ASC, seq ASC
            "#,
            cols = COLUMNS
        );
        let messages = sqlx::query_as::<_, ChatMessageRecord>(&sql)
            .bind(limit)
            .fetch_all(self.pool_manager.pool())
            .await?;

        debug!(count = messages.len(), limit = limit, "Retrieved recent messages");
        Ok(messages)
    }

    /// Full conversation between two users in either direction, oldest first.
    pub async fn between(&self, a: &str, b: &str) -> StorageResult<Vec<ChatMessageRecord>> {
        let sql = format!(
            r#"
            SELECT {} FROM chat_messages
            WHERE (sender_id = ? AND receiver_id = ?) OR (sender_id = ? AND receiver_id = ?)
            ORDER BY created_at ASC, rowid ASC
            "#,
            COLUMNS
        );
        let messages = sqlx::query_as::<_, ChatMessageRecord>(&sql)
            .bind(a)
            .bind(b)
            .bind(b)
            .bind(a)
            .fetch_all(self.pool_manager.pool())
            .await?;

        info!(a = %a, b = %b, count = messages.len(), "Retrieved chat history");
        Ok(messages)
    }

    pub async fn count(&self) -> StorageResult<i64> {
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chat_messages")
            .fetch_one(self.pool_manager.pool())
            .await?;
        Ok(total.0)
    }

    pub async fn count_for_appointment(&self, appointment_id: &str) -> StorageResult<i64> {
        let total: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM chat_messages WHERE appointment_id = ?")
                .bind(appointment_id)
                .fetch_one(self.pool_manager.pool())
                .await?;
        Ok(total.0)
    }
}
