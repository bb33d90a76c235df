//! Chat-list repository: conversation summaries and per-participant unread counters.
//!
//! Counter changes are single-statement upserts on `chat_list_unread`, so concurrent increments
//! for the same participant never lose an update.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::StorageResult;
use crate::models::{ChatListRecord, ChatListStatus};
use crate::sqlite_pool::SqlitePoolManager;

const COLUMNS: &str = "id, participant_a, role_a, participant_b, role_b, last_message, \
                       last_message_date, appointment_id, status, created_at, updated_at";

#[derive(Clone)]
pub struct ChatListRepository {
    pool_manager: SqlitePoolManager,
}

impl ChatListRepository {
    pub fn new(pool_manager: SqlitePoolManager) -> Self {
        Self { pool_manager }
    }

    /// Conversation for the unordered pair `{a, b}`.
    pub async fn find_by_pair(&self, a: &str, b: &str) -> StorageResult<Option<ChatListRecord>> {
        let sql = format!(
            r#"
            SELECT {} FROM chat_lists
            WHERE (participant_a = ? AND participant_b = ?)
               OR (participant_a = ? AND participant_b = ?)
            ORDER BY created_at ASC
            LIMIT 1
            "#,
            COLUMNS
        );
        let record = sqlx::query_as::<_, ChatListRecord>(&sql)
            .bind(a)
            .bind(b)
            .bind(b)
            .bind(a)
            .fetch_optional(self.pool_manager.pool())
            .await?;
        Ok(record)
    }

    pub async fn find_by_appointment(
        &self,
        appointment_id: &str,
    ) -> StorageResult<Option<ChatListRecord>> {
        let sql = format!("SELECT {} FROM chat_lists WHERE appointment_id = ?", COLUMNS);
        let record = sqlx::query_as::<_, ChatListRecord>(&sql)
            .bind(appointment_id)
            .fetch_optional(self.pool_manager.pool())
            .await?;
        Ok(record)
    }

    pub async fn find_by_id(&self, id: &str) -> StorageResult<Option<ChatListRecord>> {
        let sql = format!("SELECT {} FROM chat_lists WHERE id = ?", COLUMNS);
        let record = sqlx::query_as::<_, ChatListRecord>(&sql)
            .bind(id)
            .fetch_optional(self.pool_manager.pool())
            .await?;
        Ok(record)
    }

    /// Inserts the row and its initial counters in one transaction.
    ///
    /// A second conversation for the same appointment fails with `AlreadyExists`.
    pub async fn create(
        &self,
        record: &ChatListRecord,
        unread: &[(&str, i64)],
    ) -> StorageResult<()> {
        let mut tx = self.pool_manager.pool().begin().await?;

        sqlx::query(
            r#"
            INSERT INTO chat_lists (id, participant_a, role_a, participant_b, role_b, last_message,
                                    last_message_date, appointment_id, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.participant_a)
        .bind(&record.role_a)
        .bind(&record.participant_b)
        .bind(&record.role_b)
        .bind(&record.last_message)
        .bind(record.last_message_date)
        .bind(&record.appointment_id)
        .bind(&record.status)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&mut *tx)
        .await?;

        for (user_id, count) in unread {
            sqlx::query(
                "INSERT INTO chat_list_unread (chat_list_id, user_id, unread) VALUES (?, ?, ?)",
            )
            .bind(&record.id)
            .bind(*user_id)
            .bind(*count)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!(
            chat_list_id = %record.id,
            appointment_id = ?record.appointment_id,
            "Created chat list"
        );
        Ok(())
    }

    /// Overwrites the last-message fields and bumps `receiver_id`'s counter (missing counts as 0).
    ///
    /// With `reassign` set, the row moves to that appointment and reopens as `ongoing`.
    pub async fn record_activity(
        &self,
        id: &str,
        last_message: &str,
        last_message_date: DateTime<Utc>,
        receiver_id: &str,
        reassign: Option<&str>,
    ) -> StorageResult<()> {
        let mut tx = self.pool_manager.pool().begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE chat_lists
            SET last_message = ?, last_message_date = ?, updated_at = ?,
                appointment_id = COALESCE(?, appointment_id),
                status = CASE WHEN ? IS NULL THEN status ELSE ? END
            WHERE id = ?
            "#,
        )
        .bind(last_message)
        .bind(last_message_date)
        .bind(Utc::now())
        .bind(reassign)
        .bind(reassign)
        .bind(ChatListStatus::Ongoing.as_str())
        .bind(id)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(crate::StorageError::NotFound(format!("chat list {}", id)));
        }

        sqlx::query(
            r#"
            INSERT INTO chat_list_unread (chat_list_id, user_id, unread) VALUES (?, ?, 1)
            ON CONFLICT(chat_list_id, user_id) DO UPDATE SET unread = unread + 1
            "#,
        )
        .bind(id)
        .bind(receiver_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(chat_list_id = %id, receiver_id = %receiver_id, "Recorded chat list activity");
        Ok(())
    }

    /// Sets `user_id`'s counter to 0.
    pub async fn reset_unread(&self, id: &str, user_id: &str) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO chat_list_unread (chat_list_id, user_id, unread) VALUES (?, ?, 0)
            ON CONFLICT(chat_list_id, user_id) DO UPDATE SET unread = 0
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(self.pool_manager.pool())
        .await?;
        Ok(())
    }

    pub async fn unread_counts(&self, id: &str) -> StorageResult<HashMap<String, i64>> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT user_id, unread FROM chat_list_unread WHERE chat_list_id = ?")
                .bind(id)
                .fetch_all(self.pool_manager.pool())
                .await?;
        Ok(rows.into_iter().collect())
    }

    pub async fn unread_for(&self, id: &str, user_id: &str) -> StorageResult<i64> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT unread FROM chat_list_unread WHERE chat_list_id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool_manager.pool())
        .await?;
        Ok(row.map(|r| r.0).unwrap_or(0))
    }

    /// Every conversation `user_id` takes part in, most recent activity first.
    pub async fn list_for_user(&self, user_id: &str) -> StorageResult<Vec<ChatListRecord>> {
        let sql = format!(
            r#"
            SELECT {} FROM chat_lists
            WHERE participant_a = ? OR participant_b = ?
            ORDER BY last_message_date DESC
            "#,
            COLUMNS
        );
        let records = sqlx::query_as::<_, ChatListRecord>(&sql)
            .bind(user_id)
            .bind(user_id)
            .fetch_all(self.pool_manager.pool())
            .await?;
        Ok(records)
    }

    /// Returns how many rows changed (0 or 1).
    pub async fn set_status_for_appointment(
        &self,
        appointment_id: &str,
        status: ChatListStatus,
    ) -> StorageResult<u64> {
        let result = sqlx::query(
            "UPDATE chat_lists SET status = ?, updated_at = ? WHERE appointment_id = ?",
        )
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(appointment_id)
        .execute(self.pool_manager.pool())
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn count(&self) -> StorageResult<i64> {
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chat_lists")
            .fetch_one(self.pool_manager.pool())
            .await?;
        Ok(total.0)
    }
}
