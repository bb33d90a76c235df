//! Appointment repository.
//!
//! Booking and status CRUD belong to the account layer; this repository covers what the chat
//! core needs: status transitions, the pending-greeting sweep, and the one-shot auto-message flag.

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use crate::error::{StorageError, StorageResult};
use crate::models::{AppointmentRecord, AppointmentStatus, PendingGreeting};
use crate::repository::Repository;
use crate::sqlite_pool::SqlitePoolManager;

const COLUMNS: &str = "id, verification_id, doctor_id, citizen_id, consult_date, consult_time, \
                       complaint, session_count, status, auto_message_sent, created_at, updated_at";

const PENDING_SELECT: &str = r#"
    SELECT a.id AS id, a.doctor_id AS doctor_id, a.citizen_id AS citizen_id,
           d.id AS doctor_ref, c.id AS citizen_ref,
           a.consult_date AS consult_date, a.consult_time AS consult_time
    FROM appointments a
    LEFT JOIN doctors d ON d.id = a.doctor_id
    LEFT JOIN citizens c ON c.id = a.citizen_id
    WHERE a.status = 'accepted' AND a.auto_message_sent = 0
"#;

#[derive(Clone)]
pub struct AppointmentRepository {
    pool_manager: SqlitePoolManager,
}

impl AppointmentRepository {
    pub fn new(pool_manager: SqlitePoolManager) -> Self {
        Self { pool_manager }
    }

    pub async fn insert(&self, record: &AppointmentRecord) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO appointments (id, verification_id, doctor_id, citizen_id, consult_date, consult_time,
                                      complaint, session_count, status, auto_message_sent, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.verification_id)
        .bind(&record.doctor_id)
        .bind(&record.citizen_id)
        .bind(record.consult_date)
        .bind(&record.consult_time)
        .bind(&record.complaint)
        .bind(record.session_count)
        .bind(&record.status)
        .bind(record.auto_message_sent)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(self.pool_manager.pool())
        .await?;

        info!(appointment_id = %record.id, status = %record.status, "Saved appointment");
        Ok(())
    }

    pub async fn get(&self, id: &str) -> StorageResult<Option<AppointmentRecord>> {
        let sql = format!("SELECT {} FROM appointments WHERE id = ?", COLUMNS);
        let record = sqlx::query_as::<_, AppointmentRecord>(&sql)
            .bind(id)
            .fetch_optional(self.pool_manager.pool())
            .await?;
        Ok(record)
    }

    /// Sets the status and returns the updated row; `NotFound` when the id is unknown.
    pub async fn update_status(
        &self,
        id: &str,
        status: AppointmentStatus,
    ) -> StorageResult<AppointmentRecord> {
        let result = sqlx::query("UPDATE appointments SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool_manager.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("appointment {}", id)));
        }
        info!(appointment_id = %id, status = %status, "Updated appointment status");
        self.get(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("appointment {}", id)))
    }

    /// Accepted appointments whose greeting has not been sent yet.
    pub async fn pending_greetings(&self) -> StorageResult<Vec<PendingGreeting>> {
        let sql = format!("{} ORDER BY a.consult_date ASC, a.consult_time ASC", PENDING_SELECT);
        let rows = sqlx::query_as::<_, PendingGreeting>(&sql)
            .fetch_all(self.pool_manager.pool())
            .await?;
        Ok(rows)
    }

    /// Same as [`pending_greetings`](Self::pending_greetings) for a single appointment.
    pub async fn pending_greeting(&self, id: &str) -> StorageResult<Option<PendingGreeting>> {
        let sql = format!("{} AND a.id = ?", PENDING_SELECT);
        let row = sqlx::query_as::<_, PendingGreeting>(&sql)
            .bind(id)
            .fetch_optional(self.pool_manager.pool())
            .await?;
        Ok(row)
    }

    /// Flips the auto-message flag from unset to set. Returns false when it was already set
    /// (or the appointment is gone), so the transition happens at most once.
    pub async fn mark_auto_message_sent(&self, id: &str) -> StorageResult<bool> {
        let result = sqlx::query(
            "UPDATE appointments SET auto_message_sent = 1, updated_at = ? WHERE id = ? AND auto_message_sent = 0",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool_manager.pool())
        .await?;
        let flipped = result.rows_affected() == 1;
        if !flipped {
            warn!(appointment_id = %id, "Auto-message flag was already set");
        }
        Ok(flipped)
    }

    pub async fn is_auto_message_sent(&self, id: &str) -> StorageResult<bool> {
        let row: Option<(bool,)> =
            sqlx::query_as("SELECT auto_message_sent FROM appointments WHERE id = ?")
                .bind(id)
                .fetch_optional(self.pool_manager.pool())
                .await?;
        row.map(|r| r.0)
            .ok_or_else(|| StorageError::NotFound(format!("appointment {}", id)))
    }
}

#[async_trait]
impl Repository<AppointmentRecord> for AppointmentRepository {
    async fn save(&self, entity: &AppointmentRecord) -> Result<(), StorageError> {
        self.insert(entity).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<AppointmentRecord>, StorageError> {
        self.get(id).await
    }

    async fn find_all(&self) -> Result<Vec<AppointmentRecord>, StorageError> {
        let sql = format!("SELECT {} FROM appointments ORDER BY created_at ASC", COLUMNS);
        let rows = sqlx::query_as::<_, AppointmentRecord>(&sql)
            .fetch_all(self.pool_manager.pool())
            .await?;
        Ok(rows)
    }
}
