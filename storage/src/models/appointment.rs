//! Appointment (jadwal) row and the joined view the auto-message scheduler reads.

use chrono::{DateTime, NaiveDate, Utc};
use konsul_core::KonsulError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Waiting,
    Rejected,
    Accepted,
    Ongoing,
    Done,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Waiting => "waiting",
            AppointmentStatus::Rejected => "rejected",
            AppointmentStatus::Accepted => "accepted",
            AppointmentStatus::Ongoing => "ongoing",
            AppointmentStatus::Done => "done",
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = KonsulError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" | "menunggu" => Ok(AppointmentStatus::Waiting),
            "rejected" | "ditolak" => Ok(AppointmentStatus::Rejected),
            "accepted" | "diterima" => Ok(AppointmentStatus::Accepted),
            "ongoing" | "berlangsung" => Ok(AppointmentStatus::Ongoing),
            "done" | "selesai" => Ok(AppointmentStatus::Done),
            other => Err(KonsulError::Validation(format!(
                "unknown appointment status '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AppointmentRecord {
    pub id: String,
    pub verification_id: Option<String>,
    pub doctor_id: String,
    pub citizen_id: String,
    pub consult_date: NaiveDate,
    /// Time of day, `"HH:MM"`.
    pub consult_time: String,
    pub complaint: String,
    pub session_count: i64,
    pub status: String,
    pub auto_message_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AppointmentRecord {
    /// Creates a waiting appointment with a generated UUID.
    pub fn new(
        doctor_id: impl Into<String>,
        citizen_id: impl Into<String>,
        consult_date: NaiveDate,
        consult_time: impl Into<String>,
        complaint: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            verification_id: None,
            doctor_id: doctor_id.into(),
            citizen_id: citizen_id.into(),
            consult_date,
            consult_time: consult_time.into(),
            complaint: complaint.into(),
            session_count: 1,
            status: AppointmentStatus::Waiting.as_str().to_string(),
            auto_message_sent: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: AppointmentStatus) -> Self {
        self.status = status.as_str().to_string();
        self
    }

    pub fn status(&self) -> Result<AppointmentStatus, KonsulError> {
        self.status.parse()
    }
}

/// Accepted, not yet greeted appointment joined with the directory.
///
/// `doctor_ref` / `citizen_ref` are None when the referenced profile no longer exists.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PendingGreeting {
    pub id: String,
    pub doctor_id: String,
    pub citizen_id: String,
    pub doctor_ref: Option<String>,
    pub citizen_ref: Option<String>,
    pub consult_date: NaiveDate,
    pub consult_time: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_accepts_legacy_names() {
        assert_eq!(
            "diterima".parse::<AppointmentStatus>().unwrap(),
            AppointmentStatus::Accepted
        );
        assert_eq!(
            "done".parse::<AppointmentStatus>().unwrap(),
            AppointmentStatus::Done
        );
        assert!("unknown".parse::<AppointmentStatus>().is_err());
    }
}
