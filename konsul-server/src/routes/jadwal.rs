//! Appointment (jadwal) status changes that feed the auto-message scheduler and the chat list.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{patch, post};
use axum::{Json, Router};
use konsul_core::{AuthUser, Role};
use serde::Deserialize;
use storage::{AppointmentRecord, AppointmentStatus};
use tracing::{info, warn};

use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/jadwal/{id}/accept", post(accept))
        .route("/jadwal/{id}/status", patch(update_status))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

/// The doctor of the appointment accepts it.
pub async fn accept(
    Authenticated(user): Authenticated,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<AppointmentRecord>, ApiError> {
    user.require_role(&[Role::Dokter])?;
    let current = load_owned(&state, &id, &user).await?;
    match current.status()? {
        AppointmentStatus::Waiting | AppointmentStatus::Accepted => {}
        other => {
            return Err(ApiError::Conflict(format!(
                "appointment {} is {} and cannot be accepted",
                id, other
            )))
        }
    }
    let updated = apply_status(&state, &id, AppointmentStatus::Accepted).await?;
    Ok(Json(updated))
}

pub async fn update_status(
    Authenticated(user): Authenticated,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<StatusUpdate>,
) -> Result<Json<AppointmentRecord>, ApiError> {
    user.require_role(&[Role::Dokter, Role::Admin])?;
    let status: AppointmentStatus = body.status.trim().parse()?;
    if user.role == Role::Dokter {
        load_owned(&state, &id, &user).await?;
    }
    let updated = apply_status(&state, &id, status).await?;
    Ok(Json(updated))
}

async fn load_owned(
    state: &AppState,
    id: &str,
    user: &AuthUser,
) -> Result<AppointmentRecord, ApiError> {
    let record = state
        .store
        .appointments
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("appointment {}", id)))?;
    if record.doctor_id != user.id {
        return Err(ApiError::Forbidden(format!(
            "appointment {} belongs to another doctor",
            id
        )));
    }
    Ok(record)
}

async fn apply_status(
    state: &AppState,
    id: &str,
    status: AppointmentStatus,
) -> Result<AppointmentRecord, ApiError> {
    let updated = state.store.appointments.update_status(id, status).await?;
    info!(appointment_id = %id, status = %status, "step: appointment status changed");
    match status {
        AppointmentStatus::Accepted => state.accepted.notify(id),
        AppointmentStatus::Done => {
            if let Err(e) = state.chat_lists.close_for_appointment(id).await {
                warn!(appointment_id = %id, error = %e, "Could not close conversation");
            }
        }
        _ => {}
    }
    Ok(updated)
}
