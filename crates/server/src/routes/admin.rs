//! Admin-only volunteer management

use axum::{extract::State, Json};
use shared::{PendingVolunteers, SuccessResponse, VolunteerActionRequest};

use crate::{error::AppError, gate::Caller, state::AppState};

fn target(req: VolunteerActionRequest) -> Result<String, AppError> {
    req.volunteer_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("Missing volunteerId".to_string()))
}

/// POST /api/admin/approve
pub async fn approve(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<VolunteerActionRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let target_id = target(req)?;
    state.approval.approve(&caller.volunteer_id, &target_id).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// POST /api/admin/reject
pub async fn reject(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<VolunteerActionRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let target_id = target(req)?;
    state.approval.reject(&caller.volunteer_id, &target_id).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// GET /api/admin/pending
pub async fn pending(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<PendingVolunteers>, AppError> {
    state.gate.admin(&caller.volunteer_id).await?;
    let volunteers = state.db.list_pending_volunteers().await?;
    Ok(Json(PendingVolunteers { volunteers }))
}
