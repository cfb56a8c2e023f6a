use axum::{extract::State, Json};
use shared::{PresenceList, SuccessResponse, VolunteerPresence};

use crate::{error::AppError, gate::Caller, state::AppState};

/// POST /api/volunteers/heartbeat
///
/// Any signed-in volunteer may report presence, approved or not.
pub async fn heartbeat(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.touch_last_seen(&caller.volunteer_id).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// GET /api/volunteers
pub async fn presence(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<PresenceList>, AppError> {
    state.gate.approved(&caller.volunteer_id).await?;

    let now = chrono::Utc::now();
    let volunteers = state
        .db
        .list_approved_volunteers()
        .await?
        .into_iter()
        .map(|v| VolunteerPresence {
            online: v.is_online_at(now),
            id: v.id,
            name: v.name,
            last_seen: v.last_seen,
        })
        .collect();

    Ok(Json(PresenceList { volunteers }))
}
