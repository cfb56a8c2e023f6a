use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use shared::{SendFailedResponse, SendMessageRequest, SendMessageResponse};

use crate::{error::AppError, gate::Caller, pipeline::SendOutcome, state::AppState};

/// Send a volunteer reply
/// POST /api/send
///
/// A reply whose delivery ran out of retries is still stored; that case
/// answers 202 with `{error, message}` instead of an error status.
pub async fn send_message(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<SendMessageRequest>,
) -> Result<Response, AppError> {
    let response = match state.outbound.send(&caller.volunteer_id, req).await? {
        SendOutcome::Delivered { message, delivery_id } => Json(SendMessageResponse {
            success: true,
            message,
            delivery_id,
        })
        .into_response(),
        SendOutcome::Failed { message, error } => {
            (StatusCode::ACCEPTED, Json(SendFailedResponse { error, message })).into_response()
        }
    };
    Ok(response)
}
