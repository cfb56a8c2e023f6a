//! Conversation browsing and housekeeping for approved volunteers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use shared::{
    Conversation, ConversationList, ListConversationsQuery, MessageList, SuccessResponse,
    UpdateConversationRequest,
};

use crate::{error::AppError, gate::Caller, pipeline::delete_failed_message, state::AppState};

async fn find(state: &AppState, id: &str) -> Result<Conversation, AppError> {
    state
        .db
        .get_conversation(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Conversation not found".to_string()))
}

/// GET /api/conversations?archived=<bool>
pub async fn list(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<ListConversationsQuery>,
) -> Result<Json<ConversationList>, AppError> {
    state.gate.approved(&caller.volunteer_id).await?;
    let conversations = state.db.list_conversations(query.archived).await?;
    Ok(Json(ConversationList { conversations }))
}

/// GET /api/conversations/:id
pub async fn get(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Conversation>, AppError> {
    state.gate.approved(&caller.volunteer_id).await?;
    Ok(Json(find(&state, &id).await?))
}

/// GET /api/conversations/:id/messages
pub async fn messages(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<MessageList>, AppError> {
    state.gate.approved(&caller.volunteer_id).await?;
    find(&state, &id).await?;
    let messages = state.db.list_messages(&id).await?;
    Ok(Json(MessageList { messages }))
}

/// PATCH /api/conversations/:id
pub async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(req): Json<UpdateConversationRequest>,
) -> Result<Json<Conversation>, AppError> {
    state.gate.approved(&caller.volunteer_id).await?;

    if req.contact_name.is_none() && req.archived.is_none() {
        return Err(AppError::Validation("Nothing to update".to_string()));
    }
    let contact_name = match req.contact_name.as_deref().map(str::trim) {
        Some("") => return Err(AppError::Validation("Contact name cannot be empty".to_string())),
        other => other,
    };

    find(&state, &id).await?;
    if let Some(name) = contact_name {
        state.db.rename_conversation(&id, name).await?;
    }
    if let Some(archived) = req.archived {
        state.db.set_conversation_archived(&id, archived).await?;
    }

    Ok(Json(find(&state, &id).await?))
}

/// DELETE /api/messages/:id
pub async fn delete_message(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    let volunteer = state.gate.approved(&caller.volunteer_id).await?;
    let message = state
        .db
        .get_message(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Message not found".to_string()))?;
    delete_failed_message(&state.db, &volunteer.id, &message).await?;
    Ok(Json(SuccessResponse::ok()))
}
