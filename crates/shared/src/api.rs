//! HTTP request and response bodies.

use serde::{Deserialize, Serialize};

use crate::models::{Conversation, Message, Volunteer};

/// Cookie carrying the session token for browser clients
pub const SESSION_COOKIE_NAME: &str = "hotline_session";

// ============================================================================
// Auth
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user_id: String,
    pub approved: bool,
    pub is_admin: bool,
}

// ============================================================================
// Outbound send
// ============================================================================

/// Volunteer reply. Every field is optional on the wire so that missing
/// values surface as validation failures rather than body rejections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Failed message this send supersedes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_of: Option<String>,
}

/// Delivered reply
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub success: bool,
    pub message: Message,
    pub delivery_id: String,
}

/// Reply persisted as failed after delivery retries ran out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendFailedResponse {
    pub error: String,
    pub message: Message,
}

// ============================================================================
// Admin
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolunteerActionRequest {
    #[serde(default)]
    pub volunteer_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Conversations and presence
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListConversationsQuery {
    #[serde(default)]
    pub archived: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConversationRequest {
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub archived: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationList {
    pub conversations: Vec<Conversation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageList {
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolunteerPresence {
    pub id: String,
    pub name: String,
    pub online: bool,
    pub last_seen: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceList {
    pub volunteers: Vec<VolunteerPresence>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingVolunteers {
    pub volunteers: Vec<Volunteer>,
}
