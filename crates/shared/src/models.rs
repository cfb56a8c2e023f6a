use serde::{Deserialize, Serialize};
use std::fmt;

/// Language assumed when nothing better is known.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Maximum length of an SMS body, inbound or outbound, in characters.
pub const MAX_MESSAGE_CHARS: usize = 1600;

/// A volunteer counts as online if seen within this many seconds.
pub const ONLINE_WINDOW_SECS: i64 = 120;

// ============================================================================
// Enums
// ============================================================================

/// Which way a message travelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Recipient -> hotline
    Inbound,
    /// Volunteer -> recipient
    Outbound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Received,
    Sent,
    Failed,
}

/// Conversation lifecycle.
///
/// `New` until a volunteer first replies, then `Active`. `Archived` only hides
/// the thread from the default list; an inbound text reopens it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    #[default]
    New,
    Active,
    Archived,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Received => "received",
            MessageStatus::Sent => "sent",
            MessageStatus::Failed => "failed",
        }
    }
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStatus::New => "new",
            ConversationStatus::Active => "active",
            ConversationStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Records
// ============================================================================

/// A coordinator identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Volunteer {
    pub id: String,
    pub email: String,
    pub name: String,
    pub approved: bool,
    pub is_admin: bool,
    pub last_seen: Option<String>,
    pub created_at: String,
}

impl Volunteer {
    /// Approved admins are the only ones allowed to approve or reject others.
    pub fn is_approved_admin(&self) -> bool {
        self.approved && self.is_admin
    }

    /// Whether `last_seen` falls inside the presence window ending at `now`.
    pub fn is_online_at(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        self.last_seen
            .as_deref()
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|seen| (now - seen.with_timezone(&chrono::Utc)).num_seconds() < ONLINE_WINDOW_SECS)
            .unwrap_or(false)
    }
}

/// One SMS thread, keyed by the sender's phone number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Conversation {
    pub id: String,
    pub phone_number: String,
    pub contact_name: String,
    pub detected_language: String,
    pub status: ConversationStatus,
    pub last_message_at: Option<String>,
    pub last_volunteer_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Conversation {
    /// Language replies should be sent in; blank values fall back to English.
    pub fn reply_language(&self) -> &str {
        let lang = self.detected_language.trim();
        if lang.is_empty() {
            DEFAULT_LANGUAGE
        } else {
            lang
        }
    }
}

/// One inbound or outbound SMS event.
///
/// Inbound: `original_text` is what arrived, `translated_text` the English
/// rendering. Outbound: `original_text` is the volunteer's English input,
/// `translated_text` what was actually transmitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub direction: Direction,
    pub volunteer_id: Option<String>,
    pub original_text: String,
    pub translated_text: Option<String>,
    pub detected_language: String,
    pub carrier_sid: Option<String>,
    pub status: MessageStatus,
    pub error_message: Option<String>,
    pub created_at: String,
}
