pub mod api;
pub mod models;

pub use api::*;
pub use models::*;

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_message() -> Message {
        Message {
            id: "m1".to_string(),
            conversation_id: "c1".to_string(),
            direction: Direction::Outbound,
            volunteer_id: Some("v1".to_string()),
            original_text: "We can help at 3pm".to_string(),
            translated_text: Some("Podemos ayudar a las 3pm".to_string()),
            detected_language: "en".to_string(),
            carrier_sid: None,
            status: MessageStatus::Failed,
            error_message: Some("carrier unavailable".to_string()),
            created_at: "2026-01-01T00:00:00.000000Z".to_string(),
        }
    }

    #[test]
    fn test_send_request_uses_camel_case() {
        let json = r#"{"conversationId":"c1","message":"hi","userId":"v1"}"#;
        let req: SendMessageRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.conversation_id.as_deref(), Some("c1"));
        assert_eq!(req.message.as_deref(), Some("hi"));
        assert_eq!(req.user_id.as_deref(), Some("v1"));
        assert!(req.retry_of.is_none());
    }

    #[test]
    fn test_send_request_tolerates_missing_fields() {
        let req: SendMessageRequest = serde_json::from_str("{}").unwrap();
        assert!(req.conversation_id.is_none());
        assert!(req.message.is_none());
        assert!(req.user_id.is_none());
    }

    #[test]
    fn test_send_response_shape() {
        let resp = SendMessageResponse {
            success: true,
            message: sample_message(),
            delivery_id: "SM123".to_string(),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["deliveryId"], "SM123");
        assert_eq!(json["message"]["direction"], "outbound");
        assert_eq!(json["message"]["status"], "failed");
    }

    #[test]
    fn test_volunteer_action_request() {
        let req: VolunteerActionRequest =
            serde_json::from_str(r#"{"volunteerId":"abc"}"#).unwrap();
        assert_eq!(req.volunteer_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_conversation_status_serialization() {
        let json = serde_json::to_string(&ConversationStatus::Archived).unwrap();
        assert_eq!(json, "\"archived\"");
        assert_eq!(ConversationStatus::default(), ConversationStatus::New);
    }

    #[test]
    fn test_volunteer_presence_window() {
        let now = chrono::Utc::now();
        let mut v = Volunteer {
            id: "v1".to_string(),
            email: "v@example.org".to_string(),
            name: "V".to_string(),
            approved: true,
            is_admin: false,
            last_seen: Some((now - chrono::Duration::seconds(30)).to_rfc3339()),
            created_at: now.to_rfc3339(),
        };
        assert!(v.is_online_at(now));

        v.last_seen = Some((now - chrono::Duration::minutes(5)).to_rfc3339());
        assert!(!v.is_online_at(now));

        v.last_seen = None;
        assert!(!v.is_online_at(now));
    }

    #[test]
    fn test_reply_language_defaults_to_english() {
        let mut conv = Conversation {
            id: "c1".to_string(),
            phone_number: "+15551234567".to_string(),
            contact_name: "+15551234567".to_string(),
            detected_language: "es".to_string(),
            status: ConversationStatus::New,
            last_message_at: None,
            last_volunteer_id: None,
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert_eq!(conv.reply_language(), "es");
        conv.detected_language = "  ".to_string();
        assert_eq!(conv.reply_language(), DEFAULT_LANGUAGE);
    }
}
