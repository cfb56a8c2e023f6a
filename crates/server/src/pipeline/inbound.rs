//! Carrier webhook -> stored inbound message.
//!
//! Received -> SignatureVerified -> Validated -> LanguageResolved -> Persisted
//! -> Acknowledged, with early exit at the signature and validation gates.
//! Translation trouble never stops a message from being stored; only storage
//! failures are fatal.

use shared::{Conversation, Direction, Message, MessageStatus, DEFAULT_LANGUAGE, MAX_MESSAGE_CHARS};

use crate::{
    db::{now_timestamp, Database, NewMessage},
    error::AppError,
    signature::SignatureVerifier,
    translate::Translator,
};

/// Empty TwiML envelope acknowledging the webhook.
pub const TWIML_ACK: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Response></Response>"#;

/// One webhook call as received.
#[derive(Debug, Clone)]
pub struct InboundWebhook {
    /// Full URL the carrier posted to, as it signed it
    pub url: String,
    pub signature: Option<String>,
    pub params: Vec<(String, String)>,
}

impl InboundWebhook {
    fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Validated inbound SMS fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundSms {
    pub from: String,
    pub body: String,
    pub message_sid: Option<String>,
}

impl InboundSms {
    pub fn from_webhook(webhook: &InboundWebhook) -> Result<Self, AppError> {
        let from = webhook.param("From").unwrap_or_default();
        let body = webhook.param("Body").unwrap_or_default();
        if from.is_empty() || body.is_empty() {
            return Err(AppError::Validation("Missing required fields".to_string()));
        }
        if !is_e164(from) {
            return Err(AppError::Validation("Invalid phone number format".to_string()));
        }
        if body.chars().count() > MAX_MESSAGE_CHARS {
            return Err(AppError::Validation("Invalid message length".to_string()));
        }

        Ok(Self {
            from: from.to_string(),
            body: body.to_string(),
            message_sid: webhook
                .param("MessageSid")
                .filter(|sid| !sid.is_empty())
                .map(str::to_string),
        })
    }
}

/// `+`, a non-zero digit, then 1 to 14 more digits.
pub fn is_e164(number: &str) -> bool {
    let Some(digits) = number.strip_prefix('+') else {
        return false;
    };
    let mut chars = digits.chars();
    match chars.next() {
        Some(first) if ('1'..='9').contains(&first) => {}
        _ => return false,
    }
    let rest = chars.as_str();
    (1..=14).contains(&rest.len()) && rest.chars().all(|c| c.is_ascii_digit())
}

#[derive(Debug, Clone)]
pub struct InboundOutcome {
    pub conversation: Conversation,
    pub message: Message,
    pub created_conversation: bool,
}

#[derive(Clone)]
pub struct InboundPipeline {
    store: Database,
    translator: Translator,
    verifier: SignatureVerifier,
}

impl InboundPipeline {
    pub fn new(store: Database, translator: Translator, verifier: SignatureVerifier) -> Self {
        Self {
            store,
            translator,
            verifier,
        }
    }

    pub async fn receive(&self, webhook: InboundWebhook) -> Result<InboundOutcome, AppError> {
        if !self
            .verifier
            .verify(&webhook.url, &webhook.params, webhook.signature.as_deref())
        {
            return Err(AppError::SignatureInvalid);
        }

        let sms = InboundSms::from_webhook(&webhook)?;

        let detection = self.translator.detect(&sms.body).await;
        let language = detection.language;
        let detection_failed = detection.failure.is_some();
        let mut diagnostics = detection
            .failure
            .map(|f| format!("language detection failed: {}", f));

        let translated_text = if language != DEFAULT_LANGUAGE {
            match self.translator.translate(&sms.body, &language, DEFAULT_LANGUAGE).await {
                Ok(text) => Some(text),
                Err(e) => {
                    tracing::warn!("Storing message from {} untranslated: {}", sms.from, e);
                    diagnostics = Some(format!("translation failed: {}", e));
                    None
                }
            }
        } else {
            None
        };

        let (mut conversation, created) = self
            .store
            .create_or_reuse_conversation(&sms.from, &language)
            .await?;
        if created {
            tracing::info!("New conversation {} with {}", conversation.id, sms.from);
        }
        // A fallback guess must not replace a language already observed
        if !created && !detection_failed && conversation.detected_language != language {
            self.store
                .update_conversation_language(&conversation.id, &language)
                .await?;
            conversation.detected_language = language.clone();
        }

        let message = self
            .store
            .append_message(
                &conversation.id,
                NewMessage {
                    direction: Direction::Inbound,
                    volunteer_id: None,
                    original_text: sms.body,
                    translated_text,
                    detected_language: language,
                    carrier_sid: sms.message_sid,
                    status: MessageStatus::Received,
                    error_message: diagnostics,
                },
            )
            .await?;

        self.store
            .touch_conversation(&conversation.id, &now_timestamp(), None)
            .await?;

        tracing::info!(
            "Stored inbound message {} in conversation {} ({})",
            message.id,
            conversation.id,
            message.detected_language
        );

        Ok(InboundOutcome {
            conversation,
            message,
            created_conversation: created,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeEngine;
    use std::sync::Arc;

    const URL: &str = "https://hotline.example.org/api/webhook";
    const SECRET: &str = "twilio-auth-token";

    fn params(from: &str, body: &str, sid: &str) -> Vec<(String, String)> {
        vec![
            ("From".to_string(), from.to_string()),
            ("Body".to_string(), body.to_string()),
            ("MessageSid".to_string(), sid.to_string()),
        ]
    }

    fn signed(params: Vec<(String, String)>) -> InboundWebhook {
        let signature = SignatureVerifier::new(SECRET).sign(URL, &params);
        InboundWebhook {
            url: URL.to_string(),
            signature: Some(signature),
            params,
        }
    }

    async fn pipeline(engine: FakeEngine) -> (InboundPipeline, Database) {
        let db = Database::in_memory().await.unwrap();
        let pipeline = InboundPipeline::new(
            db.clone(),
            Translator::new(Arc::new(engine)),
            SignatureVerifier::new(SECRET),
        );
        (pipeline, db)
    }

    #[tokio::test]
    async fn test_spanish_message_creates_conversation() {
        let engine = FakeEngine::new()
            .detect_with("es")
            .translate_with("Necesito ayuda", "I need help");
        let (pipeline, db) = pipeline(engine).await;

        let outcome = pipeline
            .receive(signed(params("+15551234567", "Necesito ayuda", "SM1")))
            .await
            .unwrap();

        assert!(outcome.created_conversation);
        assert_eq!(outcome.conversation.detected_language, "es");
        assert_eq!(outcome.conversation.phone_number, "+15551234567");

        let msg = &outcome.message;
        assert_eq!(msg.direction, Direction::Inbound);
        assert_eq!(msg.status, MessageStatus::Received);
        assert_eq!(msg.original_text, "Necesito ayuda");
        assert_eq!(msg.translated_text.as_deref(), Some("I need help"));
        assert_eq!(msg.carrier_sid.as_deref(), Some("SM1"));
        assert!(msg.volunteer_id.is_none());
        assert!(msg.error_message.is_none());

        let stored = db.get_conversation(&outcome.conversation.id).await.unwrap().unwrap();
        assert!(stored.last_message_at.is_some());
    }

    #[tokio::test]
    async fn test_english_message_is_not_translated() {
        let (pipeline, _db) = pipeline(FakeEngine::new().detect_with("en")).await;
        let outcome = pipeline
            .receive(signed(params("+15551234567", "Need a ride", "SM2")))
            .await
            .unwrap();
        assert!(outcome.message.translated_text.is_none());
        assert_eq!(outcome.message.detected_language, "en");
    }

    #[tokio::test]
    async fn test_translation_failure_still_persists_message() {
        let (pipeline, db) = pipeline(FakeEngine::new().detect_with("so").fail_translation()).await;

        let outcome = pipeline
            .receive(signed(params("+15559876543", "Waan u baahanahay caawimaad", "SM3")))
            .await
            .unwrap();

        assert!(outcome.message.translated_text.is_none());
        assert_eq!(outcome.message.detected_language, "so");
        assert!(outcome.message.error_message.unwrap().contains("translation failed"));
        assert_eq!(db.list_messages(&outcome.conversation.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_total_engine_outage_still_persists_message() {
        let (pipeline, db) = pipeline(FakeEngine::failing()).await;

        let outcome = pipeline
            .receive(signed(params("+15559876543", "Bonjour", "SM4")))
            .await
            .unwrap();

        assert_eq!(outcome.message.detected_language, "en");
        assert!(outcome.message.translated_text.is_none());
        assert!(outcome
            .message
            .error_message
            .unwrap()
            .contains("language detection failed"));
        assert_eq!(db.list_messages(&outcome.conversation.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_tampered_body_rejected_without_mutation() {
        let (pipeline, db) = pipeline(FakeEngine::new().detect_with("en")).await;

        let mut webhook = signed(params("+15551234567", "Need a ride", "SM5"));
        webhook.params[1].1 = "Need a ride to the airport".to_string();

        let err = pipeline.receive(webhook).await.unwrap_err();
        assert!(matches!(err, AppError::SignatureInvalid));
        assert!(db.find_conversation_by_phone("+15551234567").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_signature_rejected() {
        let (pipeline, _db) = pipeline(FakeEngine::new()).await;
        let mut webhook = signed(params("+15551234567", "hi", "SM6"));
        webhook.signature = None;
        assert!(matches!(
            pipeline.receive(webhook).await,
            Err(AppError::SignatureInvalid)
        ));
    }

    #[tokio::test]
    async fn test_invalid_payloads_rejected() {
        let (pipeline, db) = pipeline(FakeEngine::new()).await;

        let too_long = "a".repeat(MAX_MESSAGE_CHARS + 1);
        let cases = vec![
            params("15551234567", "hi", "SM7"),
            params("+05551234567", "hi", "SM7"),
            params("+1555123456789012", "hi", "SM7"),
            params("+15551234567", "", "SM7"),
            params("", "hi", "SM7"),
            params("+15551234567", &too_long, "SM7"),
        ];
        for case in cases {
            let err = pipeline.receive(signed(case)).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
        assert!(db.list_conversations(false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_max_length_body_accepted() {
        let (pipeline, _db) = pipeline(FakeEngine::new()).await;
        let body = "a".repeat(MAX_MESSAGE_CHARS);
        assert!(pipeline
            .receive(signed(params("+15551234567", &body, "SM8")))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_repeat_sender_reuses_conversation_and_updates_language() {
        let (pipeline, db) = pipeline(FakeEngine::new().detect_with("es")).await;
        let first = pipeline
            .receive(signed(params("+15551234567", "Hola", "SM9")))
            .await
            .unwrap();

        let pipeline_fr = InboundPipeline::new(
            db.clone(),
            Translator::new(Arc::new(FakeEngine::new().detect_with("fr"))),
            SignatureVerifier::new(SECRET),
        );
        let second = pipeline_fr
            .receive(signed(params("+15551234567", "Bonjour", "SM10")))
            .await
            .unwrap();

        assert!(!second.created_conversation);
        assert_eq!(second.conversation.id, first.conversation.id);
        assert_eq!(second.conversation.detected_language, "fr");
        let stored = db.get_conversation(&first.conversation.id).await.unwrap().unwrap();
        assert_eq!(stored.detected_language, "fr");
        assert_eq!(db.list_messages(&stored.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_detection_outage_keeps_known_language() {
        let (pipeline, db) = pipeline(FakeEngine::new().detect_with("es")).await;
        let first = pipeline
            .receive(signed(params("+15551234567", "Hola", "SM11")))
            .await
            .unwrap();

        let pipeline_down = InboundPipeline::new(
            db.clone(),
            Translator::new(Arc::new(FakeEngine::failing())),
            SignatureVerifier::new(SECRET),
        );
        let second = pipeline_down
            .receive(signed(params("+15551234567", "Gracias", "SM12")))
            .await
            .unwrap();

        assert_eq!(second.conversation.detected_language, "es");
        assert_eq!(second.message.detected_language, "en");
        assert!(second.message.error_message.is_some());
        let stored = db.get_conversation(&first.conversation.id).await.unwrap().unwrap();
        assert_eq!(stored.detected_language, "es");
    }

    #[tokio::test]
    async fn test_concurrent_first_messages_share_one_conversation() {
        let (pipeline, db) = pipeline(FakeEngine::new().detect_with("en")).await;

        let calls = (0..5).map(|i| {
            let pipeline = pipeline.clone();
            async move {
                let body = format!("msg {}", i);
                let sid = format!("SM{}", i);
                pipeline
                    .receive(signed(params("+15550009999", &body, &sid)))
                    .await
                    .unwrap()
            }
        });
        let outcomes = futures::future::join_all(calls).await;

        assert_eq!(outcomes.iter().filter(|o| o.created_conversation).count(), 1);
        let conversations = db.list_conversations(false).await.unwrap();
        assert_eq!(conversations.len(), 1);
        assert_eq!(db.list_messages(&conversations[0].id).await.unwrap().len(), 5);
    }

    #[test]
    fn test_e164() {
        assert!(is_e164("+15551234567"));
        assert!(is_e164("+12"));
        assert!(is_e164("+123456789012345"));
        assert!(!is_e164("+1234567890123456"));
        assert!(!is_e164("+"));
        assert!(!is_e164("+1"));
        assert!(!is_e164("+0123"));
        assert!(!is_e164("+1 555 123"));
        assert!(!is_e164("5551234567"));
    }
}
