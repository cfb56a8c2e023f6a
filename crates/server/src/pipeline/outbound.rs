//! Volunteer reply -> translated, delivered, stored outbound message.
//!
//! Requested -> Authorized -> Validated -> ConversationResolved -> Translated
//! -> Delivered-or-Failed -> Persisted -> Responded. Delivery exhaustion is a
//! recorded outcome, not an error: the reply is stored as `failed` so it can
//! be resent. Translation failure here is fatal and nothing is sent.

use shared::{
    Conversation, Direction, Message, MessageStatus, SendMessageRequest, DEFAULT_LANGUAGE,
    MAX_MESSAGE_CHARS,
};
use std::sync::Arc;

use crate::{
    db::{now_timestamp, Database, NewMessage},
    delivery::{deliver_with_retry, DeliveryOutcome, RetryPolicy, SmsCarrier},
    error::AppError,
    gate::Gate,
    translate::Translator,
};

/// Validated send request.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ValidatedSend {
    conversation_id: String,
    text: String,
    retry_of: Option<String>,
}

impl ValidatedSend {
    fn from_request(request: SendMessageRequest) -> Result<Self, AppError> {
        let (Some(conversation_id), Some(text), Some(_)) =
            (request.conversation_id, request.message, request.user_id)
        else {
            return Err(AppError::Validation("Missing required fields".to_string()));
        };
        if conversation_id.trim().is_empty() {
            return Err(AppError::Validation("Missing required fields".to_string()));
        }
        if text.trim().is_empty() {
            return Err(AppError::Validation("Message cannot be empty".to_string()));
        }
        if text.chars().count() > MAX_MESSAGE_CHARS {
            return Err(AppError::Validation(format!(
                "Message too long (max {} characters)",
                MAX_MESSAGE_CHARS
            )));
        }
        Ok(Self {
            conversation_id,
            text,
            retry_of: request.retry_of.filter(|id| !id.is_empty()),
        })
    }
}

#[derive(Debug, Clone)]
pub enum SendOutcome {
    Delivered { message: Message, delivery_id: String },
    /// Every delivery attempt failed; the message is stored as `failed`
    Failed { message: Message, error: String },
}

impl SendOutcome {
    pub fn message(&self) -> &Message {
        match self {
            SendOutcome::Delivered { message, .. } | SendOutcome::Failed { message, .. } => message,
        }
    }
}

#[derive(Clone)]
pub struct OutboundPipeline {
    store: Database,
    gate: Gate,
    translator: Translator,
    carrier: Arc<dyn SmsCarrier>,
    retry: RetryPolicy,
}

impl OutboundPipeline {
    pub fn new(
        store: Database,
        gate: Gate,
        translator: Translator,
        carrier: Arc<dyn SmsCarrier>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            gate,
            translator,
            carrier,
            retry,
        }
    }

    /// Send a reply on behalf of `caller_id`, the authenticated volunteer.
    pub async fn send(
        &self,
        caller_id: &str,
        request: SendMessageRequest,
    ) -> Result<SendOutcome, AppError> {
        let volunteer = self.gate.approved(caller_id).await?;
        if let Some(claimed) = request.user_id.as_deref() {
            if claimed != volunteer.id {
                return Err(AppError::Forbidden("Forbidden - User ID mismatch".to_string()));
            }
        }

        let send = ValidatedSend::from_request(request)?;

        let conversation = self
            .store
            .get_conversation(&send.conversation_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Conversation not found".to_string()))?;

        // A bad retryOf must be refused before anything reaches the carrier
        let superseded = match send.retry_of.as_deref() {
            Some(id) => Some(self.superseded_message(&volunteer.id, &conversation.id, id).await?),
            None => None,
        };

        let (text_to_send, translated_text) = self
            .render_for_recipient(&conversation, &send.text)
            .await?;

        let outcome = deliver_with_retry(
            self.carrier.as_ref(),
            &conversation.phone_number,
            &text_to_send,
            &self.retry,
        )
        .await;

        let (status, carrier_sid, error_message) = match &outcome {
            DeliveryOutcome::Delivered { delivery_id, .. } => {
                (MessageStatus::Sent, Some(delivery_id.clone()), None)
            }
            DeliveryOutcome::Failed { error, .. } => {
                (MessageStatus::Failed, None, Some(error.to_string()))
            }
        };

        let message = self
            .store
            .append_message(
                &conversation.id,
                NewMessage {
                    direction: Direction::Outbound,
                    volunteer_id: Some(volunteer.id.clone()),
                    original_text: send.text,
                    translated_text,
                    detected_language: DEFAULT_LANGUAGE.to_string(),
                    carrier_sid,
                    status,
                    error_message,
                },
            )
            .await?;

        self.store
            .touch_conversation(&conversation.id, &now_timestamp(), Some(&volunteer.id))
            .await?;

        let attempts = outcome.attempts();
        match outcome {
            DeliveryOutcome::Delivered { delivery_id, .. } => {
                if let Some(old) = superseded {
                    if !self.store.delete_message(&old.id).await? {
                        tracing::debug!("Superseded message {} already gone", old.id);
                    }
                }
                tracing::info!(
                    "Volunteer {} replied in conversation {} ({}, attempt {})",
                    volunteer.id,
                    conversation.id,
                    delivery_id,
                    attempts
                );
                Ok(SendOutcome::Delivered { message, delivery_id })
            }
            DeliveryOutcome::Failed { .. } => Ok(SendOutcome::Failed {
                message,
                error: format!("Failed to send SMS after {} attempts", attempts),
            }),
        }
    }

    /// Text to transmit, and the value for `translated_text` (set only when the
    /// recipient's language is not English).
    async fn render_for_recipient(
        &self,
        conversation: &Conversation,
        text: &str,
    ) -> Result<(String, Option<String>), AppError> {
        let target = conversation.reply_language();
        if target == DEFAULT_LANGUAGE {
            return Ok((text.to_string(), None));
        }
        let translated = self
            .translator
            .translate(text, DEFAULT_LANGUAGE, target)
            .await
            .map_err(|e| AppError::TranslationFailed(e.to_string()))?;
        Ok((translated.clone(), Some(translated)))
    }

    /// The failed reply a retry replaces. It must be the caller's own failed
    /// outbound message in the same conversation.
    async fn superseded_message(
        &self,
        volunteer_id: &str,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<Message, AppError> {
        let old = self
            .store
            .get_message(message_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Message to retry not found".to_string()))?;
        if old.conversation_id != conversation_id {
            return Err(AppError::Validation(
                "retryOf refers to another conversation".to_string(),
            ));
        }
        ensure_own_failed_reply(volunteer_id, &old)?;
        Ok(old)
    }
}

fn ensure_own_failed_reply(volunteer_id: &str, message: &Message) -> Result<(), AppError> {
    let own_failed_reply = message.direction == Direction::Outbound
        && message.status == MessageStatus::Failed
        && message.volunteer_id.as_deref() == Some(volunteer_id);
    if own_failed_reply {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only your own failed messages can be deleted or retried".to_string(),
        ))
    }
}

/// Delete a failed outbound message. Only its author may do so.
pub async fn delete_failed_message(
    store: &Database,
    volunteer_id: &str,
    message: &Message,
) -> Result<(), AppError> {
    ensure_own_failed_reply(volunteer_id, message)?;
    store.delete_message(&message.id).await?;
    tracing::info!("Deleted failed message {}", message.id);
    Ok(())
}
