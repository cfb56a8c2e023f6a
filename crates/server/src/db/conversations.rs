//! Conversations and their messages.

use shared::{Conversation, ConversationStatus, Direction, Message, MessageStatus};
use uuid::Uuid;

use super::{now_timestamp, Database, StoreError, StoreResult};

const CONVERSATION_COLUMNS: &str = "id, phone_number, contact_name, detected_language, status, \
     last_message_at, last_volunteer_id, created_at, updated_at";

const MESSAGE_COLUMNS: &str = "id, conversation_id, direction, volunteer_id, original_text, \
     translated_text, detected_language, carrier_sid, status, error_message, created_at";

/// Fields of a message about to be appended to a conversation.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub direction: Direction,
    pub volunteer_id: Option<String>,
    pub original_text: String,
    pub translated_text: Option<String>,
    pub detected_language: String,
    pub carrier_sid: Option<String>,
    pub status: MessageStatus,
    pub error_message: Option<String>,
}

impl Database {
    pub async fn find_conversation_by_phone(
        &self,
        phone_number: &str,
    ) -> StoreResult<Option<Conversation>> {
        let conversation = sqlx::query_as::<_, Conversation>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE phone_number = ?"
        ))
        .bind(phone_number)
        .fetch_optional(&self.pool)
        .await?;
        Ok(conversation)
    }

    pub async fn get_conversation(&self, id: &str) -> StoreResult<Option<Conversation>> {
        let conversation = sqlx::query_as::<_, Conversation>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(conversation)
    }

    /// Look up the conversation for `phone_number`, creating it if absent.
    ///
    /// The insert relies on the UNIQUE(phone_number) constraint: when two
    /// callers race, the loser's insert is a no-op and both read back the
    /// winner's row. Returns the row and whether this call created it.
    pub async fn create_or_reuse_conversation(
        &self,
        phone_number: &str,
        initial_language: &str,
    ) -> StoreResult<(Conversation, bool)> {
        let now = now_timestamp();
        let result = sqlx::query(
            r#"
            INSERT INTO conversations (id, phone_number, contact_name, detected_language, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(phone_number) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(phone_number)
        .bind(phone_number)
        .bind(initial_language)
        .bind(ConversationStatus::New)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let created = result.rows_affected() == 1;
        let conversation = self
            .find_conversation_by_phone(phone_number)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: "Conversation",
                id: phone_number.to_string(),
            })?;

        if created {
            tracing::info!("Created conversation {} for {}", conversation.id, phone_number);
        }
        Ok((conversation, created))
    }

    /// Store a newly observed language. Returns false when nothing changed.
    pub async fn update_conversation_language(
        &self,
        id: &str,
        language: &str,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE conversations SET detected_language = ?, updated_at = ? WHERE id = ? AND detected_language <> ?",
        )
        .bind(language)
        .bind(now_timestamp())
        .bind(id)
        .bind(language)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record activity on a conversation.
    ///
    /// A volunteer reply marks the thread active and records the replier. Any
    /// other activity only reopens an archived thread.
    pub async fn touch_conversation(
        &self,
        id: &str,
        timestamp: &str,
        last_volunteer_id: Option<&str>,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE conversations SET
                last_message_at = ?1,
                updated_at = ?1,
                last_volunteer_id = COALESCE(?2, last_volunteer_id),
                status = CASE
                    WHEN ?2 IS NOT NULL THEN 'active'
                    WHEN status = 'archived' AND last_volunteer_id IS NULL THEN 'new'
                    WHEN status = 'archived' THEN 'active'
                    ELSE status
                END
            WHERE id = ?3
            "#,
        )
        .bind(timestamp)
        .bind(last_volunteer_id)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn append_message(
        &self,
        conversation_id: &str,
        fields: NewMessage,
    ) -> StoreResult<Message> {
        let message = Message {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            direction: fields.direction,
            volunteer_id: fields.volunteer_id,
            original_text: fields.original_text,
            translated_text: fields.translated_text,
            detected_language: fields.detected_language,
            carrier_sid: fields.carrier_sid,
            status: fields.status,
            error_message: fields.error_message,
            created_at: now_timestamp(),
        };

        sqlx::query(&format!(
            "INSERT INTO messages ({MESSAGE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&message.id)
        .bind(&message.conversation_id)
        .bind(message.direction)
        .bind(&message.volunteer_id)
        .bind(&message.original_text)
        .bind(&message.translated_text)
        .bind(&message.detected_language)
        .bind(&message.carrier_sid)
        .bind(message.status)
        .bind(&message.error_message)
        .bind(&message.created_at)
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            "Stored {} message {} in conversation {} ({})",
            message.direction,
            message.id,
            conversation_id,
            message.status
        );
        Ok(message)
    }

    pub async fn get_message(&self, id: &str) -> StoreResult<Option<Message>> {
        let message = sqlx::query_as::<_, Message>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(message)
    }

    /// Messages of a conversation in append order.
    pub async fn list_messages(&self, conversation_id: &str) -> StoreResult<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = ? ORDER BY created_at ASC, rowid ASC"
        ))
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    pub async fn delete_message(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM messages WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Conversations with the given archive visibility, most recent activity first.
    pub async fn list_conversations(&self, archived: bool) -> StoreResult<Vec<Conversation>> {
        let filter = if archived { "status = 'archived'" } else { "status <> 'archived'" };
        let conversations = sqlx::query_as::<_, Conversation>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE {filter} \
             ORDER BY COALESCE(last_message_at, created_at) DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(conversations)
    }

    pub async fn rename_conversation(&self, id: &str, contact_name: &str) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE conversations SET contact_name = ?, updated_at = ? WHERE id = ?")
            .bind(contact_name)
            .bind(now_timestamp())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Archive, or restore to `new`/`active` depending on whether anyone replied.
    pub async fn set_conversation_archived(&self, id: &str, archived: bool) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE conversations SET
                status = CASE
                    WHEN ?1 THEN 'archived'
                    WHEN status <> 'archived' THEN status
                    WHEN last_volunteer_id IS NULL THEN 'new'
                    ELSE 'active'
                END,
                updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(archived)
        .bind(now_timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
