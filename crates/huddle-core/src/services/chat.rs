//! Conversations and messages

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::ServiceContext;
use crate::backend::TableQuery;
use crate::error::{Error, Result};
use crate::models::{
    Conversation, ConversationId, DeliveryStatus, Message, MessageId, TempId, UserId,
};
use crate::util::{normalize_content, now};

/// Message columns with the sender's profile joined
pub const MESSAGE_SELECT: &str =
    "id,created_at,content,sender_id,conversation_id,status,profile:profiles(username,image)";

#[derive(Debug, Serialize)]
struct NewMessage<'a> {
    conversation_id: &'a ConversationId,
    sender_id: &'a UserId,
    content: &'a str,
    status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_ref: Option<TempId>,
}

#[derive(Debug, Deserialize)]
struct MessageIdRow {
    id: MessageId,
}

#[derive(Debug, Deserialize)]
struct UnreadRow {
    conversation_id: ConversationId,
}

#[derive(Debug, Clone)]
pub struct ChatService {
    context: ServiceContext,
}

impl ChatService {
    pub const fn new(context: ServiceContext) -> Self {
        Self { context }
    }

    /// Conversation list of the signed-in user, newest activity first.
    pub async fn conversations(&self) -> Result<Vec<Conversation>> {
        let viewer = self.context.require_viewer()?;
        self.context
            .rest()
            .rpc(
                "get_user_conversations",
                &serde_json::json!({ "p_user_id": viewer }),
            )
            .await
    }

    /// Id of the one-to-one conversation with `other`, created if missing.
    pub async fn open_conversation(&self, other: &UserId) -> Result<ConversationId> {
        let viewer = self.context.require_viewer()?;
        if viewer == other {
            return Err(Error::InvalidInput(
                "cannot open a conversation with yourself".to_string(),
            ));
        }
        self.context
            .rest()
            .rpc(
                "create_or_get_conversation",
                &serde_json::json!({ "other_user_id": other }),
            )
            .await
    }

    /// Messages of a conversation, newest first.
    pub async fn messages(&self, conversation_id: &ConversationId) -> Result<Vec<Message>> {
        let query = TableQuery::new("messages")
            .select(MESSAGE_SELECT)
            .eq("conversation_id", conversation_id)
            .order("created_at", false);
        self.context.rest().fetch(&query).await
    }

    /// Insert a message as `sent`. `client_ref` is stored only when echoing
    /// is enabled.
    pub async fn send_message(
        &self,
        conversation_id: &ConversationId,
        content: &str,
        client_ref: Option<TempId>,
    ) -> Result<Message> {
        let sender_id = self.context.require_viewer()?;
        let content = normalize_content(content)
            .ok_or_else(|| Error::InvalidInput("message must not be empty".to_string()))?;

        let row = NewMessage {
            conversation_id,
            sender_id,
            content: &content,
            status: DeliveryStatus::Sent,
            client_ref: client_ref.filter(|_| self.context.echo_client_ref()),
        };
        let target = TableQuery::new("messages").select(MESSAGE_SELECT);
        let mut message: Message = self.context.rest().insert_one(&target, &row).await?;
        message.client_ref = message.client_ref.or(row.client_ref);

        let touch = TableQuery::new("conversations").eq("id", conversation_id);
        let touched: Result<Vec<serde_json::Value>> = self
            .context
            .rest()
            .update(&touch, &serde_json::json!({ "last_message_at": now() }))
            .await;
        if let Err(error) = touched {
            tracing::warn!(%conversation_id, "Failed to bump conversation activity: {}", error);
        }

        tracing::debug!(%conversation_id, message_id = %message.id, "Message sent");
        Ok(message)
    }

    /// Mark messages from the other participant as read. Returns how many
    /// changed.
    pub async fn mark_read(&self, conversation_id: &ConversationId) -> Result<usize> {
        let viewer = self.context.require_viewer()?;
        let query = TableQuery::new("messages")
            .select("id,status")
            .eq("conversation_id", conversation_id)
            .neq("sender_id", viewer)
            .neq("status", DeliveryStatus::Read.as_str());
        let updated: Vec<MessageIdRow> = self
            .context
            .rest()
            .update(&query, &serde_json::json!({ "status": DeliveryStatus::Read }))
            .await?;
        Ok(updated.len())
    }

    /// Promote `sent` messages from the other participant to `delivered`.
    pub async fn mark_delivered(&self, conversation_id: &ConversationId) -> Result<usize> {
        let viewer = self.context.require_viewer()?;
        let query = TableQuery::new("messages")
            .select("id")
            .eq("conversation_id", conversation_id)
            .neq("sender_id", viewer)
            .eq("status", DeliveryStatus::Sent.as_str());
        let updated: Vec<MessageIdRow> = self
            .context
            .rest()
            .update(
                &query,
                &serde_json::json!({ "status": DeliveryStatus::Delivered }),
            )
            .await?;
        Ok(updated.len())
    }

    /// Mark every unread incoming message as read, across conversations.
    pub async fn mark_all_read(&self) -> Result<usize> {
        let viewer = self.context.require_viewer()?;
        let unread = TableQuery::new("messages")
            .select("id")
            .neq("sender_id", viewer)
            .neq("status", DeliveryStatus::Read.as_str());
        let rows: Vec<MessageIdRow> = self.context.rest().fetch(&unread).await?;
        if rows.is_empty() {
            return Ok(0);
        }

        let query = TableQuery::new("messages")
            .select("id")
            .is_in("id", rows.iter().map(|row| &row.id));
        let updated: Vec<MessageIdRow> = self
            .context
            .rest()
            .update(&query, &serde_json::json!({ "status": DeliveryStatus::Read }))
            .await?;
        Ok(updated.len())
    }

    /// Number of conversations holding at least one unread incoming message.
    pub async fn unread_conversation_count(&self) -> Result<usize> {
        let viewer = self.context.require_viewer()?;
        let query = TableQuery::new("messages")
            .select("conversation_id")
            .neq("sender_id", viewer)
            .neq("status", DeliveryStatus::Read.as_str());
        let rows: Vec<UnreadRow> = self.context.rest().fetch(&query).await?;
        Ok(distinct_conversations(&rows))
    }
}

fn distinct_conversations(rows: &[UnreadRow]) -> usize {
    rows.iter()
        .map(|row| &row.conversation_id)
        .collect::<HashSet<_>>()
        .len()
}
