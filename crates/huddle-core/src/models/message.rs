//! Chat models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::profile::one_or_many;
use super::{ConversationId, MessageId, ProfileSummary, TempId, UserId};
use crate::reconcile::Reconcilable;
use crate::util::de_timestamp;

/// Server-side delivery status of a chat message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    #[default]
    Sent,
    Delivered,
    Read,
    Failed,
}

impl DeliveryStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Read => "read",
            Self::Failed => "failed",
        }
    }
}

/// A confirmed chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub content: String,
    #[serde(default)]
    pub status: DeliveryStatus,
    #[serde(deserialize_with = "de_timestamp")]
    pub created_at: DateTime<Utc>,
    /// Temp id echoed back from the sending client, when it sent one
    #[serde(default)]
    pub client_ref: Option<TempId>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub profile: Option<ProfileSummary>,
}

impl Reconcilable for Message {
    type Id = MessageId;

    fn id(&self) -> &MessageId {
        &self.id
    }

    fn author(&self) -> &UserId {
        &self.sender_id
    }

    fn content(&self) -> &str {
        &self.content
    }

    fn client_ref(&self) -> Option<TempId> {
        self.client_ref
    }

    fn profile(&self) -> Option<&ProfileSummary> {
        self.profile.as_ref()
    }

    fn adopt_profile(&mut self, profile: &ProfileSummary) {
        if self.profile.is_none() {
            self.profile = Some(profile.clone());
        }
    }
}

/// The other member of a one-to-one conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// Preview of the newest message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastMessage {
    pub content: String,
    pub sender_id: UserId,
}

/// Conversation list row as returned by `get_user_conversations`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    #[serde(deserialize_with = "de_timestamp")]
    pub last_message_at: DateTime<Utc>,
    pub other_participant: Participant,
    #[serde(default)]
    pub last_message: Option<LastMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_row_decodes_with_joined_profile_array() {
        let raw = r#"{
            "id": "9c1d",
            "conversation_id": 7,
            "sender_id": "u-1",
            "content": "hello",
            "status": "delivered",
            "created_at": "2025-03-01T10:15:30+00:00",
            "profile": [{"username": "ana", "image": null}]
        }"#;
        let message: Message = serde_json::from_str(raw).unwrap();
        assert_eq!(message.conversation_id.as_str(), "7");
        assert_eq!(message.status, DeliveryStatus::Delivered);
        assert_eq!(message.profile.unwrap().username, "ana");
        assert!(message.client_ref.is_none());
    }

    #[test]
    fn realtime_record_without_status_defaults_to_sent() {
        let raw = r#"{
            "id": "9c1e",
            "conversation_id": "c",
            "sender_id": "u-2",
            "content": "yo",
            "created_at": "2025-03-01 10:15:30.5+00"
        }"#;
        let message: Message = serde_json::from_str(raw).unwrap();
        assert_eq!(message.status, DeliveryStatus::Sent);
    }
}
