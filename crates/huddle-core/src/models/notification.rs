//! Notification model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::profile::one_or_many;
use super::{NotificationId, PostId, ProfileSummary, UserId};
use crate::util::de_timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Like,
    Comment,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostExcerpt {
    pub body: String,
}

/// A notification addressed to the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub read: bool,
    #[serde(deserialize_with = "de_timestamp")]
    pub created_at: DateTime<Utc>,
    pub actor_id: UserId,
    #[serde(default)]
    pub post_id: Option<PostId>,
    #[serde(default, rename = "actor_profiles", deserialize_with = "one_or_many")]
    pub actor: Option<ProfileSummary>,
    #[serde(default, rename = "posts", deserialize_with = "one_or_many")]
    pub post: Option<PostExcerpt>,
}

impl Notification {
    /// One-line human description.
    #[must_use]
    pub fn summary(&self) -> String {
        let actor = self
            .actor
            .as_ref()
            .map_or("Someone", |actor| actor.username.as_str());
        match self.kind {
            NotificationKind::Like => format!("{actor} liked your post"),
            NotificationKind::Comment => match self.content.as_deref() {
                Some(content) if !content.trim().is_empty() => {
                    format!("{actor} commented: {}", content.trim())
                }
                _ => format!("{actor} commented on your post"),
            },
            NotificationKind::Other => self
                .content
                .clone()
                .unwrap_or_else(|| format!("New activity from {actor}")),
        }
    }
}

pub const NOTIFICATION_SELECT: &str = "id,type,content,read,created_at,actor_id,post_id,actor_profiles:actor_id(username,image),posts:post_id(body)";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_decodes_joined_rows() {
        let raw = r#"{
            "id": "n-1",
            "type": "comment",
            "content": "great shot",
            "read": false,
            "created_at": "2025-03-01T10:15:30Z",
            "actor_id": "u-2",
            "post_id": "p-1",
            "actor_profiles": [{"username": "ben", "image": null}],
            "posts": {"body": "Sunset"}
        }"#;
        let notification: Notification = serde_json::from_str(raw).unwrap();
        assert_eq!(notification.kind, NotificationKind::Comment);
        assert_eq!(notification.post.as_ref().unwrap().body, "Sunset");
        assert_eq!(notification.summary(), "ben commented: great shot");
    }

    #[test]
    fn unknown_kind_maps_to_other() {
        let raw = r#"{
            "id": "n-2",
            "type": "mention",
            "created_at": "2025-03-01T10:15:30Z",
            "actor_id": "u-2"
        }"#;
        let notification: Notification = serde_json::from_str(raw).unwrap();
        assert_eq!(notification.kind, NotificationKind::Other);
        assert!(!notification.read);
        assert_eq!(notification.summary(), "New activity from Someone");
    }
}
