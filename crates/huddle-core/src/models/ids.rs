//! Identifier newtypes

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Raw identifier as the backend may send it: UUID text or a bigint key.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl From<RawId> for String {
    fn from(value: RawId) -> Self {
        match value {
            RawId::Text(text) => text,
            RawId::Number(number) => number.to_string(),
        }
    }
}

macro_rules! server_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                RawId::deserialize(deserializer).map(|raw| Self(raw.into()))
            }
        }
    };
}

server_id!(
    /// Account / profile identifier
    UserId
);
server_id!(PostId);
server_id!(CommentId);
server_id!(LikeId);
server_id!(ConversationId);
server_id!(MessageId);
server_id!(NotificationId);
server_id!(FriendRequestId);

/// Client-generated identifier for an optimistic entry, using UUID v7
/// (time-sortable). Sent to the server as `client_ref` so the confirmed
/// row can be matched back to its placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TempId(Uuid);

impl TempId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn as_string(&self) -> String {
        self.0.to_string()
    }
}

impl Default for TempId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TempId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_id_accepts_text_and_numbers() {
        let from_text: PostId = serde_json::from_str("\"abc\"").unwrap();
        let from_number: PostId = serde_json::from_str("42").unwrap();
        assert_eq!(from_text.as_str(), "abc");
        assert_eq!(from_number.as_str(), "42");
    }

    #[test]
    fn server_id_serializes_as_plain_string() {
        let id = MessageId::new("m-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"m-1\"");
    }

    #[test]
    fn temp_ids_are_unique_and_parse_back() {
        let first = TempId::new();
        let second = TempId::new();
        assert_ne!(first, second);
        let parsed: TempId = first.as_string().parse().unwrap();
        assert_eq!(parsed, first);
    }
}
