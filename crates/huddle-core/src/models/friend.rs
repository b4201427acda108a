//! Friend request and friendship models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{FriendRequestId, UserId};
use crate::util::de_timestamp_option;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendRequestStatus {
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendRequest {
    pub id: FriendRequestId,
    pub requester_id: UserId,
    pub addressee_id: UserId,
    pub status: FriendRequestStatus,
    #[serde(default, deserialize_with = "de_timestamp_option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de_timestamp_option")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friendship {
    pub user_id_a: UserId,
    pub user_id_b: UserId,
}

impl Friendship {
    /// The member of this friendship that is not `user_id`.
    #[must_use]
    pub fn other(&self, user_id: &UserId) -> &UserId {
        if &self.user_id_a == user_id {
            &self.user_id_b
        } else {
            &self.user_id_a
        }
    }
}

/// Relationship between the viewer and another user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "request_id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FriendshipStatus {
    None,
    Friends,
    RequestSent(FriendRequestId),
    RequestReceived(FriendRequestId),
}
