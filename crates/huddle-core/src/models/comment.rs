//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::profile::one_or_many;
use super::{CommentId, PostId, ProfileSummary, TempId, UserId};
use crate::reconcile::Reconcilable;
use crate::util::de_timestamp;

/// A confirmed comment on a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    /// Absent when the row was selected through the post's relation
    #[serde(default)]
    pub post_id: Option<PostId>,
    pub user_id: UserId,
    pub content: String,
    #[serde(deserialize_with = "de_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub client_ref: Option<TempId>,
    #[serde(default, alias = "profiles", deserialize_with = "one_or_many")]
    pub profile: Option<ProfileSummary>,
}

impl Comment {
    #[must_use]
    pub fn author_name(&self) -> &str {
        self.profile
            .as_ref()
            .map_or("Unknown", |profile| profile.username.as_str())
    }
}

impl Reconcilable for Comment {
    type Id = CommentId;

    fn id(&self) -> &CommentId {
        &self.id
    }

    fn author(&self) -> &UserId {
        &self.user_id
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

/// Ordering of a comment thread
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentOrder {
    #[default]
    Newest,
    Oldest,
}

impl CommentOrder {
    #[must_use]
    pub const fn ascending(self) -> bool {
        matches!(self, Self::Oldest)
    }
}
