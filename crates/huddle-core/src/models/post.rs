//! Post and like models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::profile::one_or_many;
use super::{CommentId, LikeId, PostId, ProfileSummary, UserId};
use crate::util::{de_timestamp, de_timestamp_option};

/// One row of `post_likes`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostLike {
    pub id: LikeId,
    /// Absent when selected through the post's relation
    #[serde(default)]
    pub post_id: Option<PostId>,
    pub user_id: UserId,
    #[serde(default, deserialize_with = "de_timestamp_option")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A feed post with its counters already flattened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    pub id: PostId,
    pub user_id: UserId,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub author: ProfileSummary,
    pub image_urls: Vec<String>,
    pub likes: Vec<PostLike>,
    pub comment_ids: Vec<CommentId>,
}

impl Post {
    #[must_use]
    pub fn like_count(&self) -> usize {
        self.likes.len()
    }

    #[must_use]
    pub fn comment_count(&self) -> usize {
        self.comment_ids.len()
    }

    #[must_use]
    pub fn is_liked_by(&self, user_id: &UserId) -> bool {
        self.likes.iter().any(|like| &like.user_id == user_id)
    }

    /// First line of the body, truncated to `max_len` characters.
    #[must_use]
    pub fn preview(&self, max_len: usize) -> String {
        self.body
            .lines()
            .next()
            .unwrap_or("")
            .chars()
            .take(max_len)
            .collect()
    }
}

/// Column list for the joined feed query
pub const POST_SELECT: &str =
    "id,body,created_at,user_id,profiles(username,image),post_images(image_url),post_likes(id,user_id),comments(id)";

#[derive(Debug, Deserialize)]
pub(crate) struct PostRow {
    id: PostId,
    user_id: UserId,
    #[serde(default)]
    body: String,
    #[serde(deserialize_with = "de_timestamp")]
    created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "one_or_many")]
    profiles: Option<ProfileSummary>,
    #[serde(default)]
    post_images: Vec<PostImageRow>,
    #[serde(default)]
    post_likes: Vec<PostLike>,
    #[serde(default)]
    comments: Vec<CommentIdRow>,
}

#[derive(Debug, Deserialize)]
struct PostImageRow {
    image_url: String,
}

#[derive(Debug, Deserialize)]
struct CommentIdRow {
    id: CommentId,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        let post_id = row.id;
        let likes = row
            .post_likes
            .into_iter()
            .map(|mut like| {
                like.post_id.get_or_insert_with(|| post_id.clone());
                like
            })
            .collect();

        Self {
            id: post_id,
            user_id: row.user_id,
            body: row.body,
            created_at: row.created_at,
            author: row.profiles.unwrap_or_else(ProfileSummary::unknown),
            image_urls: row
                .post_images
                .into_iter()
                .map(|image| image.image_url)
                .collect(),
            likes,
            comment_ids: row.comments.into_iter().map(|comment| comment.id).collect(),
        }
    }
}

/// New post payload
#[derive(Debug, Clone, Serialize)]
pub(crate) struct NewPost<'a> {
    pub body: &'a str,
    pub user_id: &'a UserId,
}
