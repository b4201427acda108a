//! Feed post card: heart, like count and comment count

use super::{Completion, IdRow, LiveView, ViewUpdate};
use crate::error::Result;
use crate::models::{CommentId, LikeId, Post, PostLike, TempId, UserId};
use crate::realtime::{ChangeEvent, ChangeFilter, ChangeKind};
use crate::reconcile::{IdTally, LikeLedger, LikeRequest, LikeResult};

#[derive(Debug, Clone)]
pub struct PostCard {
    post: Post,
    likes: LikeLedger,
    comments: IdTally<CommentId>,
}

impl PostCard {
    #[must_use]
    pub fn new(post: Post, viewer: Option<UserId>) -> Self {
        let likes = LikeLedger::from_post(&post, viewer);
        let comments = IdTally::from_ids(post.comment_ids.iter().cloned());
        Self {
            post,
            likes,
            comments,
        }
    }

    #[must_use]
    pub const fn post(&self) -> &Post {
        &self.post
    }

    #[must_use]
    pub fn like_count(&self) -> usize {
        self.likes.count()
    }

    #[must_use]
    pub fn is_liked(&self) -> bool {
        self.likes.is_liked()
    }

    #[must_use]
    pub const fn like_pending(&self) -> bool {
        self.likes.is_pending()
    }

    #[must_use]
    pub fn comment_count(&self) -> usize {
        self.comments.count()
    }

    /// Flip the heart and return the mutation to send.
    pub fn toggle_like(&mut self) -> Result<LikeRequest> {
        self.likes.toggle()
    }

    /// Apply the answer to a toggle. A failure of the newest toggle reverts
    /// the heart to the confirmed state; an older toggle is only reported
    /// as superseded.
    pub fn complete_like(&mut self, token: TempId, result: Result<LikeResult>) -> Completion {
        let failed = result.is_err();
        let current = self.likes.complete(token, result);
        match (current, failed) {
            (true, true) => Completion::Reverted,
            (true, false) => Completion::Applied,
            (false, _) => Completion::Superseded,
        }
    }

    /// Re-seed from a refetched feed row.
    pub fn refresh(&mut self, post: Post) {
        self.likes.reseed(post.likes.iter().cloned());
        self.comments.reset_ids(post.comment_ids.iter().cloned());
        self.post = post;
    }

    fn apply_like_change(&mut self, event: &ChangeEvent) -> Result<bool> {
        match event.kind {
            ChangeKind::Insert => {
                let like: PostLike = event.record_as()?;
                if like.post_id.as_ref() != Some(&self.post.id) {
                    return Ok(false);
                }
                Ok(self.likes.apply_insert(like))
            }
            ChangeKind::Delete => {
                let row: IdRow<LikeId> = event.old_record_as()?;
                Ok(self.likes.apply_delete(&row.id))
            }
            ChangeKind::Update => Ok(false),
        }
    }

    fn apply_comment_change(&mut self, event: &ChangeEvent) -> Result<bool> {
        match event.kind {
            ChangeKind::Insert => {
                let row: IdRow<CommentId> = event.record_as()?;
                Ok(self.comments.insert(row.id))
            }
            ChangeKind::Delete => {
                let row: IdRow<CommentId> = event.old_record_as()?;
                Ok(self.comments.remove(&row.id))
            }
            ChangeKind::Update => Ok(false),
        }
    }
}

impl LiveView for PostCard {
    fn filters(&self) -> Vec<ChangeFilter> {
        vec![
            ChangeFilter::table("post_likes").eq("post_id", &self.post.id),
            ChangeFilter::table("comments").eq("post_id", &self.post.id),
        ]
    }

    fn apply_change(&mut self, event: &ChangeEvent) -> Result<ViewUpdate> {
        let changed = match event.table.as_str() {
            "post_likes" => self.apply_like_change(event)?,
            "comments" => self.apply_comment_change(event)?,
            _ => false,
        };
        Ok(ViewUpdate::changed(changed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::{PostId, ProfileSummary};
    use crate::views::tests::change;
    use chrono::Utc;
    use serde_json::json;

    fn like(id: &str, user: &str) -> PostLike {
        PostLike {
            id: LikeId::new(id),
            post_id: Some(PostId::new("p-1")),
            user_id: UserId::new(user),
            created_at: None,
        }
    }

    fn card(likes: Vec<PostLike>, comments: &[&str]) -> PostCard {
        let post = Post {
            id: PostId::new("p-1"),
            user_id: UserId::new("author"),
            body: "Sunset".to_string(),
            created_at: Utc::now(),
            author: ProfileSummary::unknown(),
            image_urls: Vec::new(),
            likes,
            comment_ids: comments.iter().map(|id| CommentId::new(*id)).collect(),
        };
        PostCard::new(post, Some(UserId::new("me")))
    }

    #[test]
    fn like_then_stale_delete_replay_never_undercounts() {
        let mut card = card(vec![like("1", "other")], &[]);
        let request = card.toggle_like().unwrap();
        assert_eq!(card.like_count(), 2);
        assert!(card.is_liked());

        let completion = card.complete_like(request.token, Ok(LikeResult::Liked(like("7", "me"))));
        assert_eq!(completion, Completion::Applied);
        assert_eq!(card.like_count(), 2);

        // A delete for a like that was never part of this card.
        let stale = change("post_likes", ChangeKind::Delete, json!({ "id": "3" }));
        assert!(!card.apply_change(&stale).unwrap().changed);
        assert_eq!(card.like_count(), 2);

        // The feed echo of our own like is not counted twice.
        let echo = change(
            "post_likes",
            ChangeKind::Insert,
            json!({ "id": "7", "post_id": "p-1", "user_id": "me" }),
        );
        assert!(!card.apply_change(&echo).unwrap().changed);
        assert_eq!(card.like_count(), 2);
    }

    #[test]
    fn failed_like_reverts_to_confirmed_state() {
        let mut card = card(vec![], &[]);
        let request = card.toggle_like().unwrap();
        assert_eq!(card.like_count(), 1);

        let completion = card.complete_like(request.token, Err(Error::Backend("nope".into())));
        assert_eq!(completion, Completion::Reverted);
        assert_eq!(card.like_count(), 0);
        assert!(!card.is_liked());
        assert!(!card.like_pending());
    }

    #[test]
    fn superseded_toggle_is_reported() {
        let mut card = card(vec![], &[]);
        let like_request = card.toggle_like().unwrap();
        let unlike_request = card.toggle_like().unwrap();
        assert!(!card.is_liked());

        let completion =
            card.complete_like(like_request.token, Ok(LikeResult::Liked(like("4", "me"))));
        assert_eq!(completion, Completion::Superseded);
        assert_eq!(card.like_count(), 0);

        let completion = card.complete_like(
            unlike_request.token,
            Ok(LikeResult::Unliked(vec![LikeId::new("4")])),
        );
        assert_eq!(completion, Completion::Applied);
        assert_eq!(card.like_count(), 0);
    }

    #[test]
    fn failure_of_superseded_toggle_keeps_newer_intent() {
        let mut card = card(vec![], &[]);
        let like_request = card.toggle_like().unwrap();
        let unlike_request = card.toggle_like().unwrap();
        let relike_request = card.toggle_like().unwrap();
        assert!(card.is_liked());

        let completion =
            card.complete_like(unlike_request.token, Err(Error::Backend("nope".into())));
        assert_eq!(completion, Completion::Superseded);
        assert!(card.is_liked());
        assert!(card.like_pending());
        assert_eq!(card.like_count(), 1);

        assert_eq!(
            card.complete_like(like_request.token, Ok(LikeResult::Liked(like("4", "me")))),
            Completion::Superseded
        );
        assert_eq!(
            card.complete_like(relike_request.token, Ok(LikeResult::Liked(like("4", "me")))),
            Completion::Applied
        );
        assert_eq!(card.like_count(), 1);
    }

    #[test]
    fn comment_count_is_idempotent() {
        let mut card = card(vec![], &["c-1"]);
        let insert = change(
            "comments",
            ChangeKind::Insert,
            json!({ "id": "c-2", "post_id": "p-1", "user_id": "x", "content": "hi" }),
        );
        assert!(card.apply_change(&insert).unwrap().changed);
        assert!(!card.apply_change(&insert).unwrap().changed);
        assert_eq!(card.comment_count(), 2);

        let delete = change("comments", ChangeKind::Delete, json!({ "id": "c-1" }));
        assert!(card.apply_change(&delete).unwrap().changed);
        assert!(!card.apply_change(&delete).unwrap().changed);
        assert_eq!(card.comment_count(), 1);
    }

    #[test]
    fn likes_on_other_posts_are_ignored() {
        let mut card = card(vec![], &[]);
        let elsewhere = change(
            "post_likes",
            ChangeKind::Insert,
            json!({ "id": "9", "post_id": "p-2", "user_id": "x" }),
        );
        assert!(!card.apply_change(&elsewhere).unwrap().changed);
        assert_eq!(card.like_count(), 0);
    }
}
