//! Comment thread state

use super::{Completion, IdRow, LiveView, Outgoing, ViewEffect, ViewUpdate};
use crate::error::{Error, Result};
use crate::models::{Comment, CommentId, CommentOrder, PostId, ProfileSummary, TempId, UserId};
use crate::realtime::{ChangeEvent, ChangeFilter, ChangeKind};
use crate::reconcile::{ListOrder, OptimisticList};
use crate::util::normalize_content;

const fn list_order(order: CommentOrder) -> ListOrder {
    match order {
        CommentOrder::Newest => ListOrder::NewestFirst,
        CommentOrder::Oldest => ListOrder::OldestFirst,
    }
}

/// Comments of one post in the chosen order, plus the draft input.
#[derive(Debug, Clone)]
pub struct CommentThread {
    post_id: PostId,
    viewer: Option<UserId>,
    viewer_profile: Option<ProfileSummary>,
    order: CommentOrder,
    comments: OptimisticList<Comment>,
    draft: String,
    closed: bool,
}

impl CommentThread {
    #[must_use]
    pub fn new(
        post_id: PostId,
        viewer: Option<UserId>,
        viewer_profile: Option<ProfileSummary>,
        order: CommentOrder,
    ) -> Self {
        Self {
            post_id,
            viewer,
            viewer_profile,
            order,
            comments: OptimisticList::new(list_order(order)),
            draft: String::new(),
            closed: false,
        }
    }

    #[must_use]
    pub const fn post_id(&self) -> &PostId {
        &self.post_id
    }

    #[must_use]
    pub const fn order(&self) -> CommentOrder {
        self.order
    }

    #[must_use]
    pub const fn comments(&self) -> &OptimisticList<Comment> {
        &self.comments
    }

    #[must_use]
    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Replace rendered comments with a fetch in the current order.
    pub fn load(&mut self, comments: Vec<Comment>) {
        self.comments.reload(comments);
    }

    /// Switch sort order. The rendered rows are dropped and the caller is
    /// asked to reload in the new order.
    pub fn set_order(&mut self, order: CommentOrder) -> ViewUpdate {
        if order == self.order {
            return ViewUpdate::unchanged();
        }
        self.order = order;
        self.comments = OptimisticList::new(list_order(order));
        ViewUpdate::changed(true).with(ViewEffect::Reload)
    }

    /// Take the draft and render it as a pending comment.
    pub fn begin_comment(&mut self) -> Result<Option<Outgoing>> {
        let Some(viewer) = self.viewer.clone() else {
            return Err(Error::Unauthorized);
        };
        if self.closed {
            return Ok(None);
        }
        let Some(content) = normalize_content(&self.draft) else {
            return Ok(None);
        };
        self.draft.clear();
        let temp_id = self
            .comments
            .push_pending(viewer, content.clone(), self.viewer_profile.clone());
        Ok(Some(Outgoing { temp_id, content }))
    }

    /// Apply the answer to a comment insert. On failure the placeholder is
    /// removed and its text put back into the draft.
    pub fn complete_comment(&mut self, temp_id: TempId, result: Result<Comment>) -> Completion {
        if self.closed {
            tracing::debug!(%temp_id, "comment completed after thread was closed");
            return Completion::Closed;
        }
        match result {
            Ok(comment) => {
                self.comments.resolve(temp_id, comment);
                Completion::Applied
            }
            Err(error) => {
                tracing::warn!(%temp_id, post_id = %self.post_id, "Comment failed: {}", error);
                match self.comments.discard(temp_id) {
                    Some(placeholder) => {
                        self.draft = placeholder.content;
                        Completion::Failed {
                            draft_restored: true,
                        }
                    }
                    None => Completion::Failed {
                        draft_restored: false,
                    },
                }
            }
        }
    }

    /// Fill in a profile fetched after a [`ViewEffect::FetchProfile`].
    pub fn attach_profile(&mut self, user_id: &UserId, profile: &ProfileSummary) -> ViewUpdate {
        ViewUpdate::changed(self.comments.attach_profile(user_id, profile) > 0)
    }

    pub fn close(&mut self) {
        self.closed = true;
    }
}

impl LiveView for CommentThread {
    fn filters(&self) -> Vec<ChangeFilter> {
        vec![ChangeFilter::table("comments").eq("post_id", &self.post_id)]
    }

    fn apply_change(&mut self, event: &ChangeEvent) -> Result<ViewUpdate> {
        if self.closed || event.table != "comments" {
            return Ok(ViewUpdate::unchanged());
        }
        match event.kind {
            ChangeKind::Insert => {
                let comment: Comment = event.record_as()?;
                if comment
                    .post_id
                    .as_ref()
                    .is_some_and(|post_id| post_id != &self.post_id)
                {
                    return Ok(ViewUpdate::unchanged());
                }
                let author = comment.user_id.clone();
                let outcome = self.comments.apply_insert(comment, self.viewer.as_ref());
                let update = ViewUpdate::changed(outcome.changed());
                let missing_profile = self
                    .comments
                    .confirmed()
                    .any(|comment| comment.user_id == author && comment.profile.is_none());
                if outcome.changed() && missing_profile {
                    return Ok(update.with(ViewEffect::FetchProfile(author)));
                }
                Ok(update)
            }
            ChangeKind::Update => {
                let comment: Comment = event.record_as()?;
                Ok(ViewUpdate::changed(
                    self.comments.apply_update(comment).changed(),
                ))
            }
            ChangeKind::Delete => {
                let row: IdRow<CommentId> = event.old_record_as()?;
                Ok(ViewUpdate::changed(
                    self.comments.apply_delete(&row.id).changed(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::tests::change;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn me_profile() -> ProfileSummary {
        ProfileSummary {
            username: "me_me".to_string(),
            image: None,
        }
    }

    fn thread(order: CommentOrder) -> CommentThread {
        CommentThread::new(
            PostId::new("p-1"),
            Some(UserId::new("me")),
            Some(me_profile()),
            order,
        )
    }

    fn comment(id: &str, user: &str, content: &str) -> Comment {
        Comment {
            id: CommentId::new(id),
            post_id: Some(PostId::new("p-1")),
            user_id: UserId::new(user),
            content: content.to_string(),
            created_at: Utc::now(),
            client_ref: None,
            profile: None,
        }
    }

    fn contents(thread: &CommentThread) -> Vec<String> {
        thread
            .comments()
            .rows()
            .iter()
            .map(|row| row.content().to_string())
            .collect()
    }

    #[test]
    fn oldest_first_appends_new_comments() {
        let mut thread = thread(CommentOrder::Oldest);
        thread.load(vec![comment("1", "you", "first")]);
        thread.set_draft("second");
        let outgoing = thread.begin_comment().unwrap().unwrap();

        assert_eq!(contents(&thread), vec!["first", "second"]);
        thread.complete_comment(outgoing.temp_id, Ok(comment("2", "me", "second")));
        assert_eq!(contents(&thread), vec!["first", "second"]);
        assert_eq!(thread.comments().pending_count(), 0);
    }

    #[test]
    fn feed_confirmation_keeps_local_profile() {
        let mut thread = thread(CommentOrder::Newest);
        thread.set_draft("nice shot");
        thread.begin_comment().unwrap().unwrap();

        let echo = change(
            "comments",
            ChangeKind::Insert,
            json!({
                "id": 8,
                "post_id": "p-1",
                "user_id": "me",
                "content": "nice shot",
                "created_at": "2025-03-01 10:15:30+00",
            }),
        );
        let update = thread.apply_change(&echo).unwrap();
        assert_eq!(update, ViewUpdate::changed(true));
        let confirmed = thread.comments().confirmed().next().unwrap();
        assert_eq!(confirmed.author_name(), "me_me");
    }

    #[test]
    fn foreign_comment_without_profile_requests_one() {
        let mut thread = thread(CommentOrder::Newest);
        let incoming = change(
            "comments",
            ChangeKind::Insert,
            json!({
                "id": 9,
                "post_id": "p-1",
                "user_id": "you",
                "content": "hey",
                "created_at": "2025-03-01T10:15:30Z",
            }),
        );
        let update = thread.apply_change(&incoming).unwrap();
        assert_eq!(
            update.effects,
            vec![ViewEffect::FetchProfile(UserId::new("you"))]
        );

        let you = ProfileSummary {
            username: "you_too".to_string(),
            image: None,
        };
        assert!(thread.attach_profile(&UserId::new("you"), &you).changed);
        assert_eq!(
            thread.comments().confirmed().next().unwrap().author_name(),
            "you_too"
        );
    }

    #[test]
    fn failed_comment_is_removed_and_draft_restored() {
        let mut thread = thread(CommentOrder::Newest);
        thread.set_draft("oops");
        let outgoing = thread.begin_comment().unwrap().unwrap();

        let completion =
            thread.complete_comment(outgoing.temp_id, Err(Error::Backend("denied".into())));
        assert_eq!(
            completion,
            Completion::Failed {
                draft_restored: true
            }
        );
        assert!(thread.comments().is_empty());
        assert_eq!(thread.draft(), "oops");
    }

    #[test]
    fn changing_order_asks_for_reload() {
        let mut thread = thread(CommentOrder::Newest);
        thread.load(vec![comment("1", "you", "a")]);

        assert_eq!(thread.set_order(CommentOrder::Newest), ViewUpdate::unchanged());
        let update = thread.set_order(CommentOrder::Oldest);
        assert_eq!(update.effects, vec![ViewEffect::Reload]);
        assert!(thread.comments().is_empty());
        assert_eq!(thread.comments().order(), ListOrder::OldestFirst);
    }

    #[test]
    fn signed_out_viewer_cannot_comment() {
        let mut thread = CommentThread::new(PostId::new("p-1"), None, None, CommentOrder::Newest);
        thread.set_draft("hi");
        assert!(matches!(thread.begin_comment(), Err(Error::Unauthorized)));
    }

    #[test]
    fn comments_for_other_posts_are_ignored() {
        let mut thread = thread(CommentOrder::Newest);
        let elsewhere = change(
            "comments",
            ChangeKind::Insert,
            json!({
                "id": 3,
                "post_id": "p-2",
                "user_id": "you",
                "content": "hey",
                "created_at": "2025-03-01T10:15:30Z",
            }),
        );
        assert_eq!(
            thread.apply_change(&elsewhere).unwrap(),
            ViewUpdate::unchanged()
        );
    }
}
