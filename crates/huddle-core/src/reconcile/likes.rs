//! Like state for a single post

use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::models::{LikeId, Post, PostId, PostLike, TempId, UserId};

/// Mutation the caller has to send for a toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeAction {
    Like,
    Unlike,
}

/// Toggle handed back to the caller; `token` identifies it in `complete`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeRequest {
    pub token: TempId,
    pub post_id: PostId,
    pub action: LikeAction,
}

/// Server answer to a like mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikeResult {
    /// The inserted like row
    Liked(PostLike),
    /// Ids of the like rows the delete removed
    Unliked(Vec<LikeId>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Intent {
    token: TempId,
    liked: bool,
}

/// Confirmed likes of a post plus at most one pending toggle.
///
/// Likes are keyed by like id so that a delete event, which only carries
/// the id, is applied exactly once.
#[derive(Debug, Clone)]
pub struct LikeLedger {
    post_id: PostId,
    viewer: Option<UserId>,
    likes: HashMap<LikeId, UserId>,
    removed: HashSet<LikeId>,
    intent: Option<Intent>,
}

impl LikeLedger {
    #[must_use]
    pub fn new(post_id: PostId, viewer: Option<UserId>) -> Self {
        Self {
            post_id,
            viewer,
            likes: HashMap::new(),
            removed: HashSet::new(),
            intent: None,
        }
    }

    /// Seed from a fetched feed row.
    #[must_use]
    pub fn from_post(post: &Post, viewer: Option<UserId>) -> Self {
        let mut ledger = Self::new(post.id.clone(), viewer);
        ledger.reseed(post.likes.iter().cloned());
        ledger
    }

    #[must_use]
    pub const fn post_id(&self) -> &PostId {
        &self.post_id
    }

    /// Replace confirmed likes with a fresh fetch. Any pending toggle is kept.
    pub fn reseed(&mut self, likes: impl IntoIterator<Item = PostLike>) {
        self.likes = likes
            .into_iter()
            .map(|like| (like.id, like.user_id))
            .collect();
        self.removed.retain(|id| !self.likes.contains_key(id));
    }

    /// Count as rendered, pending toggle included.
    #[must_use]
    pub fn count(&self) -> usize {
        let confirmed = self.likes.len();
        match self.intent {
            Some(Intent { liked: true, .. }) if !self.viewer_confirmed() => confirmed + 1,
            Some(Intent { liked: false, .. }) => {
                confirmed.saturating_sub(self.viewer_like_ids().count())
            }
            _ => confirmed,
        }
    }

    /// Heart state as rendered.
    #[must_use]
    pub fn is_liked(&self) -> bool {
        self.intent
            .map_or_else(|| self.viewer_confirmed(), |intent| intent.liked)
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.intent.is_some()
    }

    /// Flip the heart locally and return the mutation to send. A newer toggle
    /// supersedes an in-flight one.
    pub fn toggle(&mut self) -> Result<LikeRequest> {
        if self.viewer.is_none() {
            return Err(Error::Unauthorized);
        }
        let liked = !self.is_liked();
        let token = TempId::new();
        self.intent = Some(Intent { token, liked });
        Ok(LikeRequest {
            token,
            post_id: self.post_id.clone(),
            action: if liked {
                LikeAction::Like
            } else {
                LikeAction::Unlike
            },
        })
    }

    /// Apply the answer to the toggle identified by `token`.
    ///
    /// Returns `false` when the toggle had already been superseded; a
    /// successful answer still updates the confirmed likes in that case.
    pub fn complete(&mut self, token: TempId, result: Result<LikeResult>) -> bool {
        let current = self.intent.is_some_and(|intent| intent.token == token);
        if current {
            self.intent = None;
        }
        match result {
            Ok(LikeResult::Liked(like)) => {
                self.apply_insert(like);
            }
            Ok(LikeResult::Unliked(ids)) => {
                // Only the rows the delete removed; a newer like may exist.
                for id in &ids {
                    self.apply_delete(id);
                }
            }
            Err(err) => {
                tracing::warn!(post_id = %self.post_id, error = %err, "like toggle failed");
            }
        }
        current
    }

    /// Apply a `post_likes` insert from the change feed.
    pub fn apply_insert(&mut self, like: PostLike) -> bool {
        if self.removed.contains(&like.id) || self.likes.contains_key(&like.id) {
            return false;
        }
        self.likes.insert(like.id, like.user_id);
        true
    }

    /// Apply a `post_likes` delete from the change feed. Unknown ids only
    /// leave a tombstone.
    pub fn apply_delete(&mut self, id: &LikeId) -> bool {
        self.removed.insert(id.clone());
        self.likes.remove(id).is_some()
    }

    fn viewer_like_ids(&self) -> impl Iterator<Item = &LikeId> {
        self.likes
            .iter()
            .filter(|(_, user)| Some(*user) == self.viewer.as_ref())
            .map(|(id, _)| id)
    }

    fn viewer_confirmed(&self) -> bool {
        self.viewer_like_ids().next().is_some()
    }
}
