//! Unread and pending-request badges

use serde::Deserialize;

use super::{IdRow, LiveView, ViewEffect, ViewUpdate};
use crate::error::Result;
use crate::models::{NotificationId, UserId};
use crate::realtime::{ChangeEvent, ChangeFilter, ChangeKind};
use crate::reconcile::IdTally;

#[derive(Debug, Deserialize)]
struct ReadFlag {
    id: NotificationId,
    #[serde(default)]
    read: bool,
}

/// Unread notification count: the server count plus notifications inserted
/// since, each counted once.
#[derive(Debug, Clone)]
pub struct NotificationBadge {
    viewer: UserId,
    unread: IdTally<NotificationId>,
}

impl NotificationBadge {
    #[must_use]
    pub fn new(viewer: UserId, unread_count: usize) -> Self {
        Self {
            viewer,
            unread: IdTally::from_count(unread_count),
        }
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.unread.count()
    }

    /// Clear the badge without waiting for the server.
    pub fn mark_all_read_locally(&mut self) {
        self.unread.reset_to(0);
    }

    /// Adopt a freshly fetched unread count.
    pub fn refresh(&mut self, unread_count: usize) {
        self.unread.reset_to(unread_count);
    }
}

impl LiveView for NotificationBadge {
    fn filters(&self) -> Vec<ChangeFilter> {
        vec![ChangeFilter::table("notifications").eq("user_id", &self.viewer)]
    }

    fn apply_change(&mut self, event: &ChangeEvent) -> Result<ViewUpdate> {
        if event.table != "notifications" {
            return Ok(ViewUpdate::unchanged());
        }
        let changed = match event.kind {
            ChangeKind::Insert => {
                let row: ReadFlag = event.record_as()?;
                !row.read && self.unread.insert(row.id)
            }
            ChangeKind::Update => {
                let row: ReadFlag = event.record_as()?;
                row.read && self.unread.remove(&row.id)
            }
            ChangeKind::Delete => {
                let row: IdRow<NotificationId> = event.old_record_as()?;
                self.unread.remove(&row.id)
            }
        };
        Ok(ViewUpdate::changed(changed))
    }
}

/// A count that cannot be maintained from events alone. Any change on the
/// watched table marks it stale until the caller refetches.
#[derive(Debug, Clone)]
pub struct StaleBadge {
    filter: ChangeFilter,
    count: usize,
    stale: bool,
}

impl StaleBadge {
    /// Conversations holding unread messages.
    #[must_use]
    pub fn unread_conversations() -> Self {
        Self::watching(ChangeFilter::table("messages"))
    }

    /// Pending friend requests addressed to `viewer`.
    #[must_use]
    pub fn friend_requests(viewer: &UserId) -> Self {
        Self::watching(ChangeFilter::table("friend_requests").eq("addressee_id", viewer))
    }

    fn watching(filter: ChangeFilter) -> Self {
        Self {
            filter,
            count: 0,
            stale: true,
        }
    }

    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    #[must_use]
    pub const fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn set_count(&mut self, count: usize) {
        self.count = count;
        self.stale = false;
    }
}

impl LiveView for StaleBadge {
    fn filters(&self) -> Vec<ChangeFilter> {
        vec![self.filter.clone()]
    }

    fn apply_change(&mut self, event: &ChangeEvent) -> Result<ViewUpdate> {
        if event.table != self.filter.table {
            return Ok(ViewUpdate::unchanged());
        }
        self.stale = true;
        Ok(ViewUpdate::effect(ViewEffect::RefreshCount))
    }
}
