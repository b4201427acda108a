//! Per-call-site view state.
//!
//! Views are plain state machines: the caller runs the network calls and
//! feeds responses and change events back in. Each view tells the caller
//! what to do next through [`ViewEffect`]s.

mod badges;
mod chat;
mod comments;
mod feed;
mod post_card;

use serde::Deserialize;

use crate::error::Result;
use crate::models::{ConversationId, UserId};
use crate::realtime::{ChangeEvent, ChangeFilter, SubscriptionEvent};
use crate::state::ConnectionState;

pub use badges::{NotificationBadge, StaleBadge};
pub use chat::ChatView;
pub use comments::CommentThread;
pub use feed::FeedPager;
pub use post_card::PostCard;

/// Follow-up work a view asks its caller to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEffect {
    /// Incoming messages were rendered in an open conversation
    MarkRead(ConversationId),
    /// A row arrived without its author's profile
    FetchProfile(UserId),
    /// Events may have been missed; refetch the view's data
    Reload,
    /// The authoritative count behind a badge changed
    RefreshCount,
}

/// What applying an event did to a view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewUpdate {
    /// Whether the rendered state changed
    pub changed: bool,
    pub effects: Vec<ViewEffect>,
}

impl ViewUpdate {
    #[must_use]
    pub fn unchanged() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn changed(changed: bool) -> Self {
        Self {
            changed,
            effects: Vec::new(),
        }
    }

    #[must_use]
    pub fn effect(effect: ViewEffect) -> Self {
        Self {
            changed: false,
            effects: vec![effect],
        }
    }

    #[must_use]
    pub fn with(mut self, effect: ViewEffect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Result of feeding a mutation response into a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The response was merged
    Applied,
    /// A newer local action replaced this one; confirmed state was still
    /// updated
    Superseded,
    /// The mutation failed and was rolled back or flagged
    Failed { draft_restored: bool },
    /// A toggle failed and the local state went back to the confirmed one;
    /// there is no input to restore
    Reverted,
    /// The view was closed before the response arrived; nothing changed
    Closed,
}

/// Text handed to the caller to send, tagged with its placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub temp_id: crate::models::TempId,
    pub content: String,
}

/// A view kept current by realtime channels.
pub trait LiveView {
    /// Channels the view listens on
    fn filters(&self) -> Vec<ChangeFilter>;

    /// Merge one authoritative change.
    fn apply_change(&mut self, event: &ChangeEvent) -> Result<ViewUpdate>;

    /// Merge whatever a subscription delivered.
    fn handle(&mut self, event: SubscriptionEvent) -> Result<ViewUpdate> {
        match event {
            SubscriptionEvent::Change(change) => self.apply_change(&change),
            SubscriptionEvent::Missed(count) => {
                tracing::warn!(count, "Subscriber lagged, refetch needed");
                Ok(ViewUpdate::effect(ViewEffect::Reload))
            }
            SubscriptionEvent::Closed => Ok(ViewUpdate::unchanged()),
        }
    }

    /// React to the socket's connection state. Coming back online after a
    /// drop means events were lost.
    fn connection_changed(
        &mut self,
        previous: ConnectionState,
        current: ConnectionState,
    ) -> ViewUpdate {
        if current.is_live() && previous == ConnectionState::Reconnecting {
            ViewUpdate::effect(ViewEffect::Reload)
        } else {
            ViewUpdate::unchanged()
        }
    }
}

/// Just the primary key of a row, which is all a delete event carries.
#[derive(Debug, Deserialize)]
pub(crate) struct IdRow<I> {
    pub id: I,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::realtime::ChangeKind;
    use serde_json::Value;

    pub(crate) fn change(table: &str, kind: ChangeKind, record: Value) -> ChangeEvent {
        let (record, old_record) = match kind {
            ChangeKind::Delete => (Value::Null, record),
            ChangeKind::Insert | ChangeKind::Update => (record, Value::Null),
        };
        ChangeEvent {
            schema: "public".to_string(),
            table: table.to_string(),
            kind,
            record,
            old_record,
            commit_timestamp: None,
        }
    }

    struct Probe;

    impl LiveView for Probe {
        fn filters(&self) -> Vec<ChangeFilter> {
            Vec::new()
        }

        fn apply_change(&mut self, _event: &ChangeEvent) -> Result<ViewUpdate> {
            Ok(ViewUpdate::changed(true))
        }
    }

    #[test]
    fn missed_events_and_reconnects_ask_for_reload() {
        let mut probe = Probe;
        assert_eq!(
            probe.handle(SubscriptionEvent::Missed(3)).unwrap(),
            ViewUpdate::effect(ViewEffect::Reload)
        );
        assert_eq!(
            probe.handle(SubscriptionEvent::Closed).unwrap(),
            ViewUpdate::unchanged()
        );
        assert_eq!(
            probe.connection_changed(ConnectionState::Reconnecting, ConnectionState::Connected),
            ViewUpdate::effect(ViewEffect::Reload)
        );
        assert_eq!(
            probe.connection_changed(ConnectionState::Connecting, ConnectionState::Connected),
            ViewUpdate::unchanged()
        );
    }
}
