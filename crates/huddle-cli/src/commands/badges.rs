use huddle_core::realtime::SubscriptionEvent;
use huddle_core::views::{LiveView, NotificationBadge, StaleBadge, ViewEffect, ViewUpdate};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::commands::common::{open_session, print_json, Session};
use crate::commands::live::{describe_state, handle_event, LiveChannels, ReloadRetry};
use crate::error::CliError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BadgeKind {
    Notifications,
    Conversations,
    FriendRequests,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct BadgeCounts {
    pub unread_notifications: usize,
    pub unread_conversations: usize,
    pub pending_friend_requests: usize,
}

struct Badges {
    notifications: NotificationBadge,
    conversations: StaleBadge,
    friend_requests: StaleBadge,
}

impl Badges {
    fn counts(&self) -> BadgeCounts {
        BadgeCounts {
            unread_notifications: self.notifications.count(),
            unread_conversations: self.conversations.count(),
            pending_friend_requests: self.friend_requests.count(),
        }
    }

    fn view_mut(&mut self, kind: BadgeKind) -> &mut dyn LiveView {
        match kind {
            BadgeKind::Notifications => &mut self.notifications,
            BadgeKind::Conversations => &mut self.conversations,
            BadgeKind::FriendRequests => &mut self.friend_requests,
        }
    }

    async fn refresh(&mut self, session: &Session, kind: BadgeKind) -> Result<(), CliError> {
        let services = &session.services;
        match kind {
            BadgeKind::Notifications => self
                .notifications
                .refresh(services.notifications.unread_count().await?),
            BadgeKind::Conversations => self
                .conversations
                .set_count(services.chat.unread_conversation_count().await?),
            BadgeKind::FriendRequests => self
                .friend_requests
                .set_count(services.friends.pending_request_count().await?),
        }
        Ok(())
    }

    async fn refresh_all(&mut self, session: &Session) -> Result<(), CliError> {
        for kind in [
            BadgeKind::Notifications,
            BadgeKind::Conversations,
            BadgeKind::FriendRequests,
        ] {
            self.refresh(session, kind).await?;
        }
        Ok(())
    }
}

pub async fn run_badges(
    watch: bool,
    global_profile: Option<&str>,
    as_json: bool,
) -> Result<(), CliError> {
    let session = open_session(global_profile, true).await?;
    let viewer = session.viewer()?.clone();
    let mut badges = Badges {
        notifications: NotificationBadge::new(viewer.clone(), 0),
        conversations: StaleBadge::unread_conversations(),
        friend_requests: StaleBadge::friend_requests(&viewer),
    };
    badges.refresh_all(&session).await?;
    print_counts(&badges.counts(), as_json)?;

    if watch {
        watch_badges(&session, &mut badges, as_json).await?;
    }
    Ok(())
}

async fn watch_badges(
    session: &Session,
    badges: &mut Badges,
    as_json: bool,
) -> Result<(), CliError> {
    let mut live = LiveChannels::connect(session)?;
    let (sink, mut events) = mpsc::unbounded_channel::<(BadgeKind, SubscriptionEvent)>();
    for kind in [
        BadgeKind::Notifications,
        BadgeKind::Conversations,
        BadgeKind::FriendRequests,
    ] {
        let filters = badges.view_mut(kind).filters();
        live.forward(&filters, kind, &sink)?;
    }
    let mut state = live.state();
    let mut previous = *state.borrow();
    let mut retry = ReloadRetry::default();

    loop {
        tokio::select! {
            Some((kind, event)) = events.recv() => {
                let update = handle_event(badges.view_mut(kind), event);
                if apply_update(session, badges, kind, update, &mut retry).await {
                    print_counts(&badges.counts(), as_json)?;
                }
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *state.borrow_and_update();
                eprintln!("[{}]", describe_state(current));
                let update = retry.on_connection(
                    badges.notifications.connection_changed(previous, current),
                    current,
                );
                previous = current;
                if apply_update(session, badges, BadgeKind::Notifications, update, &mut retry).await {
                    print_counts(&badges.counts(), as_json)?;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
            else => break,
        }
    }

    live.shutdown().await;
    Ok(())
}

/// Run the effects of one update. Returns whether any count may have moved.
/// A failed refresh leaves every badge to be refetched on the next connect.
async fn apply_update(
    session: &Session,
    badges: &mut Badges,
    kind: BadgeKind,
    update: ViewUpdate,
    retry: &mut ReloadRetry,
) -> bool {
    let mut changed = update.changed;
    for effect in update.effects {
        let refreshed = match effect {
            ViewEffect::RefreshCount => badges.refresh(session, kind).await,
            ViewEffect::Reload => badges.refresh_all(session).await.map(|()| retry.succeeded()),
            ViewEffect::MarkRead(_) | ViewEffect::FetchProfile(_) => continue,
        };
        match refreshed {
            Ok(()) => changed = true,
            Err(error) => retry.failed(&error),
        }
    }
    changed
}

fn print_counts(counts: &BadgeCounts, as_json: bool) -> Result<(), CliError> {
    if as_json {
        println!("{}", serde_json::to_string(counts)?);
        return Ok(());
    }
    println!("{}", format_counts(counts));
    Ok(())
}

pub fn format_counts(counts: &BadgeCounts) -> String {
    format!(
        "notifications: {}  conversations: {}  friend requests: {}",
        counts.unread_notifications, counts.unread_conversations, counts.pending_friend_requests
    )
}
