//! Realtime plumbing shared by the watching commands.

use huddle_core::config::RealtimeSettings;
use huddle_core::realtime::{
    ChangeFilter, RealtimeSocket, SocketHandle, SubscriptionEvent, SubscriptionManager,
};
use huddle_core::views::{LiveView, ViewEffect, ViewUpdate};
use huddle_core::ConnectionState;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::commands::common::Session;
use crate::error::CliError;

/// One socket plus the subscriptions a command listens on.
pub struct LiveChannels {
    socket: RealtimeSocket,
    manager: SubscriptionManager<SocketHandle>,
    forwarders: Vec<JoinHandle<()>>,
}

impl LiveChannels {
    pub fn connect(session: &Session) -> Result<Self, CliError> {
        if !session.config.realtime_enabled {
            return Err(CliError::RealtimeDisabled(session.profile_name.clone()));
        }

        let settings = RealtimeSettings::default();
        let capacity = settings.channel_capacity;
        let socket = RealtimeSocket::connect(&session.config, settings, session.access_token())?;
        let manager = SubscriptionManager::new(socket.handle(), capacity);
        Ok(Self {
            socket,
            manager,
            forwarders: Vec::new(),
        })
    }

    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.socket.state()
    }

    /// Subscribe to `filters` and forward everything they deliver into
    /// `sink`, tagged with `key`.
    pub fn forward<K>(
        &mut self,
        filters: &[ChangeFilter],
        key: K,
        sink: &mpsc::UnboundedSender<(K, SubscriptionEvent)>,
    ) -> Result<(), CliError>
    where
        K: Copy + Send + 'static,
    {
        for filter in filters {
            let mut subscription = self.manager.subscribe(filter)?;
            let sink = sink.clone();
            self.forwarders.push(tokio::spawn(async move {
                loop {
                    let event = subscription.recv().await;
                    let closed = event == SubscriptionEvent::Closed;
                    if sink.send((key, event)).is_err() || closed {
                        break;
                    }
                }
            }));
        }
        Ok(())
    }

    pub async fn shutdown(self) {
        for forwarder in &self.forwarders {
            forwarder.abort();
        }
        drop(self.manager);
        self.socket.shutdown().await;
    }
}

pub fn describe_state(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Connecting => "connecting",
        ConnectionState::Connected => "live",
        ConnectionState::Reconnecting => "reconnecting, catching up when back",
        ConnectionState::Closed => "disconnected",
    }
}

/// Feed one delivery into `view`. A record that does not decode is logged
/// and skipped; the session keeps running on slightly stale state.
pub fn handle_event(view: &mut dyn LiveView, event: SubscriptionEvent) -> ViewUpdate {
    view.handle(event).unwrap_or_else(|error| {
        tracing::warn!("Skipping realtime event: {}", error);
        ViewUpdate::unchanged()
    })
}

/// Remembers a refetch that failed so it is tried again once the socket is
/// live.
#[derive(Debug, Default)]
pub struct ReloadRetry {
    owed: bool,
}

impl ReloadRetry {
    pub fn failed(&mut self, error: &CliError) {
        tracing::warn!("Refetch failed, retrying when connected: {}", error);
        self.owed = true;
    }

    pub fn succeeded(&mut self) {
        self.owed = false;
    }

    /// Add the owed reload to the update for a connection change.
    pub fn on_connection(&self, update: ViewUpdate, current: ConnectionState) -> ViewUpdate {
        if self.owed && current.is_live() && !update.effects.contains(&ViewEffect::Reload) {
            update.with(ViewEffect::Reload)
        } else {
            update
        }
    }
}
