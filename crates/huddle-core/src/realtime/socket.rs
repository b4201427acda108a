//! Websocket client for the realtime service.

use std::collections::HashMap;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::event::{ChangeEvent, ChangeFilter};
use super::protocol::{self, InboundFrame, PhoenixMessage, PHOENIX_TOPIC};
use super::ChannelTransport;
use crate::config::{ClientConfig, RealtimeSettings};
use crate::error::{Error, Result};
use crate::state::ConnectionState;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

enum SocketCommand {
    Join {
        topic: String,
        filter: ChangeFilter,
        sink: broadcast::Sender<ChangeEvent>,
    },
    Leave {
        topic: String,
    },
    SetAccessToken(Option<String>),
    Shutdown,
}

/// Cloneable sender side of a running socket.
#[derive(Clone)]
pub struct SocketHandle {
    commands: mpsc::UnboundedSender<SocketCommand>,
}

impl SocketHandle {
    /// Use a refreshed JWT for joined and future channels.
    pub fn set_access_token(&self, token: Option<String>) -> Result<()> {
        self.send(SocketCommand::SetAccessToken(token))
    }

    fn send(&self, command: SocketCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| Error::Realtime("realtime socket is closed".to_string()))
    }
}

impl ChannelTransport for SocketHandle {
    fn join(
        &self,
        topic: &str,
        filter: &ChangeFilter,
        sink: broadcast::Sender<ChangeEvent>,
    ) -> Result<()> {
        self.send(SocketCommand::Join {
            topic: topic.to_string(),
            filter: filter.clone(),
            sink,
        })
    }

    fn leave(&self, topic: &str) -> Result<()> {
        self.send(SocketCommand::Leave {
            topic: topic.to_string(),
        })
    }
}

/// Background connection to the realtime service.
///
/// Reconnects on its own and rejoins every channel; events published while
/// disconnected are lost, which observers learn from [`Self::state`].
pub struct RealtimeSocket {
    handle: SocketHandle,
    state: watch::Receiver<ConnectionState>,
    task: Option<JoinHandle<()>>,
}

impl RealtimeSocket {
    /// Spawn the connection task. Must be called inside a tokio runtime.
    pub fn connect(
        config: &ClientConfig,
        settings: RealtimeSettings,
        access_token: Option<String>,
    ) -> Result<Self> {
        let url = config.realtime_url()?;
        let (commands, receiver) = mpsc::unbounded_channel();
        let (state_sender, state) = watch::channel(ConnectionState::Connecting);

        let driver = Driver {
            url,
            settings,
            access_token,
            channels: HashMap::new(),
            commands: receiver,
            state: state_sender,
            next_ref: 0,
        };
        let task = tokio::spawn(driver.run());

        Ok(Self {
            handle: SocketHandle { commands },
            state,
            task: Some(task),
        })
    }

    #[must_use]
    pub fn handle(&self) -> SocketHandle {
        self.handle.clone()
    }

    /// Connection state updates.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Close the websocket and wait for the task to finish.
    pub async fn shutdown(mut self) {
        let _ = self.handle.send(SocketCommand::Shutdown);
        if let Some(task) = self.task.take() {
            if let Err(error) = task.await {
                tracing::warn!("Realtime task ended abnormally: {}", error);
            }
        }
    }
}

impl Drop for RealtimeSocket {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.handle.send(SocketCommand::Shutdown);
        }
    }
}

struct Channel {
    filter: ChangeFilter,
    sink: broadcast::Sender<ChangeEvent>,
}

enum SessionEnd {
    Shutdown,
    Dropped,
}

struct Driver {
    url: String,
    settings: RealtimeSettings,
    access_token: Option<String>,
    channels: HashMap<String, Channel>,
    commands: mpsc::UnboundedReceiver<SocketCommand>,
    state: watch::Sender<ConnectionState>,
    next_ref: u64,
}

impl Driver {
    async fn run(mut self) {
        let mut attempt = 0_usize;
        loop {
            match connect_async(self.url.as_str()).await {
                Ok((stream, _)) => {
                    tracing::info!(channels = self.channels.len(), "Realtime connected");
                    attempt = 0;
                    if matches!(self.session(stream).await, SessionEnd::Shutdown) {
                        break;
                    }
                }
                Err(error) => tracing::warn!("Realtime connection failed: {}", error),
            }

            self.state.send_replace(ConnectionState::Reconnecting);
            let delay = self.settings.backoff(attempt);
            attempt = attempt.saturating_add(1);
            tracing::info!(?delay, attempt, "Realtime reconnect scheduled");
            if !self.wait_offline(delay).await {
                break;
            }
        }

        self.state.send_replace(ConnectionState::Closed);
        tracing::info!("Realtime socket closed");
    }

    /// Sleep before the next attempt while still tracking channel changes.
    /// Returns `false` on shutdown.
    async fn wait_offline(&mut self, delay: Duration) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                () = &mut sleep => return true,
                command = self.commands.recv() => match command {
                    None | Some(SocketCommand::Shutdown) => return false,
                    Some(SocketCommand::Join { topic, filter, sink }) => {
                        self.channels.insert(topic, Channel { filter, sink });
                    }
                    Some(SocketCommand::Leave { topic }) => {
                        self.channels.remove(&topic);
                    }
                    Some(SocketCommand::SetAccessToken(token)) => self.access_token = token,
                },
            }
        }
    }

    async fn session(&mut self, stream: WsStream) -> SessionEnd {
        let (mut sink, mut source) = stream.split();

        let topics: Vec<String> = self.channels.keys().cloned().collect();
        for topic in topics {
            if !self.send_join(&mut sink, &topic).await {
                return SessionEnd::Dropped;
            }
        }
        self.state.send_replace(ConnectionState::Connected);

        let period = self.settings.heartbeat_interval;
        let mut heartbeat = interval_at(Instant::now() + period, period);
        let mut awaiting_heartbeat: Option<String> = None;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    if awaiting_heartbeat.is_some() {
                        tracing::warn!("Realtime heartbeat timed out");
                        return SessionEnd::Dropped;
                    }
                    let msg_ref = self.next_ref();
                    if !send_frame(&mut sink, &PhoenixMessage::heartbeat(msg_ref.clone())).await {
                        return SessionEnd::Dropped;
                    }
                    awaiting_heartbeat = Some(msg_ref);
                }
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        let _ = sink.send(Message::Close(None)).await;
                        return SessionEnd::Shutdown;
                    };
                    if let Some(end) = self.apply_online(&mut sink, command).await {
                        return end;
                    }
                }
                frame = source.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(topic) = self.handle_text(&text, &mut awaiting_heartbeat) {
                            if !self.send_join(&mut sink, &topic).await {
                                return SessionEnd::Dropped;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!("Realtime connection closed by server");
                        return SessionEnd::Dropped;
                    }
                    Some(Err(error)) => {
                        tracing::warn!("Realtime read failed: {}", error);
                        return SessionEnd::Dropped;
                    }
                    Some(Ok(_)) => {}
                },
            }
        }
    }

    async fn apply_online(&mut self, sink: &mut WsSink, command: SocketCommand) -> Option<SessionEnd> {
        match command {
            SocketCommand::Join { topic, filter, sink: events } => {
                self.channels.insert(
                    topic.clone(),
                    Channel {
                        filter,
                        sink: events,
                    },
                );
                if !self.send_join(sink, &topic).await {
                    return Some(SessionEnd::Dropped);
                }
            }
            SocketCommand::Leave { topic } => {
                if self.channels.remove(&topic).is_some() {
                    let frame = PhoenixMessage::leave(&topic, self.next_ref());
                    if !send_frame(sink, &frame).await {
                        return Some(SessionEnd::Dropped);
                    }
                }
            }
            SocketCommand::SetAccessToken(token) => {
                self.access_token = token;
                if let Some(token) = self.access_token.clone() {
                    let topics: Vec<String> = self.channels.keys().cloned().collect();
                    for topic in topics {
                        let frame = PhoenixMessage::access_token(&topic, &token, self.next_ref());
                        if !send_frame(sink, &frame).await {
                            return Some(SessionEnd::Dropped);
                        }
                    }
                }
            }
            SocketCommand::Shutdown => {
                let _ = sink.send(Message::Close(None)).await;
                return Some(SessionEnd::Shutdown);
            }
        }
        None
    }

    /// Handle one text frame. Returns a topic that needs rejoining.
    fn handle_text(&self, text: &str, awaiting_heartbeat: &mut Option<String>) -> Option<String> {
        let frame = match protocol::decode(text) {
            Ok(frame) => frame,
            Err(error) => {
                tracing::debug!("Ignoring undecodable realtime frame: {}", error);
                return None;
            }
        };

        match frame {
            InboundFrame::Change { topic, event } => {
                if let Some(channel) = self.channels.get(&topic) {
                    if channel.filter.matches(&event) {
                        // No receivers just means the leave is still in flight.
                        let _ = channel.sink.send(event);
                    }
                }
            }
            InboundFrame::Reply {
                topic,
                msg_ref,
                ok,
                response,
            } => {
                if topic == PHOENIX_TOPIC {
                    if msg_ref.is_some() && *awaiting_heartbeat == msg_ref {
                        *awaiting_heartbeat = None;
                    }
                } else if ok {
                    tracing::debug!(%topic, "Channel joined");
                } else {
                    tracing::warn!(%topic, %response, "Channel request rejected");
                }
            }
            InboundFrame::ChannelError { topic } => {
                if self.channels.contains_key(&topic) {
                    tracing::warn!(%topic, "Channel errored, rejoining");
                    return Some(topic);
                }
            }
            InboundFrame::ChannelClosed { topic } => {
                tracing::debug!(%topic, "Channel closed");
            }
            InboundFrame::System { topic, ok, message } => {
                if ok {
                    tracing::debug!(%topic, %message, "Channel system message");
                } else {
                    tracing::warn!(%topic, %message, "Channel subscription failed");
                }
            }
            InboundFrame::Other { .. } => {}
        }
        None
    }

    async fn send_join(&mut self, sink: &mut WsSink, topic: &str) -> bool {
        let msg_ref = self.next_ref();
        let Some(channel) = self.channels.get(topic) else {
            return true;
        };
        let frame = PhoenixMessage::join(
            topic,
            &channel.filter,
            self.access_token.as_deref(),
            msg_ref,
        );
        send_frame(sink, &frame).await
    }

    fn next_ref(&mut self) -> String {
        self.next_ref += 1;
        self.next_ref.to_string()
    }
}

async fn send_frame(sink: &mut WsSink, frame: &PhoenixMessage) -> bool {
    let text = match frame.encode() {
        Ok(text) => text,
        Err(error) => {
            tracing::warn!("Failed to encode realtime frame: {}", error);
            return true;
        }
    };
    match sink.send(Message::Text(text.into())).await {
        Ok(()) => true,
        Err(error) => {
            tracing::warn!("Realtime send failed: {}", error);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::ChangeKind;
    use pretty_assertions::assert_eq;

    fn driver() -> (Driver, mpsc::UnboundedSender<SocketCommand>) {
        let (commands, receiver) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(ConnectionState::Connecting);
        let driver = Driver {
            url: "ws://127.0.0.1:9/realtime/v1/websocket".to_string(),
            settings: RealtimeSettings::default(),
            access_token: None,
            channels: HashMap::new(),
            commands: receiver,
            state,
            next_ref: 0,
        };
        (driver, commands)
    }

    fn message_change(topic: &str, conversation_id: &str) -> String {
        serde_json::json!({
            "topic": topic,
            "event": "postgres_changes",
            "ref": null,
            "payload": {
                "data": {
                    "schema": "public",
                    "table": "messages",
                    "commit_timestamp": "2025-03-01T10:15:30.123Z",
                    "type": "INSERT",
                    "record": {"id": "m-1", "conversation_id": conversation_id}
                }
            }
        })
        .to_string()
    }

    #[test]
    fn change_frames_reach_the_matching_channel_only() {
        let (mut driver, _commands) = driver();
        let filter = ChangeFilter::table("messages").eq("conversation_id", "c-1");
        let topic = filter.topic();
        let (sink, mut events) = broadcast::channel(8);
        driver.channels.insert(topic.clone(), Channel { filter, sink });

        let mut awaiting = None;
        assert_eq!(driver.handle_text(&message_change(&topic, "c-1"), &mut awaiting), None);
        assert_eq!(driver.handle_text(&message_change(&topic, "c-2"), &mut awaiting), None);
        assert_eq!(
            driver.handle_text(&message_change("realtime:public:other:*", "c-1"), &mut awaiting),
            None
        );

        let event = events.try_recv().unwrap();
        assert_eq!(event.kind, ChangeKind::Insert);
        assert_eq!(event.record["conversation_id"], "c-1");
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn heartbeat_reply_clears_pending_ref() {
        let (driver, _commands) = driver();
        let mut awaiting = Some("5".to_string());
        let stale = r#"{"topic":"phoenix","event":"phx_reply","ref":"4","payload":{"status":"ok","response":{}}}"#;
        driver.handle_text(stale, &mut awaiting);
        assert_eq!(awaiting.as_deref(), Some("5"));

        let current = r#"{"topic":"phoenix","event":"phx_reply","ref":"5","payload":{"status":"ok","response":{}}}"#;
        driver.handle_text(current, &mut awaiting);
        assert_eq!(awaiting, None);
    }

    #[test]
    fn channel_error_asks_for_rejoin_of_known_topics() {
        let (mut driver, _commands) = driver();
        let filter = ChangeFilter::table("notifications");
        let topic = filter.topic();
        let (sink, _events) = broadcast::channel(8);
        driver.channels.insert(topic.clone(), Channel { filter, sink });

        let mut awaiting = None;
        let errored = format!(r#"{{"topic":"{topic}","event":"phx_error","ref":"2","payload":{{}}}}"#);
        assert_eq!(driver.handle_text(&errored, &mut awaiting), Some(topic));

        let unknown = r#"{"topic":"realtime:gone","event":"phx_error","ref":"3","payload":{}}"#;
        assert_eq!(driver.handle_text(unknown, &mut awaiting), None);
        assert_eq!(driver.handle_text("not json", &mut awaiting), None);
    }

    #[tokio::test(start_paused = true)]
    async fn offline_wait_tracks_channels_until_shutdown() {
        let (mut driver, commands) = driver();
        let filter = ChangeFilter::table("comments").eq("post_id", "p-1");
        let topic = filter.topic();
        let (sink, _events) = broadcast::channel(8);
        commands
            .send(SocketCommand::Join {
                topic: topic.clone(),
                filter,
                sink,
            })
            .unwrap();
        commands
            .send(SocketCommand::SetAccessToken(Some("jwt".to_string())))
            .unwrap();

        assert!(driver.wait_offline(Duration::from_secs(1)).await);
        assert!(driver.channels.contains_key(&topic));
        assert_eq!(driver.access_token.as_deref(), Some("jwt"));

        commands.send(SocketCommand::Leave { topic: topic.clone() }).unwrap();
        commands.send(SocketCommand::Shutdown).unwrap();
        assert!(!driver.wait_offline(Duration::from_secs(10)).await);
        assert!(driver.channels.is_empty());
    }
}
