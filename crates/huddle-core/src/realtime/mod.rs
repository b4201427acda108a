//! Realtime change feed.
//!
//! `RealtimeSocket` owns the websocket and speaks the channel protocol;
//! `SubscriptionManager` shares one channel per resource between every
//! observer of that resource.

mod event;
mod protocol;
mod socket;
mod subscriptions;

use tokio::sync::broadcast;

use crate::error::Result;

pub use event::{ChangeEvent, ChangeFilter, ChangeKind};
pub use protocol::{decode, InboundFrame, PhoenixMessage, PHOENIX_TOPIC};
pub use socket::{RealtimeSocket, SocketHandle};
pub use subscriptions::{Subscription, SubscriptionEvent, SubscriptionManager};

/// Something that can open and close server channels.
pub trait ChannelTransport: Send + Sync + 'static {
    /// Start delivering events selected by `filter` into `sink`.
    fn join(
        &self,
        topic: &str,
        filter: &ChangeFilter,
        sink: broadcast::Sender<ChangeEvent>,
    ) -> Result<()>;

    fn leave(&self, topic: &str) -> Result<()>;
}
