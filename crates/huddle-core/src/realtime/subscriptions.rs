//! Reference-counted channel subscriptions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use super::event::{ChangeEvent, ChangeFilter};
use super::ChannelTransport;
use crate::error::Result;

/// What a subscriber receives.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionEvent {
    Change(ChangeEvent),
    /// The subscriber fell behind and this many events were dropped; the
    /// view should refetch.
    Missed(u64),
    /// The channel is gone; no more events will arrive.
    Closed,
}

struct Slot {
    sender: broadcast::Sender<ChangeEvent>,
    refs: usize,
}

struct Registry<T> {
    transport: T,
    capacity: usize,
    slots: Mutex<HashMap<String, Slot>>,
}

trait Release: Send + Sync {
    fn release(&self, topic: &str);
}

impl<T: ChannelTransport> Registry<T> {
    fn slots(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: ChannelTransport> Release for Registry<T> {
    fn release(&self, topic: &str) {
        let mut slots = self.slots();
        let Some(slot) = slots.get_mut(topic) else {
            return;
        };
        slot.refs = slot.refs.saturating_sub(1);
        if slot.refs > 0 {
            return;
        }
        slots.remove(topic);

        // Leave under the lock so a concurrent subscribe to the same topic
        // can only join after it.
        tracing::debug!(%topic, "Last subscriber gone, leaving channel");
        if let Err(error) = self.transport.leave(topic) {
            tracing::warn!(%topic, "Failed to leave channel: {}", error);
        }
        drop(slots);
    }
}

/// One channel per resource topic, shared by every subscriber.
///
/// The first subscription to a topic joins the server channel; dropping the
/// last one leaves it.
pub struct SubscriptionManager<T: ChannelTransport> {
    registry: Arc<Registry<T>>,
}

impl<T: ChannelTransport> Clone for SubscriptionManager<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T: ChannelTransport> SubscriptionManager<T> {
    pub fn new(transport: T, capacity: usize) -> Self {
        Self {
            registry: Arc::new(Registry {
                transport,
                capacity: capacity.max(1),
                slots: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn transport(&self) -> &T {
        &self.registry.transport
    }

    pub fn subscribe(&self, filter: &ChangeFilter) -> Result<Subscription> {
        let topic = filter.topic();
        let mut slots = self.registry.slots();

        let receiver = if let Some(slot) = slots.get_mut(&topic) {
            slot.refs += 1;
            slot.sender.subscribe()
        } else {
            let (sender, receiver) = broadcast::channel(self.registry.capacity);
            self.registry
                .transport
                .join(&topic, filter, sender.clone())?;
            tracing::debug!(%topic, "Joined channel");
            slots.insert(topic.clone(), Slot { sender, refs: 1 });
            receiver
        };
        drop(slots);

        let owner: Arc<dyn Release> = self.registry.clone();
        Ok(Subscription {
            topic,
            receiver,
            owner,
        })
    }

    /// Topics with at least one live subscriber.
    pub fn active_topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.registry.slots().keys().cloned().collect();
        topics.sort();
        topics
    }

    pub fn ref_count(&self, topic: &str) -> usize {
        self.registry.slots().get(topic).map_or(0, |slot| slot.refs)
    }
}

/// Receiving end of a shared channel. Dropping it releases the channel.
pub struct Subscription {
    topic: String,
    receiver: broadcast::Receiver<ChangeEvent>,
    owner: Arc<dyn Release>,
}

impl Subscription {
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub async fn recv(&mut self) -> SubscriptionEvent {
        match self.receiver.recv().await {
            Ok(event) => SubscriptionEvent::Change(event),
            Err(RecvError::Lagged(missed)) => {
                tracing::warn!(topic = %self.topic, missed, "Subscriber lagged");
                SubscriptionEvent::Missed(missed)
            }
            Err(RecvError::Closed) => SubscriptionEvent::Closed,
        }
    }

    /// Next buffered event, if any.
    pub fn try_recv(&mut self) -> Option<SubscriptionEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(SubscriptionEvent::Change(event)),
            Err(TryRecvError::Lagged(missed)) => Some(SubscriptionEvent::Missed(missed)),
            Err(TryRecvError::Closed) => Some(SubscriptionEvent::Closed),
            Err(TryRecvError::Empty) => None,
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.owner.release(&self.topic);
    }
}
