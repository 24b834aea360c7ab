//! Broadcast channel for domain events.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. Check-ins, code
//! issuance and policy changes publish a [`CheckInEvent`] through the bus,
//! and every live-feed WebSocket connection subscribes to it.

use tokio::sync::broadcast;

use super::CheckInEvent;

/// Fan-out of [`CheckInEvent`]s to live-feed connections.
///
/// Capacity comes from `EVENT_BUS_CAPACITY` (default 10 000). A connection
/// that falls further behind than that loses the oldest events and is told
/// how many it missed.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CheckInEvent>,
}

impl EventBus {
    /// Creates a bus holding up to `capacity` undelivered events (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes `event`, returning how many connections will see it.
    ///
    /// Nobody listening is normal; the event is then discarded.
    pub fn publish(&self, event: CheckInEvent) -> usize {
        let kind = event.event_type_str();
        let event_id = event.event_id();
        let delivered = self.sender.send(event).unwrap_or(0);
        tracing::trace!(kind, %event_id, delivered, "domain event published");
        delivered
    }

    /// Receiver for every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CheckInEvent> {
        self.sender.subscribe()
    }

    /// Number of open live-feed receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
