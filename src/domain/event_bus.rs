//! Broadcast channel for registry events.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. Every map
//! mutation publishes a [`RegistryEvent`] through the bus, and all
//! WebSocket connections subscribe to receive filtered events.

use chrono::Utc;
use tokio::sync::broadcast;

use super::{RegistryEvent, RemovalReason, Removed};

/// Broadcast bus for [`RegistryEvent`]s.
///
/// Backed by a `tokio::broadcast` channel with a configurable capacity
/// (default 10 000, never below 1). Receivers that fall more than
/// `capacity` events behind lose the oldest ones.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<RegistryEvent>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of receivers that got it; zero when nobody
    /// listens.
    pub fn publish(&self, event: RegistryEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Publishes one `ServiceRemoved` per key of a removal batch, in the
    /// batch's registration order. All events carry the batch epoch.
    pub fn publish_removals(&self, removed: &Removed, reason: RemovalReason) {
        let timestamp = Utc::now();
        for key in &removed.keys {
            let _ = self.publish(RegistryEvent::ServiceRemoved {
                service_name: key.service_name().to_string(),
                instance_name: key.instance_name().to_string(),
                reason,
                epoch: removed.epoch,
                timestamp,
            });
        }
    }

    /// Creates a new receiver that will receive all future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
