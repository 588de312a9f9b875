//! Per-connection subscription manager.
//!
//! Tracks which service names a WebSocket client is subscribed to and
//! provides server-side event filtering.

use std::collections::BTreeSet;

/// Wildcard service name matching every service.
pub const WILDCARD: &str = "*";

/// Manages the set of service subscriptions for a single WebSocket connection.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    /// Subscribed service names. Ignored while `subscribe_all` is set.
    services: BTreeSet<String>,
    /// Whether the client subscribes to every service (`"*"`).
    subscribe_all: bool,
}

impl SubscriptionManager {
    /// Creates a new empty subscription manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds service names to the subscription set. `"*"` enables the wildcard.
    pub fn subscribe(&mut self, services: &[String]) {
        for name in services {
            if name == WILDCARD {
                self.subscribe_all = true;
            } else {
                self.services.insert(name.clone());
            }
        }
    }

    /// Removes service names from the subscription set. `"*"` clears the
    /// wildcard.
    pub fn unsubscribe(&mut self, services: &[String]) {
        for name in services {
            if name == WILDCARD {
                self.subscribe_all = false;
            } else {
                self.services.remove(name);
            }
        }
    }

    /// Returns `true` if events for `service_name` should be forwarded.
    #[must_use]
    pub fn matches(&self, service_name: &str) -> bool {
        self.subscribe_all || self.services.contains(service_name)
    }

    /// Explicitly subscribed service names, sorted.
    #[must_use]
    pub fn services(&self) -> Vec<String> {
        self.services.iter().cloned().collect()
    }

    /// Returns the number of explicitly subscribed services.
    #[must_use]
    pub fn count(&self) -> usize {
        self.services.len()
    }

    /// Returns `true` if the wildcard subscription is active.
    #[must_use]
    pub fn is_subscribed_all(&self) -> bool {
        self.subscribe_all
    }
}
