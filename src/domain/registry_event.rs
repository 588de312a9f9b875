//! Domain events reflecting service-map mutations.
//!
//! Every change to the map emits a [`RegistryEvent`] through the
//! [`super::EventBus`]. Events are broadcast to WebSocket subscribers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::SessionId;
use super::kv::KvMap;

/// Why an entry left the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    /// The owning session closed.
    Closed,
    /// No status update arrived within the TTL.
    Expired,
}

/// Domain event emitted after every service-map mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum RegistryEvent {
    /// Emitted when a daemon registers.
    ServiceRegistered {
        /// Service name.
        service_name: String,
        /// Instance name.
        instance_name: String,
        /// Registering session.
        session_id: SessionId,
        /// Registration metadata.
        metadata: KvMap,
        /// Service-map epoch after the change.
        epoch: u64,
        /// Registration timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when a daemon pushes a new status blob.
    StatusUpdated {
        /// Service name.
        service_name: String,
        /// Instance name.
        instance_name: String,
        /// The new status, in full.
        status: KvMap,
        /// Service-map epoch after the change.
        epoch: u64,
        /// Update timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when an entry is removed by close or expiry.
    ServiceRemoved {
        /// Service name.
        service_name: String,
        /// Instance name.
        instance_name: String,
        /// Close or expiry.
        reason: RemovalReason,
        /// Service-map epoch after the change.
        epoch: u64,
        /// Removal timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl RegistryEvent {
    /// Returns the service name the event concerns.
    #[must_use]
    pub fn service_name(&self) -> &str {
        match self {
            Self::ServiceRegistered { service_name, .. }
            | Self::StatusUpdated { service_name, .. }
            | Self::ServiceRemoved { service_name, .. } => service_name,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::ServiceRegistered { .. } => "service_registered",
            Self::StatusUpdated { .. } => "status_updated",
            Self::ServiceRemoved { .. } => "service_removed",
        }
    }
}
