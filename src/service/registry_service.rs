//! Registry service: session-scoped register / update / close / dump.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::kv::KvMap;
use crate::domain::{
    Clock, EventBus, RegistryEvent, RegistryStore, RemovalReason, ServiceEntry, ServiceKey,
    SessionId, SessionState, SessionTable,
};
use crate::error::RegistryError;

/// Point-in-time view of one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
    /// Session identity.
    pub session_id: SessionId,
    /// Lifecycle state.
    pub state: SessionState,
    /// Live registration, if any.
    pub registration: Option<ServiceKey>,
    /// When the session connected; `None` once disconnected.
    pub connected_at: Option<DateTime<Utc>>,
}

/// Copy of the whole service map.
#[derive(Debug, Clone)]
pub struct ServiceDump {
    /// Service-map epoch the copy was taken at.
    pub epoch: u64,
    /// Live entries in registration order.
    pub entries: Vec<ServiceEntry>,
}

/// Number of live instances of one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSummary {
    /// Service name.
    pub service_name: String,
    /// Live instance count.
    pub instances: usize,
}

/// Orchestration layer for every registry operation.
///
/// Owns the session table and shares the [`RegistryStore`] with the
/// expiry scheduler. Every mutation follows the pattern: lock the session
/// → check preconditions → mutate the store → update the session → emit
/// an event.
#[derive(Debug, Clone)]
pub struct RegistryService {
    store: Arc<RegistryStore>,
    sessions: Arc<SessionTable>,
    event_bus: EventBus,
    clock: Arc<dyn Clock>,
}

impl RegistryService {
    /// Creates a new `RegistryService`.
    #[must_use]
    pub fn new(store: Arc<RegistryStore>, event_bus: EventBus, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            sessions: Arc::new(SessionTable::new()),
            event_bus,
            clock,
        }
    }

    /// Returns a reference to the inner [`EventBus`].
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Returns a reference to the inner [`RegistryStore`].
    #[must_use]
    pub fn store(&self) -> &Arc<RegistryStore> {
        &self.store
    }

    /// Returns the clock used for liveness stamps.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Returns the session table, shared with the expiry scheduler.
    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionTable> {
        &self.sessions
    }

    /// Opens a new session.
    pub async fn connect(&self) -> SessionId {
        let session_id = self.sessions.connect(self.clock.now()).await;
        tracing::debug!(%session_id, "session connected");
        session_id
    }

    /// Registers `service_name/instance_name` on behalf of `session_id`.
    ///
    /// A session owns at most one live registration.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::NotConnected`] if the session is unknown or closed.
    /// - [`RegistryError::InvalidRequest`] if a name is malformed.
    /// - [`RegistryError::AlreadyRegistered`] if the key is still in the map,
    ///   or the session already holds a live registration.
    pub async fn register(
        &self,
        session_id: SessionId,
        service_name: &str,
        instance_name: &str,
        metadata: KvMap,
    ) -> Result<ServiceKey, RegistryError> {
        let handle = self.sessions.get(session_id).await?;
        let mut session = handle.lock().await;
        if !session.is_connected() {
            return Err(RegistryError::NotConnected(session_id));
        }
        let now = self.clock.now();
        session.touch(now);
        let key = ServiceKey::new(service_name, instance_name)?;

        if let Some(existing) = session.registration.clone() {
            if self.store.is_owned_by(&existing, session_id).await {
                return Err(RegistryError::AlreadyRegistered(existing));
            }
            session.clear_registration();
        }

        let epoch = self
            .store
            .insert(key.clone(), session_id, metadata.clone(), now)
            .await?;
        session.mark_registered(key.clone());
        drop(session);

        let _ = self.event_bus.publish(RegistryEvent::ServiceRegistered {
            service_name: key.service_name().to_string(),
            instance_name: key.instance_name().to_string(),
            session_id,
            metadata,
            epoch,
            timestamp: Utc::now(),
        });

        tracing::info!(%key, %session_id, epoch, "service registered");
        Ok(key)
    }

    /// Replaces the status of the session's registration and refreshes
    /// its liveness stamp.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::NotConnected`] if the session is unknown or closed.
    /// - [`RegistryError::NotRegistered`] if the session never registered, or
    ///   its registration has been evicted. In the latter case the session
    ///   drops back to `Connected` and may register again.
    pub async fn update_status(
        &self,
        session_id: SessionId,
        status: KvMap,
    ) -> Result<(), RegistryError> {
        let handle = self.sessions.get(session_id).await?;
        let mut session = handle.lock().await;
        if !session.is_connected() {
            return Err(RegistryError::NotConnected(session_id));
        }
        let now = self.clock.now();
        session.touch(now);
        let Some(key) = session.registration.clone() else {
            return Err(RegistryError::NotRegistered(session_id));
        };

        let epoch = match self
            .store
            .update_owned_status(&key, session_id, status.clone(), now)
            .await
        {
            Ok(epoch) => epoch,
            Err(RegistryError::ServiceNotFound(_)) => {
                session.clear_registration();
                tracing::debug!(%key, %session_id, "status update for evicted registration");
                return Err(RegistryError::NotRegistered(session_id));
            }
            Err(e) => return Err(e),
        };
        drop(session);

        let _ = self.event_bus.publish(RegistryEvent::StatusUpdated {
            service_name: key.service_name().to_string(),
            instance_name: key.instance_name().to_string(),
            status,
            epoch,
            timestamp: Utc::now(),
        });

        tracing::debug!(%key, epoch, "status updated");
        Ok(())
    }

    /// Ends a session and immediately removes everything it registered.
    ///
    /// Closing an unknown or already closed session is a no-op. Returns
    /// the removed keys.
    pub async fn close(&self, session_id: SessionId) -> Vec<ServiceKey> {
        let Some(handle) = self.sessions.remove(session_id).await else {
            return Vec::new();
        };
        let mut session = handle.lock().await;
        session.state = SessionState::Disconnected;
        session.registration = None;

        let removed = self.store.remove_owned_by(session_id).await;
        drop(session);

        self.event_bus.publish_removals(&removed, RemovalReason::Closed);
        for key in &removed.keys {
            tracing::info!(%key, %session_id, "service deregistered on close");
        }
        tracing::debug!(%session_id, "session closed");
        removed.keys
    }

    /// Describes a session. Unknown sessions report `Disconnected`.
    pub async fn session_info(&self, session_id: SessionId) -> SessionInfo {
        let Ok(handle) = self.sessions.get(session_id).await else {
            return SessionInfo {
                session_id,
                state: SessionState::Disconnected,
                registration: None,
                connected_at: None,
            };
        };
        let mut session = handle.lock().await;
        if let Some(key) = session.registration.clone()
            && !self.store.is_owned_by(&key, session_id).await
        {
            session.clear_registration();
        }
        SessionInfo {
            session_id,
            state: session.state,
            registration: session.registration.clone(),
            connected_at: session
                .is_connected()
                .then_some(session.connected_at),
        }
    }

    /// Returns a copy of every live entry with the current epoch.
    pub async fn dump(&self) -> ServiceDump {
        let (epoch, entries) = self.store.snapshot_with_epoch().await;
        ServiceDump { epoch, entries }
    }

    /// Counts live instances per service name, sorted by name.
    pub async fn summary(&self) -> Vec<ServiceSummary> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for entry in self.store.snapshot_all().await {
            *counts
                .entry(entry.key.service_name().to_string())
                .or_default() += 1;
        }
        counts
            .into_iter()
            .map(|(service_name, instances)| ServiceSummary {
                service_name,
                instances,
            })
            .collect()
    }

    /// Returns the number of connected sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.len().await
    }
}
