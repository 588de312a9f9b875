//! Client sessions and the registration each one owns.
//!
//! A session moves through `Connected -> Registered -> Disconnected`.
//! The table holds one `Arc<Mutex<SessionRecord>>` per session so that
//! calls on the same session are serialized while different sessions
//! proceed concurrently. Sessions that hold no live registration and stay
//! silent for longer than the TTL are dropped by [`SessionTable::drop_idle`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use utoipa::ToSchema;

use super::{RegistryStore, ServiceKey, SessionId, Timestamp};
use crate::error::RegistryError;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Connected, nothing registered yet (or the registration expired).
    Connected,
    /// Holds a live registration; status updates are accepted.
    Registered,
    /// Closed, or never existed.
    Disconnected,
}

/// Per-session bookkeeping.
#[derive(Debug)]
pub struct SessionRecord {
    /// Session identity.
    pub id: SessionId,
    /// Current lifecycle state.
    pub state: SessionState,
    /// Key registered by this session, if any.
    pub registration: Option<ServiceKey>,
    /// When the session connected.
    pub connected_at: DateTime<Utc>,
    /// Clock reading of the last call made on this session.
    pub last_activity: Timestamp,
}

impl SessionRecord {
    fn new(id: SessionId, now: Timestamp) -> Self {
        Self {
            id,
            state: SessionState::Connected,
            registration: None,
            connected_at: Utc::now(),
            last_activity: now,
        }
    }

    /// Records a call made on this session at `now`.
    pub fn touch(&mut self, now: Timestamp) {
        self.last_activity = self.last_activity.max(now);
    }

    /// How long the session has been silent as of `now`.
    #[must_use]
    pub fn idle_for(&self, now: Timestamp) -> Duration {
        now.since(self.last_activity)
    }

    /// Returns `true` unless the session has been closed.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state != SessionState::Disconnected
    }

    /// Records a successful registration.
    pub fn mark_registered(&mut self, key: ServiceKey) {
        self.registration = Some(key);
        self.state = SessionState::Registered;
    }

    /// Drops the registration, e.g. after it was evicted.
    pub fn clear_registration(&mut self) {
        self.registration = None;
        if self.is_connected() {
            self.state = SessionState::Connected;
        }
    }
}

/// Shared handle to one session's record.
pub type SessionHandle = Arc<Mutex<SessionRecord>>;

/// Table of connected sessions.
#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
}

impl SessionTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new session in the `Connected` state, active as of `now`.
    pub async fn connect(&self, now: Timestamp) -> SessionId {
        let id = SessionId::new();
        let record = Arc::new(Mutex::new(SessionRecord::new(id, now)));
        self.sessions.write().await.insert(id, record);
        id
    }

    /// Returns the handle for a live session.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotConnected`] if the session is unknown or
    /// closed.
    pub async fn get(&self, id: SessionId) -> Result<SessionHandle, RegistryError> {
        let map = self.sessions.read().await;
        map.get(&id).cloned().ok_or(RegistryError::NotConnected(id))
    }

    /// Detaches a session from the table, returning its handle.
    pub async fn remove(&self, id: SessionId) -> Option<SessionHandle> {
        self.sessions.write().await.remove(&id)
    }

    /// Returns the number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns `true` if no session is connected.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Disconnects and detaches every session that owns no live entry in
    /// `store` and has been silent for longer than `ttl`.
    ///
    /// Each candidate is re-checked under its own mutex, so a session that
    /// is mid-call is never dropped. Returns the dropped ids.
    pub async fn drop_idle(
        &self,
        store: &RegistryStore,
        now: Timestamp,
        ttl: Duration,
    ) -> Vec<SessionId> {
        let handles: Vec<(SessionId, SessionHandle)> = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(id, handle)| (*id, Arc::clone(handle)))
            .collect();

        let mut dropped = Vec::new();
        for (id, handle) in handles {
            let mut session = handle.lock().await;
            if !session.is_connected() || session.idle_for(now) <= ttl {
                continue;
            }
            if let Some(key) = session.registration.clone()
                && store.is_owned_by(&key, id).await
            {
                continue;
            }
            session.state = SessionState::Disconnected;
            session.registration = None;
            dropped.push(id);
        }

        if !dropped.is_empty() {
            let mut map = self.sessions.write().await;
            for id in &dropped {
                map.remove(id);
            }
        }
        dropped
    }
}
