//! In-memory service map with liveness stamps.
//!
//! [`RegistryStore`] keeps every live [`ServiceEntry`] in a `HashMap`
//! behind a single [`tokio::sync::RwLock`]. Every check-then-act
//! (duplicate detection on insert, presence on update, staleness on
//! expiry) runs inside one write-lock critical section, so the expiry
//! tick can never observe or remove an entry mid-update.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::clock::Timestamp;
use super::kv::KvMap;
use super::{ServiceEntry, ServiceKey, SessionId};
use crate::error::RegistryError;

/// Keys removed by one call, with the epoch the map reached afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Removed {
    /// Removed keys, in insertion order.
    pub keys: Vec<ServiceKey>,
    /// Service-map epoch after the removal.
    pub epoch: u64,
}

impl Removed {
    /// Returns `true` if nothing was removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[derive(Debug, Default)]
struct StoreState {
    entries: HashMap<ServiceKey, ServiceEntry>,
    next_seq: u64,
    epoch: u64,
}

impl StoreState {
    fn touch(&mut self, key: &ServiceKey, now: Timestamp) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.last_seen = now;
                true
            }
            None => false,
        }
    }

    fn bump_epoch(&mut self) -> u64 {
        self.epoch = self.epoch.saturating_add(1);
        self.epoch
    }

    /// Removes every entry matching `pred`; bumps the epoch once if any.
    fn remove_where(&mut self, mut pred: impl FnMut(&ServiceEntry) -> bool) -> Removed {
        let mut doomed: Vec<(u64, ServiceKey)> = self
            .entries
            .values()
            .filter(|&entry| pred(entry))
            .map(|entry| (entry.seq, entry.key.clone()))
            .collect();
        if doomed.is_empty() {
            return Removed {
                keys: Vec::new(),
                epoch: self.epoch,
            };
        }
        doomed.sort_unstable_by_key(|(seq, _)| *seq);
        for (_, key) in &doomed {
            self.entries.remove(key);
        }
        Removed {
            keys: doomed.into_iter().map(|(_, key)| key).collect(),
            epoch: self.bump_epoch(),
        }
    }
}

/// Central store of live registrations.
///
/// # Concurrency
///
/// - Readers (dump, lookups) share the read lock and copy entries out.
/// - Insert, status update, removal and expiry take the write lock, so
///   at most one writer touches the map at a time.
#[derive(Debug, Default)]
pub struct RegistryStore {
    state: RwLock<StoreState>,
}

impl RegistryStore {
    /// Creates an empty store at epoch 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new registration stamped with `now`.
    ///
    /// Returns the epoch the map reached.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AlreadyRegistered`] if the key is present,
    /// even if its entry is stale but not yet evicted.
    pub async fn insert(
        &self,
        key: ServiceKey,
        owner: SessionId,
        metadata: KvMap,
        now: Timestamp,
    ) -> Result<u64, RegistryError> {
        let mut state = self.state.write().await;
        if state.entries.contains_key(&key) {
            return Err(RegistryError::AlreadyRegistered(key));
        }
        let epoch = state.bump_epoch();
        let seq = state.next_seq;
        state.next_seq = seq.saturating_add(1);
        let entry = ServiceEntry::new(key.clone(), owner, metadata, now, epoch, seq);
        state.entries.insert(key, entry);
        Ok(epoch)
    }

    /// Replaces the status of `key` and refreshes its liveness stamp.
    ///
    /// Returns the epoch the map reached.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ServiceNotFound`] if the key is absent
    /// (never registered, closed, or already evicted).
    pub async fn update_status(
        &self,
        key: &ServiceKey,
        status: KvMap,
        now: Timestamp,
    ) -> Result<u64, RegistryError> {
        self.replace_status(key, None, status, now).await
    }

    /// Like [`RegistryStore::update_status`], but only if `owner` holds the
    /// entry. The ownership check and the update share one critical section.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ServiceNotFound`] if the key is absent or
    /// registered by a different session.
    pub async fn update_owned_status(
        &self,
        key: &ServiceKey,
        owner: SessionId,
        status: KvMap,
        now: Timestamp,
    ) -> Result<u64, RegistryError> {
        self.replace_status(key, Some(owner), status, now).await
    }

    async fn replace_status(
        &self,
        key: &ServiceKey,
        owner: Option<SessionId>,
        status: KvMap,
        now: Timestamp,
    ) -> Result<u64, RegistryError> {
        let mut state = self.state.write().await;
        let Some(entry) = state
            .entries
            .get_mut(key)
            .filter(|entry| owner.is_none_or(|owner| entry.owner == owner))
        else {
            return Err(RegistryError::ServiceNotFound(key.clone()));
        };
        entry.status = status;
        entry.status_updated_at = Some(chrono::Utc::now());
        state.touch(key, now);
        Ok(state.bump_epoch())
    }

    /// Refreshes the liveness stamp of `key`. Returns `false` if absent.
    pub async fn touch(&self, key: &ServiceKey, now: Timestamp) -> bool {
        self.state.write().await.touch(key, now)
    }

    /// Removes `key`. Returns `true` if it was present.
    pub async fn remove(&self, key: &ServiceKey) -> bool {
        let mut state = self.state.write().await;
        if state.entries.remove(key).is_some() {
            state.bump_epoch();
            true
        } else {
            false
        }
    }

    /// Removes every entry registered by `owner`.
    pub async fn remove_owned_by(&self, owner: SessionId) -> Removed {
        self.state
            .write()
            .await
            .remove_where(|entry| entry.owner == owner)
    }

    /// Removes every entry whose `last_seen` is strictly before
    /// `threshold`, leaving the rest untouched.
    pub async fn expire_older_than(&self, threshold: Timestamp) -> Removed {
        self.state
            .write()
            .await
            .remove_where(|entry| entry.is_stale(threshold))
    }

    /// Copies out every live entry in insertion order.
    pub async fn snapshot_all(&self) -> Vec<ServiceEntry> {
        self.snapshot_with_epoch().await.1
    }

    /// Copies out the epoch and every live entry under one read lock.
    pub async fn snapshot_with_epoch(&self) -> (u64, Vec<ServiceEntry>) {
        let state = self.state.read().await;
        let mut entries: Vec<ServiceEntry> = state.entries.values().cloned().collect();
        entries.sort_unstable_by_key(|entry| entry.seq);
        (state.epoch, entries)
    }

    /// Returns a copy of the entry for `key`, if live.
    pub async fn get(&self, key: &ServiceKey) -> Option<ServiceEntry> {
        self.state.read().await.entries.get(key).cloned()
    }

    /// Returns `true` if `key` is live and registered by `owner`.
    pub async fn is_owned_by(&self, key: &ServiceKey, owner: SessionId) -> bool {
        self.state
            .read()
            .await
            .entries
            .get(key)
            .is_some_and(|entry| entry.owner == owner)
    }

    /// Returns `true` if `key` is live.
    pub async fn contains(&self, key: &ServiceKey) -> bool {
        self.state.read().await.entries.contains_key(key)
    }

    /// Current service-map epoch.
    pub async fn epoch(&self) -> u64 {
        self.state.read().await.epoch
    }

    /// Returns the number of live entries.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// Returns `true` if the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }
}
