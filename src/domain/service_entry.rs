//! A live registration with its metadata, status, and liveness stamp.

use chrono::{DateTime, Utc};

use super::clock::Timestamp;
use super::kv::KvMap;
use super::{ServiceKey, SessionId};

/// One registered daemon instance.
///
/// Stored by value in [`super::RegistryStore`]; dumps hand out clones so
/// readers never hold the store lock while serializing.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceEntry {
    /// Registration identity (immutable after creation).
    pub key: ServiceKey,

    /// Session that registered this entry.
    pub owner: SessionId,

    /// Metadata supplied at registration (immutable after creation).
    pub metadata: KvMap,

    /// Latest status blob. Replaced wholesale on every update.
    pub status: KvMap,

    /// Monotonic stamp of the last registration or status update.
    pub last_seen: Timestamp,

    /// Wall-clock registration time.
    pub registered_at: DateTime<Utc>,

    /// Wall-clock time of the last status update, if any.
    pub status_updated_at: Option<DateTime<Utc>>,

    /// Service-map epoch at which the entry was inserted.
    pub start_epoch: u64,

    /// Insertion sequence number, used to keep dumps in arrival order.
    pub seq: u64,
}

impl ServiceEntry {
    /// Creates a fresh entry with an empty status.
    #[must_use]
    pub fn new(
        key: ServiceKey,
        owner: SessionId,
        metadata: KvMap,
        now: Timestamp,
        start_epoch: u64,
        seq: u64,
    ) -> Self {
        Self {
            key,
            owner,
            metadata,
            status: KvMap::new(),
            last_seen: now,
            registered_at: Utc::now(),
            status_updated_at: None,
            start_epoch,
            seq,
        }
    }

    /// Returns `true` if the entry was last refreshed before `threshold`.
    #[must_use]
    pub fn is_stale(&self, threshold: Timestamp) -> bool {
        self.last_seen < threshold
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::kv::from_pairs;

    fn make_entry(last_seen_ms: u64) -> ServiceEntry {
        let Ok(key) = ServiceKey::new("laundry", "pid1") else {
            panic!("valid key");
        };
        ServiceEntry::new(
            key,
            SessionId::new(),
            from_pairs([("foo", "bar")]),
            Timestamp::from_millis(last_seen_ms),
            1,
            0,
        )
    }

    #[test]
    fn new_entry_has_empty_status() {
        let entry = make_entry(10);
        assert!(entry.status.is_empty());
        assert!(entry.status_updated_at.is_none());
        assert_eq!(entry.metadata.get("foo").map(String::as_str), Some("bar"));
    }

    #[test]
    fn staleness_is_strictly_before_threshold() {
        let entry = make_entry(1_000);
        assert!(entry.is_stale(Timestamp::from_millis(1_001)));
        assert!(!entry.is_stale(Timestamp::from_millis(1_000)));
        assert!(!entry.is_stale(Timestamp::from_millis(999)));
    }
}
