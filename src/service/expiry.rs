//! Periodic eviction of registrations that stopped reporting.
//!
//! [`ExpiryScheduler`] wakes every tick, computes `now - ttl`, and removes
//! every entry whose last status update is older than that. Removal is
//! silent for the client: its next status update gets `NotRegistered`.
//! The same tick drops sessions that own nothing and have been silent for
//! longer than the session idle timeout, so abandoned sessions do not pile
//! up. The idle timeout is longer than the TTL: an evicted client that
//! reports again soon still gets `NotRegistered` and may re-register.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::domain::{Clock, EventBus, RegistryStore, RemovalReason, Removed, SessionTable};

/// Tick-driven TTL enforcement over a [`RegistryStore`].
#[derive(Debug)]
pub struct ExpiryScheduler {
    store: Arc<RegistryStore>,
    sessions: Arc<SessionTable>,
    event_bus: EventBus,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    tick_interval: Duration,
    session_idle: Duration,
}

/// Session idle timeout as a multiple of the TTL, unless overridden.
const DEFAULT_SESSION_IDLE_FACTOR: u32 = 5;

impl ExpiryScheduler {
    /// Creates a scheduler evicting entries idle for longer than `ttl`,
    /// scanning every `tick_interval`. Sessions are dropped after five
    /// TTLs of silence; see [`ExpiryScheduler::with_session_idle`].
    #[must_use]
    pub fn new(
        store: Arc<RegistryStore>,
        sessions: Arc<SessionTable>,
        event_bus: EventBus,
        clock: Arc<dyn Clock>,
        ttl: Duration,
        tick_interval: Duration,
    ) -> Self {
        Self {
            store,
            sessions,
            event_bus,
            clock,
            ttl,
            tick_interval,
            session_idle: ttl.saturating_mul(DEFAULT_SESSION_IDLE_FACTOR),
        }
    }

    /// Overrides how long a session without a live registration may stay
    /// silent before it is dropped. Clamped to at least the TTL.
    #[must_use]
    pub fn with_session_idle(mut self, session_idle: Duration) -> Self {
        self.session_idle = session_idle.max(self.ttl);
        self
    }

    /// Configured time-to-live.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Runs one scan immediately and returns the entries it evicted.
    pub async fn tick(&self) -> Removed {
        let now = self.clock.now();
        let threshold = now.saturating_sub(self.ttl);
        let removed = self.store.expire_older_than(threshold).await;

        self.event_bus.publish_removals(&removed, RemovalReason::Expired);
        for key in &removed.keys {
            tracing::info!(%key, ttl_secs = self.ttl.as_secs(), "service expired, removed from map");
        }

        let dropped = self.sessions.drop_idle(&self.store, now, self.session_idle).await;
        for session_id in &dropped {
            tracing::info!(%session_id, "idle session dropped");
        }

        if removed.is_empty() {
            tracing::trace!(%now, %threshold, "expiry tick: nothing stale");
        } else {
            tracing::debug!(
                %now,
                %threshold,
                evicted = removed.keys.len(),
                epoch = removed.epoch,
                "expiry tick completed"
            );
        }
        removed
    }

    /// Ticks until `shutdown` turns `true` or its sender is dropped.
    ///
    /// A tick that has started always finishes before the loop exits.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            ttl_secs = self.ttl.as_secs(),
            tick_ms = u64::try_from(self.tick_interval.as_millis()).unwrap_or(u64::MAX),
            "expiry scheduler started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!("expiry scheduler stopped");
    }

    /// Spawns [`ExpiryScheduler::run`] on the current runtime.
    #[must_use]
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::kv::{KvMap, from_pairs};
    use crate::domain::{ManualClock, ServiceKey};
    use crate::error::RegistryError;
    use crate::service::RegistryService;

    const TTL: Duration = Duration::from_secs(10);

    fn make() -> (RegistryService, ExpiryScheduler, ManualClock) {
        let clock = ManualClock::new(0);
        let service = RegistryService::new(
            Arc::new(RegistryStore::new()),
            EventBus::new(100),
            Arc::new(clock.clone()),
        );
        let scheduler = ExpiryScheduler::new(
            Arc::clone(service.store()),
            Arc::clone(service.sessions()),
            service.event_bus().clone(),
            Arc::clone(service.clock()),
            TTL,
            Duration::from_millis(10),
        );
        (service, scheduler, clock)
    }

    #[tokio::test]
    async fn tick_before_ttl_keeps_entry() {
        let (service, scheduler, clock) = make();
        let session = service.connect().await;
        let _ = service.register(session, "laundry", "pidX", KvMap::new()).await;

        clock.advance_secs(10);
        assert!(scheduler.tick().await.is_empty());
        assert_eq!(service.dump().await.entries.len(), 1);
    }

    #[tokio::test]
    async fn tick_after_ttl_evicts_and_update_fails() {
        let (service, scheduler, clock) = make();
        let mut rx = service.event_bus().subscribe();
        let session = service.connect().await;
        let _ = service.register(session, "laundry", "pidX", KvMap::new()).await;
        let _ = rx.recv().await;

        clock.advance(TTL + Duration::from_millis(1));
        let removed = scheduler.tick().await;
        let Ok(expected) = ServiceKey::new("laundry", "pidX") else {
            panic!("valid key");
        };
        assert_eq!(removed.keys, vec![expected]);
        assert!(service.dump().await.entries.is_empty());

        let Ok(event) = rx.recv().await else {
            panic!("expected removal event");
        };
        let json = serde_json::to_string(&event).unwrap_or_default();
        assert!(json.contains("\"reason\":\"expired\""));

        let update = service
            .update_status(session, from_pairs([("testing", "late")]))
            .await;
        assert!(matches!(update, Err(RegistryError::NotRegistered(_))));
    }

    #[tokio::test]
    async fn status_updates_keep_entry_alive() {
        let (service, scheduler, clock) = make();
        let session = service.connect().await;
        let _ = service.register(session, "laundry", "pidX", KvMap::new()).await;

        for i in 0..5 {
            clock.advance_secs(8);
            let status = from_pairs([("count".to_string(), i.to_string())]);
            tokio_test::assert_ok!(service.update_status(session, status).await);
            assert!(scheduler.tick().await.is_empty());
        }
        assert_eq!(service.dump().await.entries.len(), 1);
    }

    #[tokio::test]
    async fn stale_but_unevicted_key_still_blocks_register() {
        let (service, scheduler, clock) = make();
        let first = service.connect().await;
        let _ = service.register(first, "laundry", "pidX", KvMap::new()).await;
        clock.advance_secs(60);

        let second = service.connect().await;
        let blocked = service.register(second, "laundry", "pidX", KvMap::new()).await;
        assert!(matches!(blocked, Err(RegistryError::AlreadyRegistered(_))));

        scheduler.tick().await;
        tokio_test::assert_ok!(service.register(second, "laundry", "pidX", KvMap::new()).await);
    }

    #[tokio::test]
    async fn only_stale_entries_are_evicted() {
        let (service, scheduler, clock) = make();
        let old = service.connect().await;
        let _ = service.register(old, "laundry", "old", KvMap::new()).await;
        clock.advance_secs(6);
        let fresh = service.connect().await;
        let _ = service.register(fresh, "laundry", "fresh", KvMap::new()).await;
        clock.advance_secs(6);

        let removed = scheduler.tick().await;
        assert_eq!(removed.keys.len(), 1);
        let names: Vec<String> = service
            .dump()
            .await
            .entries
            .into_iter()
            .map(|e| e.key.instance_name().to_string())
            .collect();
        assert_eq!(names, vec!["fresh"]);
        assert_eq!(service.session_info(old).await.registration, None);
    }

    #[tokio::test]
    async fn abandoned_sessions_are_dropped_after_eviction() {
        let (service, scheduler, clock) = make();
        for i in 0..100 {
            let session = service.connect().await;
            tokio_test::assert_ok!(
                service
                    .register(session, "laundry", &format!("pid{i}"), KvMap::new())
                    .await
            );
        }
        let idle = service.connect().await;
        assert_eq!(service.session_count().await, 101);

        clock.advance_secs(3600);
        let removed = scheduler.tick().await;

        assert_eq!(removed.keys.len(), 100);
        assert!(service.store().is_empty().await);
        assert_eq!(service.session_count().await, 0);
        let update = service.update_status(idle, KvMap::new()).await;
        assert!(matches!(update, Err(RegistryError::NotConnected(_))));
    }

    #[tokio::test]
    async fn evicted_session_survives_until_idle_timeout() {
        let (service, scheduler, clock) = make();
        let session = service.connect().await;
        let _ = service.register(session, "laundry", "pidX", KvMap::new()).await;

        clock.advance_secs(11);
        assert_eq!(scheduler.tick().await.keys.len(), 1);
        assert_eq!(service.session_count().await, 1);

        clock.advance_secs(40);
        scheduler.tick().await;
        assert_eq!(service.session_count().await, 0);
    }

    #[tokio::test]
    async fn live_registration_keeps_session() {
        let (service, scheduler, clock) = make();
        let session = service.connect().await;
        let _ = service.register(session, "laundry", "pidX", KvMap::new()).await;

        for _ in 0..20 {
            clock.advance_secs(9);
            tokio_test::assert_ok!(service.update_status(session, KvMap::new()).await);
            scheduler.tick().await;
        }
        assert_eq!(service.session_count().await, 1);
        assert_eq!(service.store().len().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn tick_racing_status_update_has_one_consistent_outcome() {
        for round in 0..50 {
            let (service, scheduler, clock) = make();
            let session = service.connect().await;
            tokio_test::assert_ok!(
                service
                    .register(session, "laundry", &format!("pid{round}"), KvMap::new())
                    .await
            );
            clock.advance(TTL + Duration::from_millis(1));

            let scheduler = Arc::new(scheduler);
            let ticking = {
                let scheduler = Arc::clone(&scheduler);
                tokio::spawn(async move { scheduler.tick().await })
            };
            let updating = {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .update_status(session, from_pairs([("testing", "race")]))
                        .await
                })
            };
            let (Ok(removed), Ok(update)) = (ticking.await, updating.await) else {
                panic!("task panicked");
            };

            if removed.is_empty() {
                tokio_test::assert_ok!(update);
                assert_eq!(service.store().len().await, 1);
                let dump = service.dump().await;
                let Some(entry) = dump.entries.first() else {
                    panic!("entry kept alive by the update");
                };
                assert_eq!(entry.status, from_pairs([("testing", "race")]));
            } else {
                assert_eq!(removed.keys.len(), 1);
                assert!(matches!(update, Err(RegistryError::NotRegistered(_))));
                assert!(service.store().is_empty().await);
                assert_eq!(service.session_count().await, 1);
            }
        }
    }

    #[test]
    fn session_idle_is_never_below_ttl() {
        let (_service, scheduler, _clock) = make();
        let scheduler = scheduler.with_session_idle(Duration::from_secs(1));
        assert_eq!(scheduler.session_idle, TTL);
    }

    #[tokio::test]
    async fn run_evicts_then_stops_on_shutdown() {
        let (service, scheduler, clock) = make();
        let session = service.connect().await;
        let _ = service.register(session, "laundry", "pidX", KvMap::new()).await;
        clock.advance_secs(11);

        let (tx, rx) = watch::channel(false);
        let handle = scheduler.spawn(rx);

        let mut evicted = false;
        for _ in 0..100 {
            if service.store().is_empty().await {
                evicted = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(evicted);

        let _ = tx.send(true);
        let joined = tokio::time::timeout(Duration::from_secs(2), handle).await;
        assert!(matches!(joined, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn run_stops_when_sender_dropped() {
        let (_service, scheduler, _clock) = make();
        let (tx, rx) = watch::channel(false);
        let handle = scheduler.spawn(rx);
        drop(tx);
        let joined = tokio::time::timeout(Duration::from_secs(2), handle).await;
        assert!(matches!(joined, Ok(Ok(()))));
    }
}
