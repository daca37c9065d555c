//! # Aggregator
//!
//! Orchestration façade over the Cache Store: refresh (collect → reconcile →
//! merge → evict → persist), reconciled reads, and milestone marking.
//!
//! One mutex guards the store. It is taken only for in-memory work plus the
//! file write, never across adapter I/O, so a slow feed does not block
//! readers or flag marks.

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use crate::cache::CacheStore;
use crate::ingest::{self, types::SourceAdapter};
use crate::model::{Event, Milestone};
use crate::reconcile::reconcile;
use crate::source_priority::SourcePriorities;

pub struct Aggregator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    store: Mutex<CacheStore>,
    priorities: SourcePriorities,
    scan_timeout: Duration,
}

impl Aggregator {
    pub fn new(
        store: CacheStore,
        adapters: Vec<Arc<dyn SourceAdapter>>,
        priorities: SourcePriorities,
    ) -> Self {
        Self {
            adapters,
            store: Mutex::new(store),
            priorities,
            scan_timeout: ingest::SCAN_TIMEOUT,
        }
    }

    /// Override the per-adapter sub-deadline (default 20s).
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Poll every adapter and fold the results into the cache.
    ///
    /// Never fails: if every adapter errors the cache is returned as it was,
    /// minus eviction. Returns the reconciled full event set.
    pub async fn refresh(&self, deadline: Duration) -> Vec<Event> {
        let candidates = ingest::collect(&self.adapters, deadline, self.scan_timeout).await;
        let scanned = candidates.len();
        let fresh = reconcile(
            candidates.into_iter().map(Event::from_candidate).collect(),
            &self.priorities,
        );

        self.refresh_with(fresh, scanned, Utc::now())
    }

    fn refresh_with(&self, fresh: Vec<Event>, scanned: usize, now: DateTime<Utc>) -> Vec<Event> {
        let mut store = self.lock();
        let merged = store.merge(fresh);
        let evicted = store.evict(now);
        store.persist();

        counter!("cache_evicted_total").increment(evicted as u64);
        gauge!("cache_events").set(store.len() as f64);
        tracing::info!(
            scanned,
            upserted = merged.upserted,
            superseded = merged.superseded,
            evicted,
            cached = store.len(),
            "refresh complete"
        );

        reconcile(store.snapshot(), &self.priorities)
    }

    /// Reconciled view of the cache. Does not touch adapters.
    pub fn events(&self) -> Vec<Event> {
        let snapshot = self.lock().snapshot();
        reconcile(snapshot, &self.priorities)
    }

    /// Raw per-source cache size, before reconciliation.
    pub fn cached_len(&self) -> usize {
        self.lock().len()
    }

    /// Set `milestone` on the cached record `id` and persist.
    /// A missing id (e.g. evicted since it was read) is a silent no-op.
    pub fn mark_sent(&self, id: &str, milestone: Milestone) {
        let mut store = self.lock();
        if store.mark(id, milestone) {
            store.persist();
            tracing::debug!(%id, %milestone, "marked sent");
        } else {
            tracing::debug!(%id, %milestone, "mark skipped, id not cached");
        }
    }

    pub fn mark_sent_digest(&self, id: &str) {
        self.mark_sent(id, Milestone::Digest);
    }

    pub fn mark_sent_24h(&self, id: &str) {
        self.mark_sent(id, Milestone::Alert24h);
    }

    pub fn mark_sent_2h(&self, id: &str) {
        self.mark_sent(id, Milestone::Alert2h);
    }

    /// A panic while holding the lock leaves the map consistent (every
    /// mutation is a single insert/remove), so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, CacheStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
