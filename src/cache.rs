//! # Cache Store
//!
//! Durable event state between scans, keyed by per-source id.
//!
//! - `merge` upserts fresh winners without ever dropping a sent flag.
//! - `evict` prunes records older than the retention cutoff.
//! - `persist` rewrites the whole file (temp file + rename).
//! - `load` is best-effort: missing or corrupt file → empty cache.
//!
//! The store does no locking of its own; the aggregator owns it behind a
//! single mutex.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::model::{Event, GroupKey, Milestone};

/// Records dated further back than this are evicted.
pub const RETENTION_HOURS: i64 = 48;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub upserted: usize,
    pub superseded: usize,
}

#[derive(Debug, Default)]
pub struct CacheStore {
    path: Option<PathBuf>,
    entries: HashMap<String, Event>,
}

impl CacheStore {
    /// In-memory store that never touches disk.
    pub fn ephemeral() -> Self {
        Self::default()
    }

    /// Load from `path`. Never fails; problems are logged and yield an empty cache.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match read_entries(&path) {
            Ok(Some(events)) => {
                tracing::info!(path = %path.display(), count = events.len(), "loaded event cache");
                events.into_iter().map(|e| (e.id.clone(), e)).collect()
            }
            Ok(None) => {
                tracing::debug!(path = %path.display(), "no event cache yet, starting empty");
                HashMap::new()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %format!("{e:#}"), "event cache unreadable, starting empty");
                HashMap::new()
            }
        };
        Self {
            path: Some(path),
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Event> {
        self.entries.get(id)
    }

    /// Upsert reconciled winners, then drop other-source entries they supersede.
    ///
    /// `winners` must already be reconciled (one record per group key).
    /// Flags flow forward only: an existing entry's flags are carried onto the
    /// fresh record, and a superseded entry's flags are folded into its winner
    /// before it is removed.
    pub fn merge(&mut self, winners: Vec<Event>) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();
        let mut winner_ids: HashMap<GroupKey, String> = HashMap::with_capacity(winners.len());

        for mut fresh in winners {
            if let Some(existing) = self.entries.get(&fresh.id) {
                fresh.absorb_flags(existing);
            }
            winner_ids.insert(fresh.group_key(), fresh.id.clone());
            self.entries.insert(fresh.id.clone(), fresh);
            outcome.upserted += 1;
        }

        let superseded: Vec<(String, String)> = self
            .entries
            .values()
            .filter_map(|cached| {
                let winner_id = winner_ids.get(&cached.group_key())?;
                (winner_id != &cached.id).then(|| (cached.id.clone(), winner_id.clone()))
            })
            .collect();

        for (loser_id, winner_id) in superseded {
            let Some(loser) = self.entries.remove(&loser_id) else {
                continue;
            };
            if let Some(winner) = self.entries.get_mut(&winner_id) {
                winner.absorb_flags(&loser);
            }
            tracing::debug!(loser = %loser_id, winner = %winner_id, "dropped superseded duplicate");
            outcome.superseded += 1;
        }

        outcome
    }

    /// Remove records dated before `now - RETENTION_HOURS`. Returns how many went.
    pub fn evict(&mut self, now: DateTime<Utc>) -> usize {
        let cutoff = now - ChronoDuration::hours(RETENTION_HOURS);
        let before = self.entries.len();
        self.entries.retain(|_, e| e.date >= cutoff);
        before - self.entries.len()
    }

    /// Set `milestone` on the record stored under `id`. Absent id → `false`, no-op.
    pub fn mark(&mut self, id: &str, milestone: Milestone) -> bool {
        match self.entries.get_mut(id) {
            Some(ev) => {
                milestone.mark(ev);
                true
            }
            None => false,
        }
    }

    /// Copy of every record, ordered by `(date, id)`.
    pub fn snapshot(&self) -> Vec<Event> {
        let mut out: Vec<Event> = self.entries.values().cloned().collect();
        out.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        out
    }

    /// Rewrite the backing file. Failures are logged; memory stays authoritative.
    pub fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(e) = write_entries(path, &self.snapshot()) {
            tracing::warn!(path = %path.display(), error = %format!("{e:#}"), "failed to persist event cache");
        }
    }
}

fn read_entries(path: &Path) -> anyhow::Result<Option<Vec<Event>>> {
    use anyhow::Context;

    let data = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).context("read cache file"),
    };
    let events: Vec<Event> = serde_json::from_str(&data).context("parse cache file")?;
    Ok(Some(events))
}

fn write_entries(path: &Path, events: &[Event]) -> anyhow::Result<()> {
    use anyhow::Context;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let body = serde_json::to_vec_pretty(events).context("serialize cache")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, body).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("rename into {}", path.display()))?;
    Ok(())
}
