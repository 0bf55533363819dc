//! In-process caches for master and changelist baselines.
//!
//! ## Generations
//!
//! A successful master push produces a *generation*: the tile it was computed
//! from plus, per commit, the baseline and the fingerprint last written.
//! [`BaselineCache::swap_generation`] installs it under a single write lock;
//! readers see either the previous generation or the new one, never a mix.
//!
//! ## TTL
//!
//! Master baselines are served from memory for `commit_cache_ttl` after they
//! were installed. Expired entries count as misses and the caller goes back
//! to the store.
//!
//! ## LRU
//!
//! Changelist baselines live in an `IndexMap` ordered by recency; the front
//! entry is evicted on overflow.

use gold_baseline::{Baseline, Fingerprint, TileInfo};
use gold_types::{CommitHash, IssueId};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

struct CacheEntry<T> {
    value: T,
    inserted: Instant,
}

impl<T> CacheEntry<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            inserted: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.inserted.elapsed() > ttl
    }
}

#[derive(Default)]
struct CacheState {
    tile: Option<Arc<dyn TileInfo>>,
    written: HashMap<CommitHash, Fingerprint>,
    commits: HashMap<CommitHash, CacheEntry<Baseline>>,
}

/// Snapshot of the hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub commit_hits: u64,
    pub commit_misses: u64,
    pub issue_hits: u64,
    pub issue_misses: u64,
}

#[derive(Default)]
struct Counters {
    commit_hits: AtomicU64,
    commit_misses: AtomicU64,
    issue_hits: AtomicU64,
    issue_misses: AtomicU64,
}

/// Shared cache of the current tile, master baselines and changelist
/// baselines.
pub struct BaselineCache {
    state: RwLock<CacheState>,
    issues: Mutex<IssueLru>,
    ttl: Duration,
    counters: Counters,
}

impl BaselineCache {
    pub fn new(ttl: Duration, issue_capacity: usize) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            issues: Mutex::new(IssueLru::new(issue_capacity)),
            ttl,
            counters: Counters::default(),
        }
    }

    // ── Master generation ───────────────────────────────────────────────

    pub async fn current_tile(&self) -> Option<Arc<dyn TileInfo>> {
        self.state.read().await.tile.clone()
    }

    /// Replace the tile without touching the cached baselines.
    pub async fn set_tile(&self, tile: Arc<dyn TileInfo>) {
        self.state.write().await.tile = Some(tile);
    }

    /// Fingerprints recorded by the last successful push.
    pub async fn written(&self) -> HashMap<CommitHash, Fingerprint> {
        self.state.read().await.written.clone()
    }

    /// Install a new generation in one step.
    pub async fn swap_generation(
        &self,
        tile: Arc<dyn TileInfo>,
        baselines: HashMap<CommitHash, Baseline>,
        written: HashMap<CommitHash, Fingerprint>,
    ) {
        let commits = baselines
            .into_iter()
            .map(|(hash, baseline)| (hash, CacheEntry::new(baseline)))
            .collect();
        let mut state = self.state.write().await;
        *state = CacheState {
            tile: Some(tile),
            written,
            commits,
        };
    }

    pub async fn get_commit(&self, hash: &CommitHash) -> Option<Baseline> {
        let state = self.state.read().await;
        match state.commits.get(hash) {
            Some(entry) if !entry.is_expired(self.ttl) => {
                self.counters.commit_hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
            _ => {
                self.counters.commit_misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Cache a baseline read back from the store.
    pub async fn put_commit(&self, hash: CommitHash, baseline: Baseline) {
        self.state
            .write()
            .await
            .commits
            .insert(hash, CacheEntry::new(baseline));
    }

    // ── Changelists ─────────────────────────────────────────────────────

    pub async fn get_issue(&self, issue: IssueId) -> Option<Baseline> {
        let found = self.issues.lock().await.get(issue);
        let counter = if found.is_some() {
            &self.counters.issue_hits
        } else {
            &self.counters.issue_misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    pub async fn put_issue(&self, issue: IssueId, baseline: Baseline) {
        self.issues.lock().await.insert(issue, baseline);
    }

    pub async fn issue_count(&self) -> usize {
        self.issues.lock().await.len()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            commit_hits: self.counters.commit_hits.load(Ordering::Relaxed),
            commit_misses: self.counters.commit_misses.load(Ordering::Relaxed),
            issue_hits: self.counters.issue_hits.load(Ordering::Relaxed),
            issue_misses: self.counters.issue_misses.load(Ordering::Relaxed),
        }
    }
}

/// Bounded least-recently-used map of changelist baselines.
pub struct IssueLru {
    entries: IndexMap<IssueId, Baseline>,
    capacity: usize,
}

impl IssueLru {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: IndexMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Look up and mark as most recently used.
    pub fn get(&mut self, issue: IssueId) -> Option<Baseline> {
        let value = self.entries.shift_remove(&issue)?;
        self.entries.insert(issue, value.clone());
        Some(value)
    }

    pub fn insert(&mut self, issue: IssueId, baseline: Baseline) {
        self.entries.shift_remove(&issue);
        self.entries.insert(issue, baseline);
        while self.entries.len() > self.capacity {
            self.entries.shift_remove_index(0);
        }
    }

    pub fn contains(&self, issue: IssueId) -> bool {
        self.entries.contains_key(&issue)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
