//! Baseline object storage.
//!
//! Objects are JSON-encoded [`Baseline`]s stored under
//! `master/<commit hash>.json` or `issue/<issue id>.json`.

use crate::error::StoreError;
use async_trait::async_trait;
use gold_baseline::Baseline;
use gold_types::{CommitHash, IssueId};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Address of a stored baseline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BaselineKey {
    Commit(CommitHash),
    Issue(IssueId),
}

impl BaselineKey {
    /// Key a baseline is stored under: its issue if it has one, else its
    /// end commit.
    pub fn of(baseline: &Baseline) -> Option<Self> {
        if let Some(issue) = baseline.issue() {
            return Some(Self::Issue(issue));
        }
        baseline.commit_hash().cloned().map(Self::Commit)
    }

    pub fn path(&self) -> String {
        match self {
            Self::Commit(hash) => format!("master/{}.json", hash),
            Self::Issue(issue) => format!("issue/{}.json", issue),
        }
    }
}

impl fmt::Display for BaselineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[async_trait]
pub trait BaselineReader: Send + Sync {
    /// Stored baseline, or `None` when the object does not exist.
    async fn read_baseline(&self, key: &BaselineKey) -> Result<Option<Baseline>, StoreError>;
}

#[async_trait]
pub trait BaselineWriter: Send + Sync {
    /// Store `baseline` under its key and return the object path.
    async fn write_baseline(&self, baseline: &Baseline) -> Result<String, StoreError>;

    /// Where writes go; `None` for a read-only store.
    fn destination(&self) -> Option<&str>;
}

pub trait BaselineStore: BaselineReader + BaselineWriter {}

impl<T: BaselineReader + BaselineWriter> BaselineStore for T {}

fn key_for(baseline: &Baseline) -> Result<BaselineKey, StoreError> {
    BaselineKey::of(baseline).ok_or_else(|| {
        StoreError::Backend("baseline has neither an issue nor an end commit".to_string())
    })
}

// ── In-memory ───────────────────────────────────────────────────────────

/// In-memory store for development and testing. Counts successful writes.
pub struct InMemoryBaselineStore {
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    destination: Option<String>,
    writes: AtomicUsize,
}

impl InMemoryBaselineStore {
    pub fn new() -> Self {
        Self {
            objects: Arc::new(RwLock::new(HashMap::new())),
            destination: Some("memory://baselines".to_string()),
            writes: AtomicUsize::new(0),
        }
    }

    /// A store that can be read but refuses writes.
    pub fn read_only() -> Self {
        Self {
            destination: None,
            ..Self::new()
        }
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    pub async fn remove(&self, key: &BaselineKey) -> bool {
        self.objects.write().await.remove(&key.path()).is_some()
    }

    /// Store raw bytes under `key`, bypassing serialization.
    pub async fn put_raw(&self, key: &BaselineKey, bytes: Vec<u8>) {
        self.objects.write().await.insert(key.path(), bytes);
    }
}

impl Default for InMemoryBaselineStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaselineReader for InMemoryBaselineStore {
    async fn read_baseline(&self, key: &BaselineKey) -> Result<Option<Baseline>, StoreError> {
        let objects = self.objects.read().await;
        match objects.get(&key.path()) {
            Some(bytes) => serde_json::from_slice(bytes)
                .map(Some)
                .map_err(|e| StoreError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl BaselineWriter for InMemoryBaselineStore {
    async fn write_baseline(&self, baseline: &Baseline) -> Result<String, StoreError> {
        if self.destination.is_none() {
            return Err(StoreError::ReadOnly);
        }
        let path = key_for(baseline)?.path();
        let bytes =
            serde_json::to_vec(baseline).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.objects.write().await.insert(path.clone(), bytes);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(path)
    }

    fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }
}

// ── Sled ────────────────────────────────────────────────────────────────

/// Sled (embedded database) store. Object paths are the sled keys.
pub struct SledBaselineStore {
    db: sled::Db,
    destination: String,
}

impl SledBaselineStore {
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let db = sled::open(path)
            .map_err(|e| StoreError::Backend(format!("Failed to open sled DB: {}", e)))?;
        Ok(Self {
            db,
            destination: path.to_string(),
        })
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| {
                StoreError::Backend(format!("Failed to create in-memory sled DB: {}", e))
            })?;
        Ok(Self {
            db,
            destination: "sled://temporary".to_string(),
        })
    }
}

#[async_trait]
impl BaselineReader for SledBaselineStore {
    async fn read_baseline(&self, key: &BaselineKey) -> Result<Option<Baseline>, StoreError> {
        let Some(data) = self
            .db
            .get(key.path().as_bytes())
            .map_err(|e| StoreError::Backend(e.to_string()))?
        else {
            return Ok(None);
        };
        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl BaselineWriter for SledBaselineStore {
    async fn write_baseline(&self, baseline: &Baseline) -> Result<String, StoreError> {
        let path = key_for(baseline)?.path();
        let serialized =
            serde_json::to_vec(baseline).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.db
            .insert(path.as_bytes(), serialized)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        self.db
            .flush_async()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(path)
    }

    fn destination(&self) -> Option<&str> {
        Some(&self.destination)
    }
}
