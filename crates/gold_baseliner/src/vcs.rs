//! Version-control lookups used to validate and extend commit ranges.

use crate::error::VcsError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gold_baseline::Commit;
use gold_types::CommitHash;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// What the repository knows about one commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitDetails {
    pub hash: CommitHash,
    /// Branches containing the commit.
    pub branches: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl CommitDetails {
    pub fn is_on(&self, branch: &str) -> bool {
        self.branches.iter().any(|b| b == branch)
    }
}

#[async_trait]
pub trait BranchInspector: Send + Sync {
    async fn details(&self, hash: &CommitHash) -> Result<CommitDetails, VcsError>;

    /// Commits on the tracked branch newer than `commit`, oldest first.
    /// Repositories without range queries return nothing.
    async fn commits_after(&self, _commit: &CommitHash) -> Result<Vec<Commit>, VcsError> {
        Ok(Vec::new())
    }
}

/// Serializable form of [`InMemoryVcs`]: `vcs.json` in a snapshot directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VcsSnapshot {
    /// Branch history, oldest first.
    #[serde(default)]
    pub commits: Vec<Commit>,
    /// Branch name for `commits`.
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Commits that exist but are not on `branch`.
    #[serde(default)]
    pub other: Vec<CommitDetails>,
}

fn default_branch() -> String {
    crate::config::DEFAULT_BRANCH.to_string()
}

/// In-memory repository: one linear branch plus stray commits.
pub struct InMemoryVcs {
    inner: Arc<RwLock<VcsSnapshot>>,
}

impl InMemoryVcs {
    pub fn new(branch: impl Into<String>) -> Self {
        Self::from_snapshot(VcsSnapshot {
            branch: branch.into(),
            ..VcsSnapshot::default()
        })
    }

    pub fn from_snapshot(snapshot: VcsSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(snapshot)),
        }
    }

    /// Append a commit to the tracked branch.
    pub async fn push_commit(&self, commit: Commit) {
        self.inner.write().await.commits.push(commit);
    }

    /// Register a commit that is not on the tracked branch.
    pub async fn add_stray(&self, details: CommitDetails) {
        self.inner.write().await.other.push(details);
    }
}

#[async_trait]
impl BranchInspector for InMemoryVcs {
    async fn details(&self, hash: &CommitHash) -> Result<CommitDetails, VcsError> {
        let vcs = self.inner.read().await;
        if let Some(commit) = vcs.commits.iter().find(|c| &c.hash == hash) {
            return Ok(CommitDetails {
                hash: commit.hash.clone(),
                branches: vec![vcs.branch.clone()],
                timestamp: commit.commit_time,
            });
        }
        vcs.other
            .iter()
            .find(|d| &d.hash == hash)
            .cloned()
            .ok_or_else(|| VcsError::UnknownCommit(hash.clone()))
    }

    async fn commits_after(&self, commit: &CommitHash) -> Result<Vec<Commit>, VcsError> {
        let vcs = self.inner.read().await;
        let Some(pos) = vcs.commits.iter().position(|c| &c.hash == commit) else {
            return Err(VcsError::UnknownCommit(commit.clone()));
        };
        Ok(vcs.commits[pos + 1..].to_vec())
    }
}
