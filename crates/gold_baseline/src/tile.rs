//! Tile model: a window of commits with per-trace digest history.

use chrono::{DateTime, Utc};
use gold_types::{CommitHash, Digest, TestName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Trace param holding the test name.
pub const TEST_NAME_PARAM: &str = "name";

/// A commit on the tracked branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub hash: CommitHash,
    pub commit_time: DateTime<Utc>,
    #[serde(default)]
    pub author: String,
}

impl Commit {
    pub fn new(hash: CommitHash, commit_time: DateTime<Utc>, author: impl Into<String>) -> Self {
        Self {
            hash,
            commit_time,
            author: author.into(),
        }
    }
}

/// Stable trace identifier, e.g. `,device=angler,name=alpha,`.
pub type TraceId = String;

/// Digest history of one (test, configuration) pair.
///
/// `digests[i]` is the result at the tile's i-th dense commit;
/// `Digest::missing()` marks a commit without a result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    pub params: BTreeMap<String, String>,
    pub digests: Vec<Digest>,
}

impl Trace {
    pub fn new(params: BTreeMap<String, String>, digests: Vec<Digest>) -> Self {
        Self { params, digests }
    }

    pub fn test_name(&self) -> Option<TestName> {
        self.params
            .get(TEST_NAME_PARAM)
            .and_then(|name| TestName::new(name.as_str()).ok())
    }
}

/// Dense traces over a run of commits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub commits: Vec<Commit>,
    pub traces: BTreeMap<TraceId, Trace>,
}

impl Tile {
    pub fn last_commit(&self) -> Option<&Commit> {
        self.commits.last()
    }
}

/// Read access to the most recent tile.
///
/// `data_commits()` are the dense commits; trace digest `i` belongs to
/// `data_commits()[i]`. `all_commits()` is the full window in chronological
/// order and may contain commits that have no data yet.
pub trait TileInfo: Send + Sync {
    fn all_commits(&self) -> &[Commit];

    fn data_commits(&self) -> &[Commit];

    fn tile(&self, exclude_ignored: bool) -> &Tile;
}

/// Owned, serializable [`TileInfo`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TileSnapshot {
    pub all_commits: Vec<Commit>,
    /// Traces without ignore rules applied. Falls back to `tile` when absent.
    #[serde(default)]
    pub tile_with_ignored: Option<Tile>,
    pub tile: Tile,
}

impl TileSnapshot {
    /// Snapshot whose tile is fully dense: every commit has data.
    pub fn dense(tile: Tile) -> Self {
        Self {
            all_commits: tile.commits.clone(),
            tile_with_ignored: None,
            tile,
        }
    }

    /// Snapshot over `all_commits` where only `tile.commits` carry data.
    pub fn sparse(all_commits: Vec<Commit>, tile: Tile) -> Self {
        Self {
            all_commits,
            tile_with_ignored: None,
            tile,
        }
    }
}

impl TileInfo for TileSnapshot {
    fn all_commits(&self) -> &[Commit] {
        &self.all_commits
    }

    fn data_commits(&self) -> &[Commit] {
        &self.tile.commits
    }

    fn tile(&self, exclude_ignored: bool) -> &Tile {
        if exclude_ignored {
            return &self.tile;
        }
        self.tile_with_ignored.as_ref().unwrap_or(&self.tile)
    }
}
