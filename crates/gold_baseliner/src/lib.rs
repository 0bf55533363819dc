//! Gold Baseliner - keeps per-commit and per-changelist baselines in sync
//!
//! The baseliner owns the side-effecting half of baseline synchronization:
//! it reads a tile and the current triage state, runs the sweep from
//! `gold_baseline`, and writes every baseline whose content changed since
//! the previous push. Reads are served from an in-process cache, then from
//! the store, and as a last resort by recomputing the missing commit.

use gold_baseline::{baseline_for_issue, baselines_per_commit, Baseline, Commit, TileInfo};
use gold_types::{CommitHash, IssueId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

pub mod cache;
pub mod config;
pub mod error;
pub mod expectations_store;
pub mod store;
pub mod tryjobs;
pub mod vcs;

/// Re-export for convenience
pub use cache::{BaselineCache, CacheStats, IssueLru};
pub use config::{BaselinerConfig, ConfigError};
pub use error::{
    BaselinerError, ExpectationsError, Result, StoreError, TryjobStoreError, VcsError,
};
pub use expectations_store::{ExpectationsStore, InMemoryExpectationsStore};
pub use store::{
    BaselineKey, BaselineReader, BaselineStore, BaselineWriter, InMemoryBaselineStore,
    SledBaselineStore,
};
pub use tryjobs::{compare_and_swap, InMemoryTryjobStore, TryjobStore};
pub use vcs::{BranchInspector, CommitDetails, InMemoryVcs, VcsSnapshot};

/// Collaborators the baseliner reads from and writes to.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn BaselineStore>,
    pub expectations: Arc<dyn ExpectationsStore>,
    pub vcs: Arc<dyn BranchInspector>,
    pub tryjobs: Arc<dyn TryjobStore>,
}

/// The baseline synchronization engine
pub struct Baseliner {
    config: BaselinerConfig,
    store: Arc<dyn BaselineStore>,
    expectations: Arc<dyn ExpectationsStore>,
    vcs: Arc<dyn BranchInspector>,
    tryjobs: Arc<dyn TryjobStore>,
    cache: BaselineCache,
}

impl Baseliner {
    pub fn new(config: BaselinerConfig, deps: Collaborators) -> Self {
        let cache = BaselineCache::new(config.commit_cache_ttl, config.issue_cache_capacity);
        Self {
            config,
            store: deps.store,
            expectations: deps.expectations,
            vcs: deps.vcs,
            tryjobs: deps.tryjobs,
            cache,
        }
    }

    pub fn config(&self) -> &BaselinerConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Whether the store accepts writes.
    pub fn can_write(&self) -> bool {
        self.store.destination().is_some()
    }

    /// Recompute and store the baseline of every commit in the tile.
    ///
    /// `tile` defaults to the tile of the last successful push. Baselines
    /// whose fingerprint matches what the previous push wrote for the same
    /// commit are not written again. If any write fails the remaining
    /// writes are aborted and the cached generation is left untouched.
    ///
    /// Returns the baseline of `target` when it was part of the sweep.
    pub async fn push_master(
        &self,
        tile: Option<Arc<dyn TileInfo>>,
        target: Option<&CommitHash>,
    ) -> Result<Option<Baseline>> {
        self.sweep_master(tile, target, false).await
    }

    /// Seed the tile used by fetches and pushes that do not pass one.
    ///
    /// Nothing is computed or written until a fetch or push needs it.
    pub async fn set_tile(&self, tile: Arc<dyn TileInfo>) {
        self.cache.set_tile(tile).await;
    }

    /// Sweep behind [`Baseliner::push_master`]. With `force_target` the
    /// target's baseline is written even when its fingerprint is
    /// unchanged, which repairs an object missing from the store.
    async fn sweep_master(
        &self,
        tile: Option<Arc<dyn TileInfo>>,
        target: Option<&CommitHash>,
        force_target: bool,
    ) -> Result<Option<Baseline>> {
        if !self.can_write() {
            return Err(BaselinerError::NoDestination);
        }
        let tile = self.resolve_tile(tile).await?;

        let exps = self.expectations.master().await?;
        let extra = self.catch_up_commits(tile.as_ref()).await?;
        let baselines = baselines_per_commit(&exps, tile.as_ref(), &extra);

        let previous = self.cache.written().await;
        let mut written = HashMap::with_capacity(baselines.len());
        let mut writes = JoinSet::new();
        let mut unchanged = 0usize;

        for (hash, baseline) in &baselines {
            written.insert(hash.clone(), baseline.fingerprint().clone());
            let forced = force_target && target == Some(hash);
            if !forced && previous.get(hash) == Some(baseline.fingerprint()) {
                unchanged += 1;
                continue;
            }
            let store = Arc::clone(&self.store);
            let baseline = baseline.clone();
            writes.spawn(async move { store.write_baseline(&baseline).await });
        }

        let pending = writes.len();
        while let Some(joined) = writes.join_next().await {
            match joined {
                Ok(Ok(path)) => debug!(path = %path, "wrote baseline"),
                Ok(Err(e)) => {
                    writes.abort_all();
                    error!(error = %e, pending, "baseline write failed, aborting push");
                    return Err(e.into());
                }
                Err(e) => {
                    writes.abort_all();
                    error!(error = %e, pending, "baseline write task failed, aborting push");
                    return Err(BaselinerError::Task(e.to_string()));
                }
            }
        }

        info!(
            commits = baselines.len(),
            extra = extra.len(),
            written = pending,
            unchanged,
            "pushed master baselines"
        );

        let result = target.and_then(|hash| baselines.get(hash).cloned());
        self.cache.swap_generation(tile, baselines, written).await;
        Ok(result)
    }

    /// Derive and store the baseline of a changelist.
    ///
    /// The changelist's own triage decisions take precedence over master's.
    /// The result is always written, even when unchanged.
    pub async fn push_issue(&self, issue: IssueId, tile: Option<Arc<dyn TileInfo>>) -> Result<()> {
        if !self.can_write() {
            return Err(BaselinerError::NoDestination);
        }
        let tile = self.resolve_tile(tile).await?;

        let entry = self.tryjobs.issue_tryjobs(issue).await?;
        let master = self.expectations.master().await?;
        let own = self.expectations.for_issue(issue).await?;
        let exps = master.merged_with(&own);

        let baseline = baseline_for_issue(
            issue,
            entry.issue.code_review_system,
            &entry.tryjobs,
            &entry.results,
            &exps,
            tile.all_commits(),
        );
        self.cache.put_issue(issue, baseline.clone()).await;
        let path = self.store.write_baseline(&baseline).await?;

        info!(
            issue = %issue,
            tryjobs = entry.tryjobs.len(),
            entries = baseline.expectations().num_entries(),
            fingerprint = %baseline.fingerprint(),
            path = %path,
            "pushed issue baseline"
        );
        Ok(())
    }

    /// Baseline for a commit, a changelist, or a changelist on top of a
    /// commit.
    ///
    /// Without `commit` the last commit of the current tile is used. With
    /// `issue_only` the changelist's own baseline is returned without
    /// master's entries.
    pub async fn fetch(
        &self,
        commit: Option<&CommitHash>,
        issue: Option<IssueId>,
        issue_only: bool,
    ) -> Result<Baseline> {
        let need_master = !(issue_only && issue.is_some());

        let master = async {
            if need_master {
                self.master_baseline(commit).await.map(Some)
            } else {
                Ok(None)
            }
        };
        let changelist = async {
            match issue {
                Some(issue) => self.issue_baseline(issue).await.map(Some),
                None => Ok(None),
            }
        };
        let (master, changelist) = tokio::try_join!(master, changelist)?;

        Ok(match (master, changelist) {
            (Some(master), Some(cl)) => gold_baseline::merge(&master, &cl),
            (None, Some(cl)) => gold_baseline::issue_only(&cl),
            (Some(master), None) => master,
            (None, None) => Baseline::empty(),
        })
    }

    // ── internals ───────────────────────────────────────────────────────

    async fn resolve_tile(&self, tile: Option<Arc<dyn TileInfo>>) -> Result<Arc<dyn TileInfo>> {
        match tile {
            Some(tile) => Ok(tile),
            None => self
                .cache
                .current_tile()
                .await
                .ok_or(BaselinerError::NoTile),
        }
    }

    /// Commits landed after the tile's last commit.
    async fn catch_up_commits(&self, tile: &dyn TileInfo) -> Result<Vec<Commit>> {
        let Some(last) = tile.all_commits().last() else {
            return Ok(Vec::new());
        };
        match self.vcs.commits_after(&last.hash).await {
            Ok(commits) => Ok(commits),
            Err(VcsError::UnknownCommit(hash)) => {
                warn!(commit = %hash, "tile head unknown to repository, no catch-up commits");
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn master_baseline(&self, commit: Option<&CommitHash>) -> Result<Baseline> {
        let hash = match commit {
            Some(hash) => hash.clone(),
            None => {
                let last = match self.cache.current_tile().await {
                    Some(tile) => tile.all_commits().last().map(|c| c.hash.clone()),
                    None => None,
                };
                match last {
                    Some(hash) => hash,
                    None => return Ok(Baseline::empty()),
                }
            }
        };

        if let Some(baseline) = self.cache.get_commit(&hash).await {
            return Ok(baseline);
        }

        if let Some(baseline) = self
            .store
            .read_baseline(&BaselineKey::Commit(hash.clone()))
            .await?
        {
            if !baseline.verify_fingerprint() {
                warn!(commit = %hash, fingerprint = %baseline.fingerprint(), "stored baseline fingerprint mismatch");
            }
            self.cache.put_commit(hash, baseline.clone()).await;
            return Ok(baseline);
        }

        let details = self.vcs.details(&hash).await?;
        if !details.is_on(&self.config.branch) {
            return Err(BaselinerError::NotOnBranch {
                commit: hash,
                branch: self.config.branch.clone(),
            });
        }

        info!(commit = %hash.short(), "baseline missing from store, recomputing");
        self.sweep_master(None, Some(&hash), true)
            .await?
            .ok_or(BaselinerError::BaselineUnavailable(hash))
    }

    async fn issue_baseline(&self, issue: IssueId) -> Result<Baseline> {
        if let Some(baseline) = self.cache.get_issue(issue).await {
            return Ok(baseline);
        }
        if let Some(baseline) = self.store.read_baseline(&BaselineKey::Issue(issue)).await? {
            if !baseline.verify_fingerprint() {
                warn!(issue = %issue, fingerprint = %baseline.fingerprint(), "stored baseline fingerprint mismatch");
            }
            self.cache.put_issue(issue, baseline.clone()).await;
            return Ok(baseline);
        }
        debug!(issue = %issue, "no baseline stored for issue");
        Ok(Baseline::empty_for_issue(issue, None))
    }
}
