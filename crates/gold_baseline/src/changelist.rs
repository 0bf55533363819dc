//! Baselines for in-review changes, derived from try-job results.

use crate::baseline::Baseline;
use crate::expectations::Expectations;
use crate::tile::Commit;
use chrono::{DateTime, Utc};
use gold_types::{CodeReviewSystem, CommitHash, Digest, IssueId, Label, TestName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Entities written by several producers; the newer copy wins.
pub trait Versioned {
    fn is_newer_than(&self, other: &Self) -> bool;
}

/// A changelist as known to its code review system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub code_review_system: CodeReviewSystem,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub owner: String,
    pub updated: DateTime<Utc>,
}

impl Versioned for Issue {
    fn is_newer_than(&self, other: &Self) -> bool {
        self.updated > other.updated
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TryjobStatus {
    #[default]
    Scheduled,
    Running,
    Complete,
    Ingested,
    Failed,
}

/// One automated run for a patchset of a changelist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tryjob {
    pub id: String,
    pub issue: IssueId,
    pub patchset: u32,
    pub builder: String,
    /// Master commit the patchset was applied to.
    pub base_commit: CommitHash,
    #[serde(default)]
    pub status: TryjobStatus,
    pub updated: DateTime<Utc>,
}

impl Versioned for Tryjob {
    fn is_newer_than(&self, other: &Self) -> bool {
        self.updated > other.updated
    }
}

/// One image reported by a try-job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TryjobResult {
    pub tryjob_id: String,
    pub test_name: TestName,
    pub digest: Digest,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

/// Everything known about a changelist's try-jobs. `results[i]` holds the
/// results of `tryjobs[i]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueTryjobs {
    pub issue: Issue,
    pub tryjobs: Vec<Tryjob>,
    pub results: Vec<Vec<TryjobResult>>,
}

/// Baseline of what `issue` accepts on top of master.
///
/// Holds only the digests reported by the change's try-jobs that `exps`
/// classifies as positive; it is meant to be merged with a master baseline,
/// not used alone. Start and end commit are the earliest and latest base
/// commit of any try-job, by position in `commits`.
pub fn baseline_for_issue(
    issue: IssueId,
    code_review_system: CodeReviewSystem,
    tryjobs: &[Tryjob],
    results: &[Vec<TryjobResult>],
    exps: &Expectations,
    commits: &[Commit],
) -> Baseline {
    let positions: BTreeMap<&CommitHash, usize> = commits
        .iter()
        .enumerate()
        .map(|(idx, c)| (&c.hash, idx))
        .collect();

    let mut earliest: Option<usize> = None;
    let mut latest: Option<usize> = None;
    for tryjob in tryjobs {
        if let Some(&idx) = positions.get(&tryjob.base_commit) {
            earliest = Some(earliest.map_or(idx, |e| e.min(idx)));
            latest = Some(latest.map_or(idx, |l| l.max(idx)));
        }
    }

    let mut accepted = Expectations::new();
    for result in results.iter().flatten() {
        if result.digest.is_missing() {
            continue;
        }
        if exps.classification(&result.test_name, &result.digest) == Label::Positive {
            accepted.set_label(result.test_name.clone(), result.digest.clone(), Label::Positive);
        }
    }

    Baseline::for_issue(
        issue,
        code_review_system,
        earliest.map(|idx| commits[idx].clone()),
        latest.map(|idx| commits[idx].clone()),
        accepted,
    )
}
