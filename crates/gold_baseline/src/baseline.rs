//! The computed baseline: accepted digests per test at a commit or for a CL.

use crate::expectations::Expectations;
use crate::fingerprint::Fingerprint;
use crate::tile::Commit;
use gold_types::{CodeReviewSystem, CommitHash, IssueId};
use serde::{Deserialize, Serialize};

/// Positive digests per test, for a master commit or for an in-review change.
///
/// Fields are private and every constructor computes the fingerprint, so a
/// `Baseline` is never observed with a stale fingerprint or with a
/// non-positive entry. "Changing" a baseline means building a new one.
/// Equality is fingerprint equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Baseline {
    #[serde(default)]
    start_commit: Option<Commit>,
    #[serde(default)]
    end_commit: Option<Commit>,
    #[serde(default)]
    total: usize,
    #[serde(default)]
    filled: usize,
    fingerprint: Fingerprint,
    #[serde(default)]
    expectations: Expectations,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    issue: Option<IssueId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    code_review_system: Option<CodeReviewSystem>,
}

impl Baseline {
    /// Master baseline at `end_commit`.
    pub fn for_commit(
        start_commit: Option<Commit>,
        end_commit: Commit,
        total: usize,
        filled: usize,
        expectations: Expectations,
    ) -> Self {
        Self::from_parts(
            start_commit,
            Some(end_commit),
            total,
            filled,
            expectations,
            None,
            None,
        )
    }

    /// Baseline of an in-review change. Counters are always zero.
    pub fn for_issue(
        issue: IssueId,
        code_review_system: CodeReviewSystem,
        start_commit: Option<Commit>,
        end_commit: Option<Commit>,
        expectations: Expectations,
    ) -> Self {
        Self::from_parts(
            start_commit,
            end_commit,
            0,
            0,
            expectations,
            Some(issue),
            Some(code_review_system),
        )
    }

    /// Baseline without commit, issue or entries.
    pub fn empty() -> Self {
        Self {
            start_commit: None,
            end_commit: None,
            total: 0,
            filled: 0,
            fingerprint: Fingerprint::empty().clone(),
            expectations: Expectations::new(),
            issue: None,
            code_review_system: None,
        }
    }

    /// Empty baseline attached to `issue`, for changes with no stored data.
    pub fn empty_for_issue(issue: IssueId, code_review_system: Option<CodeReviewSystem>) -> Self {
        Self {
            issue: Some(issue),
            code_review_system,
            ..Self::empty()
        }
    }

    pub(crate) fn from_parts(
        start_commit: Option<Commit>,
        end_commit: Option<Commit>,
        total: usize,
        filled: usize,
        mut expectations: Expectations,
        issue: Option<IssueId>,
        code_review_system: Option<CodeReviewSystem>,
    ) -> Self {
        expectations.retain_positive();
        let fingerprint = Fingerprint::of(&expectations);
        Self {
            start_commit,
            end_commit,
            total,
            filled,
            fingerprint,
            expectations,
            issue,
            code_review_system,
        }
    }

    /// Same content (and fingerprint) identified by another end commit.
    pub fn with_end_commit(&self, end_commit: Commit) -> Self {
        Self {
            end_commit: Some(end_commit),
            ..self.clone()
        }
    }

    /// Same content with start and end commit blanked.
    pub fn without_commits(&self) -> Self {
        Self {
            start_commit: None,
            end_commit: None,
            ..self.clone()
        }
    }

    pub fn start_commit(&self) -> Option<&Commit> {
        self.start_commit.as_ref()
    }

    pub fn end_commit(&self) -> Option<&Commit> {
        self.end_commit.as_ref()
    }

    /// Hash of the master commit this baseline belongs to, if any.
    pub fn commit_hash(&self) -> Option<&CommitHash> {
        self.end_commit.as_ref().map(|c| &c.hash)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn filled(&self) -> usize {
        self.filled
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn expectations(&self) -> &Expectations {
        &self.expectations
    }

    pub fn issue(&self) -> Option<IssueId> {
        self.issue
    }

    pub fn code_review_system(&self) -> Option<CodeReviewSystem> {
        self.code_review_system
    }

    pub fn is_empty(&self) -> bool {
        self.expectations.is_empty()
    }

    /// Recompute the fingerprint and compare with the stored one. Only
    /// deserialized baselines can disagree.
    pub fn verify_fingerprint(&self) -> bool {
        Fingerprint::of(&self.expectations) == self.fingerprint
    }
}

impl PartialEq for Baseline {
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint == other.fingerprint
    }
}

impl Eq for Baseline {}
