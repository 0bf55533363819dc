//! Combining a changelist baseline with the master baseline.

use crate::baseline::Baseline;

/// Effective baseline for a change: `master` with every `(test, digest)` of
/// `issue` layered on top.
///
/// Entries of `issue` replace master's entry for the same pair; entries only
/// in master are carried through, so a change can accept a new digest for a
/// test without hiding the digests master already accepts for it. Commit
/// identity and counters come from `master`, issue identity from `issue`.
/// Both inputs are borrowed immutably and the result is a fresh value.
pub fn merge(master: &Baseline, issue: &Baseline) -> Baseline {
    let expectations = master.expectations().merged_with(issue.expectations());
    Baseline::from_parts(
        master.start_commit().cloned(),
        master.end_commit().cloned(),
        master.total(),
        master.filled(),
        expectations,
        issue.issue(),
        issue.code_review_system(),
    )
}

/// The changelist's own baseline with master identity blanked. For
/// inspection only; triage decisions always use [`merge`].
pub fn issue_only(issue: &Baseline) -> Baseline {
    issue.without_commits()
}
