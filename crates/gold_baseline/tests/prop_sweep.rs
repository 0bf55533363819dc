//! Sweep and merge invariants under property testing:
//! 1. Determinism: the same inputs always give the same fingerprints
//! 2. Monotonic acceptance: a digest accepted at a commit stays accepted
//! 3. Soundness: every baseline entry is positive in the expectations
//! 4. Sparse commits carry the nearest preceding baseline
//! 5. Merge is a union and leaves both inputs untouched

use chrono::{TimeZone, Utc};
use gold_baseline::{
    baselines_per_commit, merge, Baseline, Commit, Expectations, Tile, TileSnapshot, Trace,
    TEST_NAME_PARAM,
};
use gold_types::{CodeReviewSystem, CommitHash, Digest, IssueId, Label, TestName};
use proptest::prelude::*;
use std::collections::BTreeMap;

const DIGESTS: [&str; 4] = ["aa", "bb", "cc", "dd"];
const TESTS: [&str; 2] = ["t0", "t1"];
/// Digest index standing for "no result".
const MISSING: usize = DIGESTS.len();

// ── Test harness ─────────────────────────────────────────────────────────────

fn commit(i: usize) -> Commit {
    Commit::new(
        CommitHash::new_unchecked(format!("c{:04x}", i)),
        Utc.timestamp_opt(1_600_000_000 + i as i64 * 60, 0)
            .single()
            .unwrap(),
        "prop@example.com",
    )
}

fn label(code: u8) -> Label {
    match code {
        1 => Label::Positive,
        2 => Label::Negative,
        _ => Label::Untriaged,
    }
}

/// `labels[t * DIGESTS.len() + d]` labels digest `d` of test `t`.
fn expectations(labels: &[u8]) -> Expectations {
    let mut exps = Expectations::new();
    for (t, test) in TESTS.iter().enumerate() {
        for (d, hex) in DIGESTS.iter().enumerate() {
            exps.set_label(
                TestName::new_unchecked(*test),
                Digest::new_unchecked(*hex),
                label(labels[t * DIGESTS.len() + d]),
            );
        }
    }
    exps
}

fn tile(commits: Vec<Commit>, traces: &[Vec<usize>]) -> Tile {
    let traces = traces
        .iter()
        .enumerate()
        .map(|(k, digests)| {
            let test = TESTS[k % TESTS.len()];
            let params = BTreeMap::from([
                (TEST_NAME_PARAM.to_string(), test.to_string()),
                ("config".to_string(), k.to_string()),
            ]);
            let digests = digests
                .iter()
                .map(|&d| match d {
                    MISSING => Digest::missing(),
                    d => Digest::new_unchecked(DIGESTS[d]),
                })
                .collect();
            (format!(",config={},name={},", k, test), Trace::new(params, digests))
        })
        .collect();
    Tile { commits, traces }
}

fn contains_all(outer: &Expectations, inner: &Expectations) -> bool {
    inner.iter().all(|(test, labels)| {
        labels
            .keys()
            .all(|digest| outer.classification(test, digest) == Label::Positive)
    })
}

/// (commit count, per-trace digest indices, labels)
fn scenario() -> impl Strategy<Value = (usize, Vec<Vec<usize>>, Vec<u8>)> {
    (1usize..6).prop_flat_map(|n| {
        (
            Just(n),
            prop::collection::vec(prop::collection::vec(0usize..=MISSING, n), 1..5),
            prop::collection::vec(0u8..3, TESTS.len() * DIGESTS.len()),
        )
    })
}

// ── Properties ───────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn prop_sweep_deterministic((n, traces, labels) in scenario()) {
        let snapshot = TileSnapshot::dense(tile((0..n).map(commit).collect(), &traces));
        let exps = expectations(&labels);
        let a = baselines_per_commit(&exps, &snapshot, &[]);
        let b = baselines_per_commit(&exps, &snapshot, &[]);
        prop_assert_eq!(a.len(), n);
        for (hash, baseline) in &a {
            prop_assert_eq!(baseline.fingerprint(), b[hash].fingerprint());
        }
    }

    #[test]
    fn prop_acceptance_is_monotonic((n, traces, labels) in scenario()) {
        let commits: Vec<Commit> = (0..n).map(commit).collect();
        let snapshot = TileSnapshot::dense(tile(commits.clone(), &traces));
        let out = baselines_per_commit(&expectations(&labels), &snapshot, &[]);
        for pair in commits.windows(2) {
            let earlier = out[&pair[0].hash].expectations();
            let later = out[&pair[1].hash].expectations();
            prop_assert!(contains_all(later, earlier));
        }
    }

    #[test]
    fn prop_entries_are_positive((n, traces, labels) in scenario()) {
        let exps = expectations(&labels);
        let snapshot = TileSnapshot::dense(tile((0..n).map(commit).collect(), &traces));
        for baseline in baselines_per_commit(&exps, &snapshot, &[]).values() {
            prop_assert!(contains_all(&exps, baseline.expectations()));
            prop_assert_eq!(baseline.filled(), baseline.expectations().num_entries());
            prop_assert!(baseline.verify_fingerprint());
        }
    }

    #[test]
    fn prop_sparse_commits_inherit(
        (n, traces, labels) in scenario(),
        gaps in prop::collection::vec(any::<bool>(), 5),
    ) {
        let dense: Vec<Commit> = (0..n).map(commit).collect();
        let mut all = Vec::new();
        let mut inherited = Vec::new();
        for (i, c) in dense.iter().enumerate() {
            all.push(c.clone());
            if gaps[i] {
                let gap = commit(0x100 + i);
                inherited.push((gap.hash.clone(), c.hash.clone()));
                all.push(gap);
            }
        }

        let snapshot = TileSnapshot::sparse(all.clone(), tile(dense, &traces));
        let out = baselines_per_commit(&expectations(&labels), &snapshot, &[]);
        prop_assert_eq!(out.len(), all.len());
        for (gap, source) in &inherited {
            prop_assert_eq!(out[gap].fingerprint(), out[source].fingerprint());
            prop_assert_eq!(out[gap].commit_hash(), Some(gap));
        }
    }

    #[test]
    fn prop_merge_is_union(
        master_labels in prop::collection::vec(0u8..3, TESTS.len() * DIGESTS.len()),
        issue_labels in prop::collection::vec(0u8..3, TESTS.len() * DIGESTS.len()),
    ) {
        let master = Baseline::for_commit(None, commit(1), 1, 1, expectations(&master_labels));
        let issue = Baseline::for_issue(
            IssueId::new(7).unwrap(),
            CodeReviewSystem::GitHub,
            None,
            None,
            expectations(&issue_labels),
        );
        let master_before = master.expectations().clone();
        let issue_before = issue.expectations().clone();

        let merged = merge(&master, &issue);
        prop_assert!(contains_all(merged.expectations(), master.expectations()));
        prop_assert!(contains_all(merged.expectations(), issue.expectations()));
        let union = master_labels
            .iter()
            .zip(&issue_labels)
            .filter(|(m, i)| **m == 1 || **i == 1)
            .count();
        prop_assert_eq!(merged.expectations().num_entries(), union);

        prop_assert_eq!(master.expectations(), &master_before);
        prop_assert_eq!(issue.expectations(), &issue_before);
    }
}
