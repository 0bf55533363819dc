//! Per-commit baseline sweep over a tile.

use crate::baseline::Baseline;
use crate::expectations::Expectations;
use crate::tile::{Commit, TileInfo};
use gold_types::{CommitHash, Digest, Label};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, error, warn};

/// Compute one baseline for every commit of the tile plus `extra_commits`.
///
/// Each trace is walked oldest to newest. A digest joins the trace's
/// accepted set the first time it is seen with a `Positive` classification
/// and never leaves it, so commit `i` accepts every image its trace was ever
/// positive for up to and including `i`, not only the image seen at `i`.
///
/// Commits without trace data (sparse window entries and `extra_commits`)
/// inherit the baseline of the nearest preceding commit. A commit with no
/// preceding baseline is logged and left out.
pub fn baselines_per_commit(
    exps: &Expectations,
    tile_info: &dyn TileInfo,
    extra_commits: &[Commit],
) -> HashMap<CommitHash, Baseline> {
    let all_commits: Vec<&Commit> = chronological(tile_info.all_commits(), extra_commits);
    if all_commits.is_empty() {
        return HashMap::new();
    }

    let dense_commits = tile_info.data_commits();
    let tile = tile_info.tile(true);
    let start_commit = all_commits.first().map(|c| (*c).clone());

    let mut per_commit: Vec<Expectations> = vec![Expectations::new(); dense_commits.len()];
    let mut total = 0usize;

    for (trace_id, trace) in &tile.traces {
        let Some(test) = trace.test_name() else {
            warn!(trace_id = %trace_id, "trace has no test name, skipping");
            continue;
        };
        total += 1;

        let mut accepted: BTreeSet<&Digest> = BTreeSet::new();
        for (idx, digest) in trace.digests.iter().take(dense_commits.len()).enumerate() {
            if !digest.is_missing()
                && !accepted.contains(digest)
                && exps.classification(&test, digest) == Label::Positive
            {
                accepted.insert(digest);
            }

            for accepted_digest in &accepted {
                per_commit[idx].set_label(test.clone(), (*accepted_digest).clone(), Label::Positive);
            }
        }
    }

    let mut result = HashMap::with_capacity(all_commits.len());
    for (commit, commit_exps) in dense_commits.iter().zip(per_commit) {
        let filled = commit_exps.num_entries();
        let baseline =
            Baseline::for_commit(start_commit.clone(), commit.clone(), total, filled, commit_exps);
        result.insert(commit.hash.clone(), baseline);
    }

    let mut previous: Option<Baseline> = None;
    for commit in all_commits {
        if let Some(baseline) = result.get(&commit.hash) {
            previous = Some(baseline.clone());
            continue;
        }
        match &previous {
            Some(prev) => {
                let carried = prev.with_end_commit(commit.clone());
                previous = Some(carried.clone());
                result.insert(commit.hash.clone(), carried);
            }
            None => {
                error!(
                    commit = %commit.hash,
                    "no preceding dense baseline for commit; tile data is inconsistent"
                );
            }
        }
    }

    debug!(
        commits = result.len(),
        dense = dense_commits.len(),
        traces = total,
        "swept baselines"
    );
    result
}

/// `base` followed by the commits of `extra` not already listed, in order.
fn chronological<'a>(base: &'a [Commit], extra: &'a [Commit]) -> Vec<&'a Commit> {
    let mut seen: HashSet<&CommitHash> = HashSet::with_capacity(base.len() + extra.len());
    base.iter()
        .chain(extra.iter())
        .filter(|c| seen.insert(&c.hash))
        .collect()
}
