//! Small deterministic data set shared by the workspace tests.
//!
//! Three devices (angler, bullhead, crosshatch) run two tests (alpha, beta)
//! over three commits. Every device draws alpha "bad" at the first two
//! commits; at the third, angler and bullhead switch to "good" while
//! crosshatch produces an untriaged image. Beta is "good" wherever it is
//! triaged.

use crate::changelist::{Issue, IssueTryjobs, Tryjob, TryjobResult, TryjobStatus};
use crate::expectations::Expectations;
use crate::tile::{Commit, Tile, TileSnapshot, Trace, TEST_NAME_PARAM};
use chrono::{DateTime, TimeZone, Utc};
use gold_types::{CodeReviewSystem, CommitHash, Digest, IssueId, Label, TestName};
use std::collections::BTreeMap;

pub const ALPHA: &str = "alpha";
pub const BETA: &str = "beta";

pub const ALPHA_BAD_1: &str = "a1bad0000000000000000000000000a1";
pub const ALPHA_GOOD_1: &str = "a1600d00000000000000000000000001";
pub const ALPHA_GOOD_2: &str = "a1600d00000000000000000000000002";
pub const ALPHA_UNTRIAGED_1: &str = "a1000000000000000000000000000001";
pub const BETA_GOOD_1: &str = "b1600d00000000000000000000000001";
pub const BETA_UNTRIAGED_1: &str = "b1000000000000000000000000000001";

pub const FIRST_COMMIT: &str = "c0ffee0000000000000000000000000000000001";
pub const SECOND_COMMIT: &str = "c0ffee0000000000000000000000000000000002";
pub const THIRD_COMMIT: &str = "c0ffee0000000000000000000000000000000003";

pub const ISSUE_ID: i64 = 1234;

const MISSING: &str = "";

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_560_000_000 + secs, 0)
        .single()
        .unwrap_or_default()
}

pub fn test_name(name: &str) -> TestName {
    TestName::new_unchecked(name)
}

pub fn digest(hex: &str) -> Digest {
    Digest::new_unchecked(hex)
}

pub fn commit_hash(hash: &str) -> CommitHash {
    CommitHash::new_unchecked(hash)
}

pub fn issue_id() -> IssueId {
    IssueId::new_unchecked(ISSUE_ID)
}

pub fn commits() -> Vec<Commit> {
    [FIRST_COMMIT, SECOND_COMMIT, THIRD_COMMIT]
        .iter()
        .enumerate()
        .map(|(idx, hash)| Commit::new(commit_hash(hash), at(idx as i64 * 60), "dev@example.com"))
        .collect()
}

fn trace(device: &str, test: &str, digests: [&str; 3]) -> (String, Trace) {
    let params = BTreeMap::from([
        ("device".to_string(), device.to_string()),
        (TEST_NAME_PARAM.to_string(), test.to_string()),
        ("source_type".to_string(), "gm".to_string()),
    ]);
    let id = format!(",device={},name={},source_type=gm,", device, test);
    (id, Trace::new(params, digests.iter().map(|d| digest(d)).collect()))
}

pub fn tile() -> Tile {
    let traces = BTreeMap::from([
        trace("angler", ALPHA, [ALPHA_BAD_1, ALPHA_BAD_1, ALPHA_GOOD_1]),
        trace("angler", BETA, [BETA_GOOD_1, BETA_GOOD_1, BETA_GOOD_1]),
        trace("bullhead", ALPHA, [ALPHA_BAD_1, ALPHA_BAD_1, ALPHA_GOOD_1]),
        trace("bullhead", BETA, [BETA_GOOD_1, MISSING, BETA_GOOD_1]),
        trace("crosshatch", ALPHA, [ALPHA_BAD_1, ALPHA_BAD_1, ALPHA_UNTRIAGED_1]),
        trace("crosshatch", BETA, [BETA_UNTRIAGED_1, BETA_GOOD_1, BETA_GOOD_1]),
    ]);
    Tile {
        commits: commits(),
        traces,
    }
}

pub fn snapshot() -> TileSnapshot {
    TileSnapshot::dense(tile())
}

pub fn expectations() -> Expectations {
    Expectations::new()
        .with_label(test_name(ALPHA), digest(ALPHA_BAD_1), Label::Negative)
        .with_label(test_name(ALPHA), digest(ALPHA_GOOD_1), Label::Positive)
        .with_label(test_name(BETA), digest(BETA_GOOD_1), Label::Positive)
}

/// Triage done on the changelist: its new alpha rendering is accepted.
pub fn issue_expectations() -> Expectations {
    Expectations::new().with_label(test_name(ALPHA), digest(ALPHA_GOOD_2), Label::Positive)
}

pub fn issue() -> Issue {
    Issue {
        id: issue_id(),
        code_review_system: CodeReviewSystem::Gerrit,
        subject: "Tweak alpha anti-aliasing".to_string(),
        owner: "dev@example.com".to_string(),
        updated: at(600),
    }
}

/// Two patchsets: the first still draws alpha "bad", the second draws the
/// new good image. Both also draw beta unchanged.
pub fn issue_tryjobs() -> IssueTryjobs {
    let tryjob = |id: &str, patchset: u32| Tryjob {
        id: id.to_string(),
        issue: issue_id(),
        patchset,
        builder: "Test-Android-angler".to_string(),
        base_commit: commit_hash(THIRD_COMMIT),
        status: TryjobStatus::Ingested,
        updated: at(600 + patchset as i64),
    };
    let result = |tryjob_id: &str, test: &str, hex: &str| TryjobResult {
        tryjob_id: tryjob_id.to_string(),
        test_name: test_name(test),
        digest: digest(hex),
        params: BTreeMap::from([("device".to_string(), "angler".to_string())]),
    };

    IssueTryjobs {
        issue: issue(),
        tryjobs: vec![tryjob("tj-ps1", 1), tryjob("tj-ps2", 2)],
        results: vec![
            vec![
                result("tj-ps1", ALPHA, ALPHA_BAD_1),
                result("tj-ps1", BETA, BETA_GOOD_1),
            ],
            vec![
                result("tj-ps2", ALPHA, ALPHA_GOOD_2),
                result("tj-ps2", BETA, BETA_GOOD_1),
            ],
        ],
    }
}
