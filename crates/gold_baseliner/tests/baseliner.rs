use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gold_baseline::{fixtures, Baseline, Commit, TileInfo};
use gold_baseliner::{
    BaselineKey, BaselineReader, BaselineWriter, Baseliner, BaselinerConfig, BaselinerError,
    Collaborators, CommitDetails, InMemoryBaselineStore, InMemoryExpectationsStore,
    InMemoryTryjobStore, InMemoryVcs, StoreError, VcsSnapshot,
};
use gold_types::{CommitHash, Label};

struct Harness {
    baseliner: Baseliner,
    store: Arc<InMemoryBaselineStore>,
    expectations: Arc<InMemoryExpectationsStore>,
    vcs: Arc<InMemoryVcs>,
}

async fn harness_with(config: BaselinerConfig, store: Arc<InMemoryBaselineStore>) -> Harness {
    let expectations = Arc::new(InMemoryExpectationsStore::new(fixtures::expectations()));
    expectations
        .set_issue(fixtures::issue_id(), fixtures::issue_expectations())
        .await;

    let vcs = Arc::new(InMemoryVcs::new("master"));
    for commit in fixtures::commits() {
        vcs.push_commit(commit).await;
    }

    let tryjobs = Arc::new(InMemoryTryjobStore::new());
    tryjobs.load(vec![fixtures::issue_tryjobs()]).await;

    let baseliner = Baseliner::new(
        config,
        Collaborators {
            store: store.clone(),
            expectations: expectations.clone(),
            vcs: vcs.clone(),
            tryjobs,
        },
    );
    Harness {
        baseliner,
        store,
        expectations,
        vcs,
    }
}

async fn harness() -> Harness {
    harness_with(
        BaselinerConfig::default(),
        Arc::new(InMemoryBaselineStore::new()),
    )
    .await
}

fn tile() -> Option<Arc<dyn TileInfo>> {
    Some(Arc::new(fixtures::snapshot()))
}

fn hash(h: &str) -> CommitHash {
    fixtures::commit_hash(h)
}

// ── push_master ─────────────────────────────────────────────────────────

#[tokio::test]
async fn push_writes_every_commit_once() {
    let h = harness().await;
    let third = hash(fixtures::THIRD_COMMIT);

    let target = h
        .baseliner
        .push_master(tile(), Some(&third))
        .await
        .expect("push")
        .expect("target baseline");
    assert_eq!(target.commit_hash(), Some(&third));
    assert_eq!(target.filled(), 2);
    assert_eq!(target.total(), 6);
    assert_eq!(h.store.write_count(), 3);

    // nothing changed: the second cycle performs no writes
    h.baseliner.push_master(tile(), None).await.expect("second push");
    assert_eq!(h.store.write_count(), 3);
}

#[tokio::test]
async fn push_with_target_skips_unchanged_target() {
    let h = harness().await;
    let third = hash(fixtures::THIRD_COMMIT);
    h.baseliner.push_master(tile(), Some(&third)).await.unwrap();
    let again = h
        .baseliner
        .push_master(tile(), Some(&third))
        .await
        .unwrap()
        .expect("target baseline");
    assert_eq!(again.commit_hash(), Some(&third));
    assert_eq!(h.store.write_count(), 3);
}

#[tokio::test]
async fn push_rewrites_only_changed_commits() {
    let h = harness().await;
    h.baseliner.push_master(tile(), None).await.expect("push");

    // crosshatch's alpha image only appears at the third commit
    let triaged = fixtures::expectations().with_label(
        fixtures::test_name(fixtures::ALPHA),
        fixtures::digest(fixtures::ALPHA_UNTRIAGED_1),
        Label::Positive,
    );
    h.expectations.set_master(triaged).await;
    h.baseliner.push_master(None, None).await.expect("repush");

    assert_eq!(h.store.write_count(), 4);
    let stored = h
        .store
        .read_baseline(&BaselineKey::Commit(hash(fixtures::THIRD_COMMIT)))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.filled(), 3);
}

#[tokio::test]
async fn push_covers_commits_newer_than_tile() {
    let h = harness().await;
    let fourth = Commit::new(
        hash("c0ffee0000000000000000000000000000000004"),
        fixtures::commits()[2].commit_time + chrono::Duration::minutes(1),
        "dev@example.com",
    );
    h.vcs.push_commit(fourth.clone()).await;

    let got = h
        .baseliner
        .push_master(tile(), Some(&fourth.hash))
        .await
        .unwrap()
        .expect("catch-up commit has a baseline");
    let third = h
        .baseliner
        .fetch(Some(&hash(fixtures::THIRD_COMMIT)), None, false)
        .await
        .unwrap();
    assert_eq!(got.fingerprint(), third.fingerprint());
    assert_eq!(h.store.write_count(), 4);
}

#[tokio::test]
async fn push_without_tile_fails() {
    let h = harness().await;
    let err = h.baseliner.push_master(None, None).await.unwrap_err();
    assert!(matches!(err, BaselinerError::NoTile));
}

#[tokio::test]
async fn read_only_store_cannot_push() {
    let h = harness_with(
        BaselinerConfig::default(),
        Arc::new(InMemoryBaselineStore::read_only()),
    )
    .await;
    assert!(!h.baseliner.can_write());
    assert!(matches!(
        h.baseliner.push_master(tile(), None).await,
        Err(BaselinerError::NoDestination)
    ));
    assert!(matches!(
        h.baseliner.push_issue(fixtures::issue_id(), tile()).await,
        Err(BaselinerError::NoDestination)
    ));
}

// ── failure atomicity ───────────────────────────────────────────────────

/// Fails every write for one commit, delegates everything else.
struct FailingStore {
    inner: InMemoryBaselineStore,
    poisoned: CommitHash,
    attempts: AtomicUsize,
}

#[async_trait]
impl BaselineReader for FailingStore {
    async fn read_baseline(&self, key: &BaselineKey) -> Result<Option<Baseline>, StoreError> {
        self.inner.read_baseline(key).await
    }
}

#[async_trait]
impl BaselineWriter for FailingStore {
    async fn write_baseline(&self, baseline: &Baseline) -> Result<String, StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if baseline.commit_hash() == Some(&self.poisoned) {
            return Err(StoreError::Backend("disk full".to_string()));
        }
        self.inner.write_baseline(baseline).await
    }

    fn destination(&self) -> Option<&str> {
        self.inner.destination()
    }
}

#[tokio::test]
async fn failed_write_leaves_cache_untouched() {
    let store = Arc::new(FailingStore {
        inner: InMemoryBaselineStore::new(),
        poisoned: hash(fixtures::SECOND_COMMIT),
        attempts: AtomicUsize::new(0),
    });
    let baseliner = Baseliner::new(
        BaselinerConfig::default(),
        Collaborators {
            store: store.clone(),
            expectations: Arc::new(InMemoryExpectationsStore::new(fixtures::expectations())),
            vcs: Arc::new(InMemoryVcs::new("master")),
            tryjobs: Arc::new(InMemoryTryjobStore::new()),
        },
    );

    let err = baseliner.push_master(tile(), None).await.unwrap_err();
    assert!(matches!(err, BaselinerError::Store(StoreError::Backend(_))));
    assert!(store.attempts.load(Ordering::SeqCst) >= 1);

    // no generation was installed
    let fetched = baseliner.fetch(None, None, false).await.unwrap();
    assert!(fetched.is_empty());
    assert!(fetched.commit_hash().is_none());
    assert!(matches!(
        baseliner.push_master(None, None).await,
        Err(BaselinerError::NoTile)
    ));
}

// ── fetch ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_before_any_push_is_empty() {
    let h = harness().await;
    let b = h.baseliner.fetch(None, None, false).await.unwrap();
    assert!(b.is_empty());
    assert!(b.fingerprint().is_empty_baseline());
}

#[tokio::test]
async fn fetch_defaults_to_tile_head_from_cache() {
    let h = harness().await;
    h.baseliner.push_master(tile(), None).await.unwrap();

    let b = h.baseliner.fetch(None, None, false).await.unwrap();
    assert_eq!(b.commit_hash(), Some(&hash(fixtures::THIRD_COMMIT)));
    assert_eq!(h.baseliner.cache_stats().commit_hits, 1);
}

#[tokio::test]
async fn fetch_reads_through_to_store() {
    let store = Arc::new(InMemoryBaselineStore::new());
    let writer = harness_with(BaselinerConfig::default(), store.clone()).await;
    writer.baseliner.push_master(tile(), None).await.unwrap();

    // a second process sharing the store, without a tile of its own
    let reader = harness_with(BaselinerConfig::default(), store.clone()).await;
    let first = hash(fixtures::FIRST_COMMIT);
    let b = reader.baseliner.fetch(Some(&first), None, false).await.unwrap();
    assert_eq!(b.filled(), 1);
    assert_eq!(store.write_count(), 3);

    reader.baseliner.fetch(Some(&first), None, false).await.unwrap();
    let stats = reader.baseliner.cache_stats();
    assert_eq!((stats.commit_hits, stats.commit_misses), (1, 1));
}

#[tokio::test]
async fn fetch_recomputes_missing_object_once() {
    let config = BaselinerConfig {
        commit_cache_ttl: Duration::from_millis(1),
        ..BaselinerConfig::default()
    };
    let h = harness_with(config, Arc::new(InMemoryBaselineStore::new())).await;
    h.baseliner.push_master(tile(), None).await.unwrap();
    let second = hash(fixtures::SECOND_COMMIT);
    let key = BaselineKey::Commit(second.clone());
    let original = h.store.read_baseline(&key).await.unwrap().unwrap();

    assert!(h.store.remove(&key).await);
    tokio::time::sleep(Duration::from_millis(20)).await;

    let healed = h.baseliner.fetch(Some(&second), None, false).await.unwrap();
    assert_eq!(healed.fingerprint(), original.fingerprint());
    assert_eq!(h.store.write_count(), 4);
    assert!(h.store.read_baseline(&key).await.unwrap().is_some());
}

#[tokio::test]
async fn fetch_with_seeded_tile_recomputes_into_empty_store() {
    let h = harness().await;
    h.baseliner
        .set_tile(Arc::new(fixtures::snapshot()))
        .await;
    let third = hash(fixtures::THIRD_COMMIT);

    let b = h.baseliner.fetch(Some(&third), None, false).await.unwrap();
    assert_eq!(b.commit_hash(), Some(&third));
    assert_eq!(b.filled(), 2);
    assert_eq!(h.store.write_count(), 3);
    assert!(h
        .store
        .read_baseline(&BaselineKey::Commit(third))
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn fetch_without_tile_cannot_recompute() {
    let h = harness().await;
    let third = hash(fixtures::THIRD_COMMIT);
    let err = h.baseliner.fetch(Some(&third), None, false).await.unwrap_err();
    assert!(matches!(err, BaselinerError::NoTile));
}

/// Re-encode a stored baseline with a fingerprint that does not match its
/// expectations.
async fn tamper(store: &InMemoryBaselineStore, key: &BaselineKey, fingerprint: &str) {
    let stored = store.read_baseline(key).await.unwrap().expect("stored baseline");
    let mut json = serde_json::to_value(&stored).unwrap();
    json["fingerprint"] = serde_json::Value::String(fingerprint.to_string());
    store.put_raw(key, serde_json::to_vec(&json).unwrap()).await;
}

#[tokio::test]
async fn tampered_master_baseline_is_served_and_cached() {
    let store = Arc::new(InMemoryBaselineStore::new());
    let writer = harness_with(BaselinerConfig::default(), store.clone()).await;
    writer.baseliner.push_master(tile(), None).await.unwrap();
    let second = hash(fixtures::SECOND_COMMIT);
    tamper(&store, &BaselineKey::Commit(second.clone()), "ééééééééééééé").await;

    let reader = harness_with(BaselinerConfig::default(), store.clone()).await;
    let b = reader.baseliner.fetch(Some(&second), None, false).await.unwrap();
    assert!(!b.verify_fingerprint());
    assert_eq!(b.fingerprint().as_str(), "ééééééééééééé");
    assert_eq!(b.fingerprint().to_string(), "éééééééé…éééé");

    let again = reader.baseliner.fetch(Some(&second), None, false).await.unwrap();
    assert_eq!(again.fingerprint(), b.fingerprint());
    let stats = reader.baseliner.cache_stats();
    assert_eq!((stats.commit_hits, stats.commit_misses), (1, 1));
    assert_eq!(store.write_count(), 3);
}

#[tokio::test]
async fn tampered_issue_baseline_is_served_and_cached() {
    let store = Arc::new(InMemoryBaselineStore::new());
    let writer = harness_with(BaselinerConfig::default(), store.clone()).await;
    writer
        .baseliner
        .push_issue(fixtures::issue_id(), tile())
        .await
        .unwrap();
    tamper(&store, &BaselineKey::Issue(fixtures::issue_id()), "€€").await;

    let reader = harness_with(BaselinerConfig::default(), store.clone()).await;
    for _ in 0..2 {
        let b = reader
            .baseliner
            .fetch(None, Some(fixtures::issue_id()), true)
            .await
            .unwrap();
        assert!(!b.verify_fingerprint());
        assert_eq!(b.fingerprint().to_string(), "€€");
        assert_eq!(b.expectations().num_entries(), 2);
    }
    let stats = reader.baseliner.cache_stats();
    assert_eq!((stats.issue_hits, stats.issue_misses), (1, 1));
}

#[tokio::test]
async fn fetch_rejects_commits_off_branch() {
    let h = harness().await;
    h.baseliner.push_master(tile(), None).await.unwrap();
    let stray = hash("5eed");
    h.vcs
        .add_stray(CommitDetails {
            hash: stray.clone(),
            branches: vec!["feature".to_string()],
            timestamp: fixtures::commits()[0].commit_time,
        })
        .await;

    let err = h.baseliner.fetch(Some(&stray), None, false).await.unwrap_err();
    assert!(matches!(err, BaselinerError::NotOnBranch { .. }));
}

#[tokio::test]
async fn fetch_branch_commit_before_tile_is_unavailable() {
    let old = Commit::new(hash("01d0"), fixtures::commits()[0].commit_time, "dev@example.com");
    let mut history = vec![old.clone()];
    history.extend(fixtures::commits());
    let vcs = InMemoryVcs::from_snapshot(VcsSnapshot {
        commits: history,
        branch: "master".to_string(),
        other: Vec::new(),
    });
    let baseliner = Baseliner::new(
        BaselinerConfig::default(),
        Collaborators {
            store: Arc::new(InMemoryBaselineStore::new()),
            expectations: Arc::new(InMemoryExpectationsStore::new(fixtures::expectations())),
            vcs: Arc::new(vcs),
            tryjobs: Arc::new(InMemoryTryjobStore::new()),
        },
    );
    baseliner.push_master(tile(), None).await.unwrap();

    // on the branch, but the sweep has nothing to extrapolate it from
    let err = baseliner
        .fetch(Some(&old.hash), None, false)
        .await
        .unwrap_err();
    assert!(matches!(err, BaselinerError::BaselineUnavailable(_)));
}

// ── changelists ─────────────────────────────────────────────────────────

#[tokio::test]
async fn changelist_baseline_merges_over_master() {
    let h = harness().await;
    h.baseliner.push_master(tile(), None).await.unwrap();
    h.baseliner
        .push_issue(fixtures::issue_id(), None)
        .await
        .unwrap();

    let merged = h
        .baseliner
        .fetch(None, Some(fixtures::issue_id()), false)
        .await
        .unwrap();
    let alpha = merged
        .expectations()
        .digests(&fixtures::test_name(fixtures::ALPHA))
        .unwrap();
    assert!(alpha.contains_key(&fixtures::digest(fixtures::ALPHA_GOOD_1)));
    assert!(alpha.contains_key(&fixtures::digest(fixtures::ALPHA_GOOD_2)));
    assert!(!alpha.contains_key(&fixtures::digest(fixtures::ALPHA_BAD_1)));
    assert_eq!(merged.expectations().num_entries(), 3);
    assert_eq!(merged.issue(), Some(fixtures::issue_id()));
    assert_eq!(merged.commit_hash(), Some(&hash(fixtures::THIRD_COMMIT)));

    let only = h
        .baseliner
        .fetch(None, Some(fixtures::issue_id()), true)
        .await
        .unwrap();
    assert_eq!(only.expectations().num_entries(), 2);
    assert!(only.commit_hash().is_none());
}

#[tokio::test]
async fn issue_push_writes_even_when_unchanged() {
    let h = harness().await;
    h.baseliner.push_issue(fixtures::issue_id(), tile()).await.unwrap();
    h.baseliner.push_issue(fixtures::issue_id(), tile()).await.unwrap();
    assert_eq!(h.store.write_count(), 2);
}

#[tokio::test]
async fn unknown_issue_push_fails_before_writing() {
    let h = harness().await;
    let unknown = gold_types::IssueId::new(99).unwrap();
    assert!(matches!(
        h.baseliner.push_issue(unknown, tile()).await,
        Err(BaselinerError::Tryjobs(_))
    ));
    assert_eq!(h.store.write_count(), 0);
}

#[tokio::test]
async fn issue_without_baseline_yields_master_content() {
    let h = harness().await;
    h.baseliner.push_master(tile(), None).await.unwrap();
    let master = h.baseliner.fetch(None, None, false).await.unwrap();
    let issue = gold_types::IssueId::new(777).unwrap();

    let b = h.baseliner.fetch(None, Some(issue), false).await.unwrap();
    assert_eq!(b.fingerprint(), master.fingerprint());
    assert_eq!(b.issue(), Some(issue));
}

#[tokio::test]
async fn stored_issue_baseline_is_cached_after_first_read() {
    let store = Arc::new(InMemoryBaselineStore::new());
    let writer = harness_with(BaselinerConfig::default(), store.clone()).await;
    writer
        .baseliner
        .push_issue(fixtures::issue_id(), tile())
        .await
        .unwrap();

    let reader = harness_with(BaselinerConfig::default(), store).await;
    for _ in 0..2 {
        let b = reader
            .baseliner
            .fetch(None, Some(fixtures::issue_id()), true)
            .await
            .unwrap();
        assert_eq!(b.expectations().num_entries(), 2);
    }
    let stats = reader.baseliner.cache_stats();
    assert_eq!((stats.issue_hits, stats.issue_misses), (1, 1));
}
