//! Try-job storage.

use crate::error::TryjobStoreError;
use async_trait::async_trait;
use gold_baseline::{Issue, IssueTryjobs, Tryjob, TryjobResult, Versioned};
use gold_types::IssueId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[async_trait]
pub trait TryjobStore: Send + Sync {
    /// The issue with all of its try-jobs and their results.
    async fn issue_tryjobs(&self, issue: IssueId) -> Result<IssueTryjobs, TryjobStoreError>;
}

/// Store `incoming` in `slot` unless the current value is newer.
///
/// Returns `true` when `slot` was updated. Equal versions replace the
/// current value so a re-ingested entity refreshes its payload.
pub fn compare_and_swap<T: Versioned>(slot: &mut Option<T>, incoming: T) -> bool {
    match slot {
        Some(current) if current.is_newer_than(&incoming) => false,
        _ => {
            *slot = Some(incoming);
            true
        }
    }
}

#[derive(Debug, Clone, Default)]
struct IssueRecord {
    issue: Option<Issue>,
    tryjobs: HashMap<String, Option<Tryjob>>,
    results: HashMap<String, Vec<TryjobResult>>,
}

/// In-memory try-job store. Issues and try-jobs are versioned: a write
/// carrying an older `updated` timestamp than the stored copy is dropped.
#[derive(Default)]
pub struct InMemoryTryjobStore {
    issues: Arc<RwLock<HashMap<IssueId, IssueRecord>>>,
}

impl InMemoryTryjobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load complete entries, as found in a snapshot's `tryjobs.json`.
    pub async fn load(&self, entries: Vec<IssueTryjobs>) {
        for entry in entries {
            self.put_issue(entry.issue).await;
            for (tryjob, results) in entry.tryjobs.into_iter().zip(entry.results) {
                let id = tryjob.id.clone();
                let issue = tryjob.issue;
                self.put_tryjob(tryjob).await;
                self.put_results(issue, &id, results).await;
            }
        }
    }

    pub async fn put_issue(&self, issue: Issue) -> bool {
        let mut issues = self.issues.write().await;
        let record = issues.entry(issue.id).or_default();
        compare_and_swap(&mut record.issue, issue)
    }

    pub async fn put_tryjob(&self, tryjob: Tryjob) -> bool {
        let mut issues = self.issues.write().await;
        let record = issues.entry(tryjob.issue).or_default();
        let slot = record.tryjobs.entry(tryjob.id.clone()).or_default();
        compare_and_swap(slot, tryjob)
    }

    pub async fn put_results(&self, issue: IssueId, tryjob_id: &str, results: Vec<TryjobResult>) {
        let mut issues = self.issues.write().await;
        issues
            .entry(issue)
            .or_default()
            .results
            .insert(tryjob_id.to_string(), results);
    }
}

#[async_trait]
impl TryjobStore for InMemoryTryjobStore {
    async fn issue_tryjobs(&self, issue: IssueId) -> Result<IssueTryjobs, TryjobStoreError> {
        let issues = self.issues.read().await;
        let record = issues
            .get(&issue)
            .ok_or(TryjobStoreError::UnknownIssue(issue.get()))?;
        let meta = record
            .issue
            .clone()
            .ok_or(TryjobStoreError::UnknownIssue(issue.get()))?;

        let mut tryjobs: Vec<Tryjob> = record.tryjobs.values().flatten().cloned().collect();
        tryjobs.sort_by(|a, b| a.patchset.cmp(&b.patchset).then_with(|| a.id.cmp(&b.id)));
        let results = tryjobs
            .iter()
            .map(|tj| record.results.get(&tj.id).cloned().unwrap_or_default())
            .collect();

        Ok(IssueTryjobs {
            issue: meta,
            tryjobs,
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use gold_baseline::fixtures;

    #[test]
    fn cas_newer_wins() {
        let old = fixtures::issue();
        let newer = Issue {
            subject: "v2".to_string(),
            updated: old.updated + Duration::seconds(5),
            ..old.clone()
        };

        let mut slot = None;
        assert!(compare_and_swap(&mut slot, newer.clone()));
        assert!(!compare_and_swap(&mut slot, old));
        assert_eq!(slot.unwrap().subject, "v2");
    }

    #[tokio::test]
    async fn stale_tryjob_is_dropped() {
        let store = InMemoryTryjobStore::new();
        store.load(vec![fixtures::issue_tryjobs()]).await;

        let mut stale = fixtures::issue_tryjobs().tryjobs[0].clone();
        stale.updated = stale.updated - Duration::hours(1);
        stale.builder = "stale-builder".to_string();
        assert!(!store.put_tryjob(stale).await);

        let got = store.issue_tryjobs(fixtures::issue_id()).await.unwrap();
        assert_eq!(got.tryjobs.len(), 2);
        assert!(got.tryjobs.iter().all(|tj| tj.builder != "stale-builder"));
    }

    #[tokio::test]
    async fn results_line_up_with_tryjobs() {
        let store = InMemoryTryjobStore::new();
        store.load(vec![fixtures::issue_tryjobs()]).await;
        let got = store.issue_tryjobs(fixtures::issue_id()).await.unwrap();
        assert_eq!(got.results.len(), got.tryjobs.len());
        for (tj, results) in got.tryjobs.iter().zip(&got.results) {
            assert!(results.iter().all(|r| r.tryjob_id == tj.id));
        }
    }

    #[tokio::test]
    async fn unknown_issue_is_an_error() {
        let store = InMemoryTryjobStore::new();
        assert!(store.issue_tryjobs(fixtures::issue_id()).await.is_err());
    }
}
