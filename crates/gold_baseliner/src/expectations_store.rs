//! Triage state: master expectations plus per-changelist overrides.

use crate::error::ExpectationsError;
use async_trait::async_trait;
use gold_baseline::Expectations;
use gold_types::IssueId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[async_trait]
pub trait ExpectationsStore: Send + Sync {
    /// Current master expectations. Every call returns a fresh snapshot.
    async fn master(&self) -> Result<Expectations, ExpectationsError>;

    /// Expectations recorded on the changelist itself, without master.
    async fn for_issue(&self, issue: IssueId) -> Result<Expectations, ExpectationsError>;
}

#[derive(Default)]
pub struct InMemoryExpectationsStore {
    master: Arc<RwLock<Expectations>>,
    issues: Arc<RwLock<HashMap<IssueId, Expectations>>>,
}

impl InMemoryExpectationsStore {
    pub fn new(master: Expectations) -> Self {
        Self {
            master: Arc::new(RwLock::new(master)),
            issues: Arc::default(),
        }
    }

    pub async fn set_master(&self, exps: Expectations) {
        *self.master.write().await = exps;
    }

    pub async fn set_issue(&self, issue: IssueId, exps: Expectations) {
        self.issues.write().await.insert(issue, exps);
    }
}

#[async_trait]
impl ExpectationsStore for InMemoryExpectationsStore {
    async fn master(&self) -> Result<Expectations, ExpectationsError> {
        Ok(self.master.read().await.clone())
    }

    async fn for_issue(&self, issue: IssueId) -> Result<Expectations, ExpectationsError> {
        Ok(self
            .issues
            .read()
            .await
            .get(&issue)
            .cloned()
            .unwrap_or_default())
    }
}
