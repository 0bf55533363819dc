//! Loading collaborator state from a snapshot directory.
//!
//! | file               | contents                                   |
//! |--------------------|--------------------------------------------|
//! | `tile.json`        | `TileSnapshot`                             |
//! | `expectations.json`| `{"master": {...}, "issues": {"<id>": {...}}}` |
//! | `vcs.json`         | `VcsSnapshot`                              |
//! | `tryjobs.json`     | list of `IssueTryjobs`                     |
//!
//! Every file is optional; a missing file yields an empty adapter.

use anyhow::{Context, Result};
use gold_baseline::{Expectations, IssueTryjobs, TileSnapshot};
use gold_baseliner::{InMemoryExpectationsStore, InMemoryTryjobStore, InMemoryVcs, VcsSnapshot};
use gold_types::IssueId;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
pub struct ExpectationsFile {
    #[serde(default)]
    pub master: Expectations,
    /// Keyed by issue id; JSON object keys are strings.
    #[serde(default)]
    pub issues: BTreeMap<String, Expectations>,
}

#[derive(Default)]
pub struct Snapshot {
    pub tile: Option<TileSnapshot>,
    pub expectations: ExpectationsFile,
    pub vcs: VcsSnapshot,
    pub tryjobs: Vec<IssueTryjobs>,
}

impl Snapshot {
    pub fn load(dir: Option<&Path>) -> Result<Self> {
        let Some(dir) = dir else {
            return Ok(Self::default());
        };
        Ok(Self {
            tile: read_optional(dir, "tile.json")?,
            expectations: read_optional(dir, "expectations.json")?.unwrap_or_default(),
            vcs: read_optional(dir, "vcs.json")?.unwrap_or_default(),
            tryjobs: read_optional(dir, "tryjobs.json")?.unwrap_or_default(),
        })
    }

    pub async fn expectations_store(&self) -> Result<InMemoryExpectationsStore> {
        let store = InMemoryExpectationsStore::new(self.expectations.master.clone());
        for (raw, exps) in &self.expectations.issues {
            let id: i64 = raw
                .parse()
                .with_context(|| format!("issue key '{}' is not a number", raw))?;
            let issue = IssueId::new(id)?;
            store.set_issue(issue, exps.clone()).await;
        }
        Ok(store)
    }

    pub fn vcs(&self) -> InMemoryVcs {
        InMemoryVcs::from_snapshot(self.vcs.clone())
    }

    pub async fn tryjob_store(&self) -> InMemoryTryjobStore {
        let store = InMemoryTryjobStore::new();
        store.load(self.tryjobs.clone()).await;
        store
    }
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn read_optional<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<Option<T>> {
    let path = dir.join(name);
    if !path.exists() {
        return Ok(None);
    }
    read_json(&path).map(Some)
}
