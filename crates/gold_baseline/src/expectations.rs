//! Triage expectations: TestName → Digest → Label.

use gold_types::{Digest, Label, TestName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Labels for every triaged digest of one test.
pub type DigestLabels = BTreeMap<Digest, Label>;

/// The triage table. Both levels are sorted so iteration order (and with it
/// the fingerprint) does not depend on insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Expectations(BTreeMap<TestName, DigestLabels>);

impl Expectations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label for `(test, digest)`; `Untriaged` when nothing was recorded.
    pub fn classification(&self, test: &TestName, digest: &Digest) -> Label {
        self.0
            .get(test)
            .and_then(|digests| digests.get(digest))
            .copied()
            .unwrap_or_default()
    }

    pub fn set_label(&mut self, test: TestName, digest: Digest, label: Label) {
        self.0.entry(test).or_default().insert(digest, label);
    }

    /// Builder-style `set_label`.
    pub fn with_label(mut self, test: TestName, digest: Digest, label: Label) -> Self {
        self.set_label(test, digest, label);
        self
    }

    pub fn digests(&self, test: &TestName) -> Option<&DigestLabels> {
        self.0.get(test)
    }

    /// Copy of `self` where every `(test, digest)` of `overlay` replaces the
    /// entry here. Entries only present in `self` are kept.
    pub fn merged_with(&self, overlay: &Expectations) -> Expectations {
        let mut out = self.clone();
        for (test, digests) in &overlay.0 {
            let slot = out.0.entry(test.clone()).or_default();
            for (digest, label) in digests {
                slot.insert(digest.clone(), *label);
            }
        }
        out
    }

    /// Copy restricted to `Positive` entries; tests left without any
    /// positive digest are dropped.
    pub fn positive_only(&self) -> Expectations {
        let map = self
            .0
            .iter()
            .filter_map(|(test, digests)| {
                let positives: DigestLabels = digests
                    .iter()
                    .filter(|(_, label)| label.is_positive())
                    .map(|(d, l)| (d.clone(), *l))
                    .collect();
                (!positives.is_empty()).then(|| (test.clone(), positives))
            })
            .collect();
        Expectations(map)
    }

    /// In-place variant of [`Expectations::positive_only`].
    pub(crate) fn retain_positive(&mut self) {
        for digests in self.0.values_mut() {
            digests.retain(|_, label| label.is_positive());
        }
        self.0.retain(|_, digests| !digests.is_empty());
    }

    /// Number of `(test, digest)` pairs.
    pub fn num_entries(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    /// Number of tests with at least one entry.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TestName, &DigestLabels)> {
        self.0.iter()
    }

    pub fn as_map(&self) -> &BTreeMap<TestName, DigestLabels> {
        &self.0
    }
}

impl From<BTreeMap<TestName, DigestLabels>> for Expectations {
    fn from(map: BTreeMap<TestName, DigestLabels>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> TestName {
        TestName::new_unchecked(s)
    }

    fn d(s: &str) -> Digest {
        Digest::new_unchecked(s)
    }

    #[test]
    fn unknown_pair_is_untriaged() {
        let exps = Expectations::new().with_label(t("alpha"), d("aa"), Label::Positive);
        assert_eq!(exps.classification(&t("alpha"), &d("aa")), Label::Positive);
        assert_eq!(exps.classification(&t("alpha"), &d("bb")), Label::Untriaged);
        assert_eq!(exps.classification(&t("beta"), &d("aa")), Label::Untriaged);
    }

    #[test]
    fn merged_with_overrides_per_pair() {
        let base = Expectations::new()
            .with_label(t("alpha"), d("aa"), Label::Positive)
            .with_label(t("alpha"), d("bb"), Label::Negative);
        let overlay = Expectations::new().with_label(t("alpha"), d("bb"), Label::Positive);

        let merged = base.merged_with(&overlay);
        assert_eq!(merged.classification(&t("alpha"), &d("aa")), Label::Positive);
        assert_eq!(merged.classification(&t("alpha"), &d("bb")), Label::Positive);
        // the receiver is untouched
        assert_eq!(base.classification(&t("alpha"), &d("bb")), Label::Negative);
    }

    #[test]
    fn positive_only_drops_other_labels_and_empty_tests() {
        let exps = Expectations::new()
            .with_label(t("alpha"), d("aa"), Label::Positive)
            .with_label(t("alpha"), d("bb"), Label::Negative)
            .with_label(t("beta"), d("cc"), Label::Untriaged);

        let positives = exps.positive_only();
        assert_eq!(positives.num_entries(), 1);
        assert_eq!(positives.len(), 1);
        assert!(positives.digests(&t("beta")).is_none());
    }

    #[test]
    fn serializes_as_nested_object() {
        let exps = Expectations::new().with_label(t("alpha"), d("aa"), Label::Negative);
        let json = serde_json::to_string(&exps).unwrap();
        assert_eq!(json, r#"{"alpha":{"aa":"negative"}}"#);
    }
}
