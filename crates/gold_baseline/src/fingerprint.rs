//! Content fingerprint of a baseline's digest map.
//!
//! Computed as `BLAKE3(canon(expectations))` where `canon` walks the sorted
//! map and length-prefixes every field. Insertion order never affects the
//! result, so two baselines with the same entries share a fingerprint.

use crate::expectations::Expectations;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

static EMPTY: Lazy<Fingerprint> = Lazy::new(|| Fingerprint::of(&Expectations::new()));

/// Hex-encoded BLAKE3 digest of a canonical expectations encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(exps: &Expectations) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(exps.len() as u64).to_le_bytes());
        for (test, digests) in exps.iter() {
            update_field(&mut hasher, test.as_str());
            hasher.update(&(digests.len() as u64).to_le_bytes());
            for (digest, label) in digests {
                update_field(&mut hasher, digest.as_str());
                update_field(&mut hasher, label.as_str());
            }
        }
        Self(hex::encode(hasher.finalize().as_bytes()))
    }

    /// Fingerprint of a baseline without entries. Computed once.
    pub fn empty() -> &'static Fingerprint {
        &EMPTY
    }

    pub fn is_empty_baseline(&self) -> bool {
        self == Self::empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn update_field(hasher: &mut blake3::Hasher, field: &str) {
    hasher.update(&(field.len() as u64).to_le_bytes());
    hasher.update(field.as_bytes());
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // stored fingerprints are not validated, so slice on char boundaries
        let chars = self.0.chars().count();
        if chars < 12 {
            return f.write_str(&self.0);
        }
        let head: String = self.0.chars().take(8).collect();
        let tail: String = self.0.chars().skip(chars - 4).collect();
        write!(f, "{}…{}", head, tail)
    }
}
