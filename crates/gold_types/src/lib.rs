//! Leaf-level newtypes for Gold baselines.
//!
//! These types sit at the bottom of the dependency graph; every crate can
//! depend on `gold_types` without pulling in heavy deps. They replace raw
//! `String`/`i64` usage for digests, test names, commit hashes and issue
//! identifiers, catching misuse at compile time.
//!
//! All string types implement `Serialize`/`Deserialize` as transparent
//! strings so they are wire-compatible with existing JSON formats.

use serde::{Deserialize, Serialize};
use std::fmt;

// ── Digest ──────────────────────────────────────────────────────────────

/// Content hash identifying a rendered test output image.
///
/// Invariant: either empty (the "missing" sentinel, no result at that
/// commit) or a non-empty string of hex characters. Use `Digest::new()` for
/// validated construction, `Digest::missing()` for the sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    /// Validated constructor. Returns `Err` unless the string is hex.
    /// The empty string is accepted and yields the missing digest.
    pub fn new(s: impl Into<String>) -> Result<Self, TypeParseError> {
        let s = s.into();
        if !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeParseError::InvalidChars { kind: "Digest", got: s });
        }
        Ok(Self(s))
    }

    /// Unchecked constructor, for when the source is trusted.
    pub fn new_unchecked(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The "no result at this commit" sentinel.
    pub fn missing() -> Self {
        Self(String::new())
    }

    pub fn is_missing(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ── TestName ────────────────────────────────────────────────────────────

/// Name of a test, as reported under the `name` trace param.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestName(String);

impl TestName {
    /// Validated constructor; rejects empty names.
    pub fn new(s: impl Into<String>) -> Result<Self, TypeParseError> {
        let s = s.into();
        if s.is_empty() {
            return Err(TypeParseError::Empty("TestName"));
        }
        Ok(Self(s))
    }

    /// Unchecked constructor.
    pub fn new_unchecked(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Borrow the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TestName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TestName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ── CommitHash ──────────────────────────────────────────────────────────

/// Git commit hash on the tracked branch.
///
/// Invariant: non-empty, hex only. Abbreviated hashes are allowed so test
/// fixtures can stay readable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitHash(String);

impl CommitHash {
    /// Validated constructor.
    pub fn new(s: impl Into<String>) -> Result<Self, TypeParseError> {
        let s = s.into();
        if s.is_empty() {
            return Err(TypeParseError::Empty("CommitHash"));
        }
        if !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeParseError::InvalidChars {
                kind: "CommitHash",
                got: s,
            });
        }
        Ok(Self(s))
    }

    /// Unchecked constructor.
    pub fn new_unchecked(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// First seven characters, for log lines.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(7) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }

    /// Borrow the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CommitHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CommitHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ── IssueId ─────────────────────────────────────────────────────────────

/// Identifier of a changelist in its code review system.
///
/// Only strictly positive ids denote a real changelist; master-branch
/// requests carry no `IssueId` at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueId(i64);

impl IssueId {
    /// Validated constructor; rejects zero and negative ids.
    pub fn new(id: i64) -> Result<Self, TypeParseError> {
        if id <= 0 {
            return Err(TypeParseError::InvalidFormat {
                kind: "IssueId",
                expected: "positive integer",
                got: id.to_string(),
            });
        }
        Ok(Self(id))
    }

    /// Unchecked constructor, for when the id is known to be positive.
    pub const fn new_unchecked(id: i64) -> Self {
        Self(id)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Label ───────────────────────────────────────────────────────────────

/// Triage verdict for a (test, digest) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    #[default]
    Untriaged,
    Positive,
    Negative,
}

impl Label {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Untriaged => "untriaged",
            Self::Positive => "positive",
            Self::Negative => "negative",
        }
    }

    pub fn is_positive(self) -> bool {
        self == Self::Positive
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Label {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "untriaged" => Ok(Self::Untriaged),
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            other => Err(TypeParseError::InvalidFormat {
                kind: "Label",
                expected: "untriaged|positive|negative",
                got: other.to_string(),
            }),
        }
    }
}

// ── CodeReviewSystem ────────────────────────────────────────────────────

/// Code review system a changelist lives in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeReviewSystem {
    #[default]
    Gerrit,
    GitHub,
}

impl CodeReviewSystem {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gerrit => "gerrit",
            Self::GitHub => "github",
        }
    }
}

impl fmt::Display for CodeReviewSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Errors ──────────────────────────────────────────────────────────────

/// Error returned when constructing a newtype from an invalid value.
#[derive(Debug, Clone)]
pub enum TypeParseError {
    InvalidFormat {
        kind: &'static str,
        expected: &'static str,
        got: String,
    },
    InvalidChars {
        kind: &'static str,
        got: String,
    },
    Empty(&'static str),
}

impl fmt::Display for TypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFormat {
                kind,
                expected,
                got,
            } => {
                write!(
                    f,
                    "invalid {}: expected '{}', got '{}'",
                    kind, expected, got
                )
            }
            Self::InvalidChars { kind, got } => {
                write!(f, "invalid characters in {}: '{}'", kind, got)
            }
            Self::Empty(kind) => {
                write!(f, "{} cannot be empty", kind)
            }
        }
    }
}

impl std::error::Error for TypeParseError {}

// ── Tests ───────────────────────────────────────────────────────────────
