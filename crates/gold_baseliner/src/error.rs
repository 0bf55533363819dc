//! Error types for the baseliner and its collaborators.

use gold_types::CommitHash;

/// Errors from a baseline object store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Store is read-only")]
    ReadOnly,
}

/// Errors from the version-control inspector.
#[derive(Debug, thiserror::Error)]
pub enum VcsError {
    #[error("Unknown commit: {0}")]
    UnknownCommit(CommitHash),
    #[error("VCS error: {0}")]
    Backend(String),
}

/// Errors from the try-job store.
#[derive(Debug, thiserror::Error)]
pub enum TryjobStoreError {
    #[error("Unknown issue: {0}")]
    UnknownIssue(i64),
    #[error("Try-job store error: {0}")]
    Backend(String),
}

/// Errors from the expectations store.
#[derive(Debug, thiserror::Error)]
pub enum ExpectationsError {
    #[error("Expectations store error: {0}")]
    Backend(String),
}

/// Errors surfaced by [`crate::Baseliner`].
#[derive(Debug, thiserror::Error)]
pub enum BaselinerError {
    #[error("Baseliner has no write destination")]
    NoDestination,
    #[error("No tile available")]
    NoTile,
    #[error("Commit {commit} is not on branch {branch}")]
    NotOnBranch { commit: CommitHash, branch: String },
    #[error("No baseline could be computed for commit {0}")]
    BaselineUnavailable(CommitHash),
    #[error("Write task failed: {0}")]
    Task(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Vcs(#[from] VcsError),
    #[error(transparent)]
    Tryjobs(#[from] TryjobStoreError),
    #[error(transparent)]
    Expectations(#[from] ExpectationsError),
}

pub type Result<T> = std::result::Result<T, BaselinerError>;
