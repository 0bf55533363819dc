//! Gold baselines: the pure half of baseline synchronization.
//!
//! A baseline answers "which image digests are currently accepted for test
//! T?" either at a master commit or for an in-review change. Everything in
//! this crate is synchronous and side-effect free. The sweep turns a tile
//! plus an expectations snapshot into one baseline per commit; try-job
//! results become a changelist baseline that is merged on top of it.
//! Caching, storage and concurrency live in `gold_baseliner`.

pub mod baseline;
pub mod changelist;
pub mod expectations;
pub mod fingerprint;
#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;
pub mod merge;
pub mod sweep;
pub mod tile;

pub use baseline::Baseline;
pub use changelist::{
    baseline_for_issue, Issue, IssueTryjobs, Tryjob, TryjobResult, TryjobStatus, Versioned,
};
pub use expectations::{DigestLabels, Expectations};
pub use fingerprint::Fingerprint;
pub use merge::{issue_only, merge};
pub use sweep::baselines_per_commit;
pub use tile::{Commit, Tile, TileInfo, TileSnapshot, Trace, TraceId, TEST_NAME_PARAM};
