//! Runtime configuration, read from the environment.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_COMMIT_CACHE_TTL: Duration = Duration::from_secs(60);
pub const DEFAULT_ISSUE_CACHE_CAPACITY: usize = 10_000;
pub const DEFAULT_BRANCH: &str = "master";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselinerConfig {
    /// How long a master baseline stays in the read cache.
    pub commit_cache_ttl: Duration,
    /// Maximum number of changelist baselines kept in memory.
    pub issue_cache_capacity: usize,
    /// Branch fetches are allowed to recompute baselines for.
    pub branch: String,
    /// Location of the persistent baseline store, if any.
    pub store_path: Option<PathBuf>,
}

impl Default for BaselinerConfig {
    fn default() -> Self {
        Self {
            commit_cache_ttl: DEFAULT_COMMIT_CACHE_TTL,
            issue_cache_capacity: DEFAULT_ISSUE_CACHE_CAPACITY,
            branch: DEFAULT_BRANCH.to_string(),
            store_path: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: '{value}'")]
    Invalid { var: &'static str, value: String },
}

impl BaselinerConfig {
    /// Defaults overridden by `GOLD_BASELINE_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(secs) = env_parse::<u64>("GOLD_BASELINE_TTL_SECS")? {
            cfg.commit_cache_ttl = Duration::from_secs(secs);
        }
        if let Some(cap) = env_parse::<usize>("GOLD_BASELINE_ISSUE_CACHE")? {
            if cap == 0 {
                return Err(ConfigError::Invalid {
                    var: "GOLD_BASELINE_ISSUE_CACHE",
                    value: "0".to_string(),
                });
            }
            cfg.issue_cache_capacity = cap;
        }
        if let Ok(branch) = std::env::var("GOLD_BASELINE_BRANCH") {
            if !branch.trim().is_empty() {
                cfg.branch = branch.trim().to_string();
            }
        }
        cfg.store_path = std::env::var("GOLD_BASELINE_STORE_PATH")
            .ok()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        Ok(cfg)
    }
}

fn env_parse<T: std::str::FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
        Err(_) => Ok(None),
    }
}
