//! goldb - Gold baseline CLI

mod snapshot;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gold_baseline::{Baseline, Expectations, Fingerprint, TileInfo};
use gold_baseliner::{
    BaselineStore, Baseliner, BaselinerConfig, Collaborators, InMemoryBaselineStore,
    SledBaselineStore,
};
use gold_types::{CommitHash, IssueId};
use snapshot::Snapshot;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "goldb")]
#[command(about = "Push and fetch Gold baselines")]
struct Cli {
    /// Directory with tile.json, expectations.json, vcs.json, tryjobs.json
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// Sled database for baselines (overrides GOLD_BASELINE_STORE_PATH)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recompute and store master baselines for every commit in the tile
    PushMaster {
        #[arg(long)]
        commit: Option<String>,
    },
    /// Recompute and store the baseline of a changelist
    PushIssue {
        #[arg(long)]
        issue: i64,
    },
    /// Print the baseline for a commit and/or changelist
    Fetch {
        #[arg(long)]
        commit: Option<String>,
        #[arg(long)]
        issue: Option<i64>,
        #[arg(long)]
        issue_only: bool,
    },
    /// Print the fingerprint of an expectations JSON file
    Fingerprint {
        /// Path to a JSON file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let baseline = match cli.command {
        Commands::Fingerprint { file } => {
            let exps: Expectations = snapshot::read_json(&file)?;
            println!("{}", Fingerprint::of(&exps.positive_only()).as_str());
            return Ok(());
        }
        Commands::PushMaster { commit } => {
            let session = Session::open(cli.snapshot, cli.store).await?;
            let target = commit.map(CommitHash::new).transpose()?.or(session.head);
            let pushed = session
                .baseliner
                .push_master(session.tile, target.as_ref())
                .await?;
            info!(target = ?target, found = pushed.is_some(), "push-master done");
            pushed.unwrap_or_else(Baseline::empty)
        }
        Commands::PushIssue { issue } => {
            let session = Session::open(cli.snapshot, cli.store).await?;
            let issue = IssueId::new(issue)?;
            session.baseliner.push_issue(issue, session.tile).await?;
            session.baseliner.fetch(None, Some(issue), true).await?
        }
        Commands::Fetch {
            commit,
            issue,
            issue_only,
        } => {
            let session = Session::open(cli.snapshot, cli.store).await?;
            // a fresh process has no cached tile: seed it so a missing
            // object can be recomputed, and default to the snapshot head
            if let Some(tile) = session.tile {
                session.baseliner.set_tile(tile).await;
            }
            let commit = commit.map(CommitHash::new).transpose()?.or(session.head);
            let issue = issue.map(IssueId::new).transpose()?;
            session
                .baseliner
                .fetch(commit.as_ref(), issue, issue_only)
                .await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&baseline)?);
    Ok(())
}

/// A baseliner wired to the snapshot directory and the configured store.
struct Session {
    baseliner: Baseliner,
    tile: Option<Arc<dyn TileInfo>>,
    head: Option<CommitHash>,
}

impl Session {
    async fn open(snapshot_dir: Option<PathBuf>, store: Option<PathBuf>) -> Result<Self> {
        let mut config = BaselinerConfig::from_env()?;
        if let Some(path) = store {
            config.store_path = Some(path);
        }
        let snapshot = Snapshot::load(snapshot_dir.as_deref())?;
        let tile: Option<Arc<dyn TileInfo>> = snapshot
            .tile
            .clone()
            .map(|t| Arc::new(t) as Arc<dyn TileInfo>);
        let head = tile
            .as_ref()
            .and_then(|t| t.all_commits().last().map(|c| c.hash.clone()));

        let deps = Collaborators {
            store: open_store(&config)?,
            expectations: Arc::new(snapshot.expectations_store().await?),
            vcs: Arc::new(snapshot.vcs()),
            tryjobs: Arc::new(snapshot.tryjob_store().await),
        };
        Ok(Self {
            baseliner: Baseliner::new(config, deps),
            tile,
            head,
        })
    }
}

fn open_store(config: &BaselinerConfig) -> Result<Arc<dyn BaselineStore>> {
    match &config.store_path {
        Some(path) => {
            let path = path.to_string_lossy();
            let store = SledBaselineStore::open(&path)
                .with_context(|| format!("opening baseline store at {}", path))?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("no baseline store configured, using a throwaway in-memory store");
            Ok(Arc::new(InMemoryBaselineStore::new()))
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,gold_baseliner=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
