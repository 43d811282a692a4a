//! CLI type definitions: command enums and argument structs.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use shelf_core::{ReconcilePolicy, SourceKind};

#[derive(Parser)]
#[command(name = "shelf")]
#[command(about = "Reconcile installed and owned game libraries", long_about = None)]
pub(crate) struct Cli {
    /// Only show warnings and errors (suppress normal output)
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Enable verbose/debug logging (timestamps + debug-level messages)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Policy flags. Each flag turns its setting on over the saved defaults.
#[derive(Args, Clone, Default)]
pub(crate) struct PolicyArgs {
    /// Keep only entities installed on this machine
    #[arg(long)]
    pub installed_only: bool,

    /// Drop DLC and addons
    #[arg(long)]
    pub base_only: bool,

    /// Keep only entities backed by an owned/catalog record
    #[arg(long)]
    pub owned_only: bool,

    /// Keep entities hidden in the launcher
    #[arg(long)]
    pub include_hidden: bool,

    /// Account to scope catalog reads to
    #[arg(long)]
    pub account: Option<String>,
}

impl PolicyArgs {
    /// Layer these flags over `base`.
    pub fn apply(&self, base: ReconcilePolicy) -> ReconcilePolicy {
        let mut policy = base;
        policy.installed_only |= self.installed_only;
        policy.base_only |= self.base_only;
        policy.owned_only |= self.owned_only;
        policy.include_hidden |= self.include_hidden;
        if let Some(account) = &self.account {
            policy.account = Some(account.clone());
        }
        policy
    }
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Reconcile one source's installed records against its owned records
    Reconcile {
        /// Installed-side snapshot (YAML or JSON)
        #[arg(long, requires = "owned", conflicts_with = "db")]
        installed: Option<PathBuf>,

        /// Owned-side snapshot (YAML or JSON)
        #[arg(long, requires = "installed", conflicts_with = "db")]
        owned: Option<PathBuf>,

        /// Hidden-flag annotation snapshot
        #[arg(long, conflicts_with = "db")]
        hidden: Option<PathBuf>,

        /// Relationship-hint annotation snapshot
        #[arg(long, conflicts_with = "db")]
        relationships: Option<PathBuf>,

        /// Launcher library database to read both sides from
        #[arg(long, required_unless_present = "installed")]
        db: Option<PathBuf>,

        /// Source the records belong to (e.g., steam, gog, egs)
        #[arg(short, long)]
        source: Option<SourceKind>,

        #[command(flatten)]
        policy: PolicyArgs,

        /// Print outcomes as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Reconcile every snapshot directory under a root concurrently
    Run {
        /// Directory of per-source snapshot directories
        dir: PathBuf,

        #[command(flatten)]
        policy: PolicyArgs,

        /// Print outcomes as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// List supported sources and their aliases
    Sources,

    /// Manage saved settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Show the settings file and the effective default policy
    Show,

    /// Print the settings file path
    Path,

    /// Save default policy flags (unset flags are saved as off)
    SetPolicy {
        #[command(flatten)]
        policy: PolicyArgs,
    },
}
