use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::RescueConfig;
use crate::recovery::MaxDataLoss;
use commands::backup::BackupCommand;
use commands::detect::DetectCommand;
use commands::explain::ExplainCommand;
use commands::plan::PlanCommand;
use commands::recover::RecoverCommand;
use commands::Command;

pub mod commands;

#[derive(Parser)]
#[command(name = "git-rescue")]
#[command(version)]
#[command(about = "Diagnose and repair corrupted git repositories")]
#[command(long_about = "git-rescue scans a repository's objects, index, references, lock files and \
                       in-progress operations, then builds a risk-ranked recovery plan and executes it \
                       with an optional backup as a safety net. Start with 'git-rescue detect'.")]
pub struct Cli {
    /// Repository to operate on
    #[arg(long, global = true, default_value = ".", help = "Path to the repository root")]
    pub repo: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan the repository for corruption
    Detect {
        /// Print the detection result as JSON
        #[arg(long, help = "Emit the full detection result as JSON")]
        json: bool,
        /// Skip the object database scan
        #[arg(long, help = "Fast pre-flight check; only critical and high issues block")]
        quick: bool,
    },
    /// Show the recovery plan without executing it
    Plan {
        #[arg(long, help = "Emit the plan as JSON")]
        json: bool,
        #[arg(long, help = "Use aggressive garbage collection and repacking")]
        aggressive: bool,
        #[arg(long, help = "Highest tolerated data loss: none, minimal, moderate, acceptable")]
        max_data_loss: Option<MaxDataLoss>,
    },
    /// Detect, plan and execute a recovery
    Recover {
        /// Skip the confirmation prompt
        #[arg(short = 'y', long, help = "Execute without asking for confirmation")]
        yes: bool,
        #[arg(long, help = "Use aggressive garbage collection and repacking")]
        aggressive: bool,
        #[arg(long, help = "Do not create a backup unless an action demands one")]
        no_backup: bool,
        #[arg(long, help = "Highest tolerated data loss: none, minimal, moderate, acceptable")]
        max_data_loss: Option<MaxDataLoss>,
        #[arg(long, help = "Emit the recovery result as JSON")]
        json: bool,
    },
    /// Create, inspect and restore repository backups
    Backup {
        #[command(subcommand)]
        action: BackupCommands,
    },
    /// Explain a git error message and suggest recovery steps
    Explain {
        /// The error text, in one or more arguments
        #[arg(required = true, num_args = 1.., help = "Error text as printed by git")]
        text: Vec<String>,
        #[arg(long, help = "Emit the analysis as JSON")]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum BackupCommands {
    /// Snapshot the repository
    Create {
        #[arg(long, help = "Why the backup is being taken")]
        reason: Option<String>,
        #[arg(long, help = "Store the backup as a single tar.gz archive")]
        compress: bool,
        #[arg(long, help = "Skip copying working tree files")]
        no_working_tree: bool,
    },
    /// List backups, newest first
    List {
        #[arg(long, help = "Emit the manifests as JSON")]
        json: bool,
    },
    /// Show one backup's manifest
    Info { id: String },
    /// Restore a backup into the repository
    Restore {
        id: String,
        #[arg(long = "path", help = "Restore only this path (repeatable)")]
        paths: Vec<PathBuf>,
        #[arg(long, help = "Take --path files from the bundled commit instead of the working tree copy")]
        from_bundle: bool,
        #[arg(long, help = "Do not stash current changes first")]
        no_stash: bool,
        #[arg(long, help = "Do not restore config, hooks and info")]
        no_metadata: bool,
        #[arg(long, help = "Switch to this branch afterwards")]
        branch: Option<String>,
    },
    /// Delete a backup
    Delete { id: String },
    /// Delete all but the newest backups
    Cleanup {
        #[arg(long, help = "How many backups to keep (defaults to the configured maximum)")]
        keep: Option<usize>,
    },
    /// Show disk usage of the backup directory
    Usage,
    /// Check that a backup is complete and its bundle is readable
    Verify { id: String },
}

impl Cli {
    pub async fn run(self, config: RescueConfig) -> Result<()> {
        let repo = self.repo;
        match self.command {
            None => commands::show_getting_started(),
            Some(Commands::Detect { json, quick }) => {
                DetectCommand {
                    repo,
                    config,
                    json,
                    quick,
                }
                .execute()
                .await
            }
            Some(Commands::Plan {
                json,
                aggressive,
                max_data_loss,
            }) => {
                PlanCommand {
                    repo,
                    config,
                    json,
                    aggressive,
                    max_data_loss,
                }
                .execute()
                .await
            }
            Some(Commands::Recover {
                yes,
                aggressive,
                no_backup,
                max_data_loss,
                json,
            }) => {
                RecoverCommand {
                    repo,
                    config,
                    yes,
                    aggressive,
                    no_backup,
                    max_data_loss,
                    json,
                }
                .execute()
                .await
            }
            Some(Commands::Backup { action }) => BackupCommand { repo, config, action }.execute().await,
            Some(Commands::Explain { text, json }) => {
                ExplainCommand {
                    text: text.join(" "),
                    json,
                }
                .execute()
                .await
            }
        }
    }
}
