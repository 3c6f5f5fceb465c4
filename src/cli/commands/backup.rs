use anyhow::{bail, Result};
use std::path::PathBuf;

use super::{open_coordinator, Command};
use crate::backup::{BackupInfo, BackupOptions, RestoreOptions};
use crate::cli::BackupCommands;
use crate::config::RescueConfig;

pub struct BackupCommand {
    pub repo: PathBuf,
    pub config: RescueConfig,
    pub action: BackupCommands,
}

impl Command for BackupCommand {
    async fn execute(&self) -> Result<()> {
        let coordinator = open_coordinator(&self.repo, &self.config)?;
        let backups = coordinator.backups();

        match &self.action {
            BackupCommands::Create {
                reason,
                compress,
                no_working_tree,
            } => {
                let options = BackupOptions {
                    reason: reason.clone().unwrap_or_else(|| "Manual backup".to_string()),
                    include_working_tree: no_working_tree.then_some(false),
                    compress: compress.then_some(true),
                };
                println!("💾 Creating backup...");
                let info = backups.create_backup(&options).await?;
                println!("✅ Backup {} created ({})", info.id, human_size(info.size));
                println!("   📁 {}", info.path.display());
            }
            BackupCommands::List { json } => {
                let list = backups.list_backups().await?;
                if *json {
                    println!("{}", serde_json::to_string_pretty(&list)?);
                } else if list.is_empty() {
                    println!("📭 No backups in {}", backups.backup_root().display());
                } else {
                    println!("💾 BACKUPS ({})", list.len());
                    println!("────────────");
                    for info in &list {
                        print_summary(info);
                    }
                }
            }
            BackupCommands::Info { id } => match backups.get_backup_info(id).await? {
                Some(info) => println!("{}", serde_json::to_string_pretty(&info)?),
                None => bail!("Backup {id} not found"),
            },
            BackupCommands::Restore {
                id,
                paths,
                from_bundle,
                no_stash,
                no_metadata,
                branch,
            } => {
                if *from_bundle && paths.is_empty() {
                    bail!("--from-bundle needs at least one --path");
                }
                let selected = (!paths.is_empty()).then(|| paths.clone());
                let options = RestoreOptions {
                    stash_current: !no_stash,
                    partial: if *from_bundle { None } else { selected.clone() },
                    bundle_paths: if *from_bundle { selected } else { None },
                    restore_metadata: !no_metadata,
                    target_branch: branch.clone(),
                };
                println!("♻️  Restoring backup {id}...");
                let result = backups.restore_from_backup(id, &options).await?;
                for warning in &result.warnings {
                    println!("   ⚠️  {warning}");
                }
                if result.success {
                    println!("✅ Restored {} file(s)", result.restored_files.len());
                } else {
                    bail!(result.error.unwrap_or_else(|| format!("Restoring {id} failed")));
                }
            }
            BackupCommands::Delete { id } => {
                if backups.delete_backup(id).await? {
                    println!("🗑️  Deleted {id}");
                } else {
                    bail!("Backup {id} not found");
                }
            }
            BackupCommands::Cleanup { keep } => {
                let keep = keep.unwrap_or(self.config.backup.max_backups);
                let deleted = backups.cleanup_old_backups(keep).await?;
                if deleted.is_empty() {
                    println!("✅ Nothing to clean up (keeping {keep})");
                } else {
                    for id in &deleted {
                        println!("🗑️  Deleted {id}");
                    }
                }
            }
            BackupCommands::Usage => {
                let usage = backups.get_backup_storage_usage().await?;
                println!("📦 {}", usage.directory.display());
                println!("   Backups: {}", usage.backup_count);
                println!("   Size: {}", human_size(usage.total_bytes));
                if let (Some(oldest), Some(newest)) = (usage.oldest, usage.newest) {
                    println!("   Oldest: {}", oldest.format("%Y-%m-%d %H:%M:%S UTC"));
                    println!("   Newest: {}", newest.format("%Y-%m-%d %H:%M:%S UTC"));
                }
            }
            BackupCommands::Verify { id } => {
                let verification = backups.verify_backup(id).await?;
                if verification.valid {
                    println!("✅ Backup {id} is intact");
                } else {
                    println!("❌ Backup {id} has problems:");
                    for problem in &verification.problems {
                        println!("   • {problem}");
                    }
                    bail!("Backup {id} failed verification");
                }
            }
        }
        Ok(())
    }
}

fn print_summary(info: &BackupInfo) {
    println!(
        "{} {}  {}  {}{}",
        if info.compressed { "🗜️ " } else { "📁" },
        info.id,
        info.created_at.format("%Y-%m-%d %H:%M:%S"),
        human_size(info.size),
        info.branch_state
            .branch
            .as_deref()
            .map(|branch| format!("  on {branch}"))
            .unwrap_or_default()
    );
    println!("   {}", info.reason);
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}
