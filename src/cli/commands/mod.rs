use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::RescueConfig;
use crate::detection::Severity;
use crate::recovery::RecoveryCoordinator;

pub mod backup;
pub mod detect;
pub mod explain;
pub mod plan;
pub mod recover;

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}

pub fn repository_root(repo: &Path) -> Result<PathBuf> {
    std::path::absolute(repo).with_context(|| format!("Cannot resolve repository path {}", repo.display()))
}

pub fn open_coordinator(repo: &Path, config: &RescueConfig) -> Result<RecoveryCoordinator> {
    Ok(RecoveryCoordinator::open(repository_root(repo)?, config))
}

pub fn severity_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "🔴",
        Severity::High => "🟠",
        Severity::Medium => "🟡",
        Severity::Low => "🔵",
    }
}

pub fn show_getting_started() -> Result<()> {
    println!("🩺 git-rescue - repository integrity diagnosis and recovery");
    println!();
    println!("To get started:");
    println!("  🔍 git-rescue detect            # Scan for corruption");
    println!("  📋 git-rescue plan              # Preview the recovery plan");
    println!("  🔧 git-rescue recover           # Repair the repository");
    println!("  💾 git-rescue backup create     # Snapshot before risky work");
    println!("  💡 git-rescue explain \"<error>\" # Decode a git error message");
    println!();
    println!("💡 Start with 'git-rescue detect'.");
    Ok(())
}

/// Ask on stdin; anything but y/yes declines.
pub fn confirm(prompt: &str) -> Result<bool> {
    use std::io::Write;

    print!("{prompt} [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
