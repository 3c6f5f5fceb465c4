//! Object database consistency: `git fsck` plus per-pack verification.

use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use tracing::{debug, warn};

use super::detector::{CheckContext, DetectionError, ScanDepth};
use super::types::{CorruptionIssue, CorruptionType, Severity};

static OBJECT_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[0-9a-f]{40}\b").expect("valid regex"));

pub async fn check(ctx: &CheckContext) -> Result<Vec<CorruptionIssue>, DetectionError> {
    if ctx.depth == ScanDepth::Quick {
        return Ok(Vec::new());
    }

    let mut issues = Vec::new();
    match ctx.git.fsck(ctx.config.fsck_timeout()).await {
        Ok(output) => issues.extend(classify_fsck_output(&output.combined())),
        Err(e) => warn!(error = %e, "Object database scan did not complete"),
    }
    issues.extend(verify_packfiles(ctx).await?);
    Ok(issues)
}

/// Aggregate fsck complaints into at most one missing-object and one
/// corrupt-object issue. A line mentioning both counts as corruption.
pub fn classify_fsck_output(output: &str) -> Vec<CorruptionIssue> {
    let mut missing: Vec<&str> = Vec::new();
    let mut corrupt: Vec<&str> = Vec::new();

    for line in output.lines() {
        let lowered = line.to_lowercase();
        if lowered.contains("corrupt") {
            corrupt.push(line);
        } else if lowered.contains("missing") {
            missing.push(line);
        }
    }

    let mut issues = Vec::new();
    if !missing.is_empty() {
        issues.push(
            CorruptionIssue::new(
                CorruptionType::MissingObject,
                Severity::High,
                format!("{} missing object(s) reported by fsck", missing.len()),
            )
            .with_files(loose_object_paths(&missing))
            .with_data_loss()
            .recommend("Fetch the missing objects from a remote")
            .recommend("Restore from a backup if no remote has them"),
        );
    }
    if !corrupt.is_empty() {
        issues.push(
            CorruptionIssue::new(
                CorruptionType::CorruptObject,
                Severity::Critical,
                format!("{} corrupt object(s) reported by fsck", corrupt.len()),
            )
            .with_files(loose_object_paths(&corrupt))
            .with_data_loss()
            .recommend("Restore the repository from a backup")
            .recommend("Re-clone from a remote and recover local work"),
        );
    }
    issues
}

fn loose_object_paths(lines: &[&str]) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = lines
        .iter()
        .flat_map(|line| OBJECT_ID.find_iter(line))
        .map(|m| {
            let id = m.as_str();
            PathBuf::from(".git/objects").join(&id[..2]).join(&id[2..])
        })
        .collect();
    paths.sort();
    paths.dedup();
    paths
}

async fn verify_packfiles(ctx: &CheckContext) -> Result<Vec<CorruptionIssue>, DetectionError> {
    let pack_dir = ctx.git_dir.join("objects").join("pack");
    if !pack_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut idx_files = Vec::new();
    let mut entries = tokio::fs::read_dir(&pack_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "idx") {
            idx_files.push(path);
        }
    }
    idx_files.sort();

    let mut issues = Vec::new();
    for idx in idx_files {
        let pack = idx.with_extension("pack");
        match ctx.git.verify_pack(&idx, ctx.config.pack_verify_timeout()).await {
            Ok(output) if output.success() => debug!(pack = %pack.display(), "Packfile verified"),
            Ok(output) => issues.push(
                CorruptionIssue::new(
                    CorruptionType::CorruptPackfile,
                    Severity::High,
                    format!(
                        "Packfile {} failed verification: {}",
                        pack.file_name().unwrap_or_default().to_string_lossy(),
                        output.stderr.lines().next().unwrap_or("unknown error").trim()
                    ),
                )
                .with_file(ctx.relative(&pack))
                .with_data_loss()
                .recommend("Repack the repository")
                .recommend("Fetch missing objects from a remote"),
            ),
            Err(e) => warn!(pack = %pack.display(), error = %e, "Could not verify packfile"),
        }
    }
    Ok(issues)
}
