use std::path::Path;
use tracing::debug;
use uuid::Uuid;

use super::detector::{CheckContext, DetectionError};
use super::types::{CorruptionIssue, CorruptionType, Severity};

/// Read/write access to the git dir and free space on its filesystem.
pub async fn check(ctx: &CheckContext) -> Result<Vec<CorruptionIssue>, DetectionError> {
    let mut issues = Vec::new();
    let git_dir_display = ctx.relative(&ctx.git_dir);

    for (dir, try_write) in [
        (ctx.git_dir.clone(), true),
        (ctx.git_dir.join("objects"), false),
        (ctx.git_dir.join("refs"), false),
    ] {
        if !dir.exists() {
            continue;
        }
        if let Some(problem) = access_problem(&dir, try_write).await {
            issues.push(
                CorruptionIssue::new(
                    CorruptionType::PermissionDenied,
                    Severity::High,
                    format!("{}: {}", ctx.relative(&dir).display(), problem),
                )
                .with_file(ctx.relative(&dir))
                .recommend("Restore read and write permission on the git directory")
                .recommend("Check the owner of the repository files"),
            );
        }
    }

    let timeout = ctx.config.check_timeout();
    let dir = ctx.git_dir.to_string_lossy().to_string();
    match ctx.git.executor().execute("df", &["-Pk", &dir], &ctx.root, timeout).await {
        Ok(output) if output.success() => {
            if let Some(available_kb) = parse_df_available_kb(&output.stdout) {
                let minimum_kb = ctx.config.min_free_space_mb * 1024;
                if available_kb < minimum_kb {
                    issues.push(
                        CorruptionIssue::new(
                            CorruptionType::DiskFull,
                            Severity::Critical,
                            format!(
                                "Only {} KiB free on the filesystem holding {}",
                                available_kb,
                                git_dir_display.display()
                            ),
                        )
                        .with_file(git_dir_display.clone())
                        .with_data_loss()
                        .recommend("Free up disk space before running any git command"),
                    );
                }
            }
        }
        Ok(output) => debug!(stderr = %output.stderr.trim(), "Free space query failed"),
        Err(e) => debug!(error = %e, "Free space query unavailable"),
    }

    Ok(issues)
}

/// `try_write` creates and removes a scratch file, which catches ACLs,
/// foreign ownership and read-only mounts. Only used on the top of the git
/// dir, where no concurrent check would mistake the file for a ref.
async fn access_problem(dir: &Path, try_write: bool) -> Option<String> {
    if let Err(e) = tokio::fs::read_dir(dir).await {
        return Some(format!("directory cannot be read ({e})"));
    }
    if try_write {
        return write_problem(dir).await;
    }
    match tokio::fs::metadata(dir).await {
        Ok(meta) if meta.permissions().readonly() => Some("directory is read-only".to_string()),
        Ok(_) => None,
        Err(e) => Some(format!("directory metadata unavailable ({e})")),
    }
}

async fn write_problem(dir: &Path) -> Option<String> {
    let scratch = dir.join(format!(".git-rescue-write-check-{}", Uuid::new_v4().simple()));
    let created = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&scratch)
        .await;
    match created {
        Ok(file) => {
            drop(file);
            if let Err(e) = tokio::fs::remove_file(&scratch).await {
                debug!(path = %scratch.display(), error = %e, "Could not remove write check file");
            }
            None
        }
        Err(e) => Some(format!("directory is not writable ({e})")),
    }
}

/// Available KiB from POSIX `df -Pk` output.
pub fn parse_df_available_kb(output: &str) -> Option<u64> {
    output.lines().nth(1)?.split_whitespace().nth(3)?.parse().ok()
}
