use tracing::debug;

use super::detector::{CheckContext, DetectionError};
use super::types::{CorruptionIssue, CorruptionType, Severity};

/// Staging area check. An absent index only matters once HEAD points at a commit.
pub async fn check(ctx: &CheckContext) -> Result<Vec<CorruptionIssue>, DetectionError> {
    let index_path = ctx.git_dir.join("index");
    let relative = ctx.relative(&index_path);

    if !index_path.exists() {
        let head = ctx.git.head_commit().await.unwrap_or_else(|e| {
            debug!(error = %e, "Could not resolve HEAD; assuming the repository has commits");
            Some(String::new())
        });
        if head.is_none() {
            return Ok(Vec::new());
        }
        return Ok(vec![CorruptionIssue::new(
            CorruptionType::InvalidIndex,
            Severity::Low,
            "Index file is missing although HEAD points at a commit",
        )
        .with_file(relative)
        .auto_recoverable()
        .recommend("Rebuild the index from HEAD")]);
    }

    let path = index_path.clone();
    let opened = tokio::task::spawn_blocking(move || git2::Index::open(&path).map(|index| index.len())).await?;

    match opened {
        Ok(entries) => {
            debug!(entries, "Index parsed");
            Ok(Vec::new())
        }
        Err(e) => Ok(vec![CorruptionIssue::new(
            CorruptionType::CorruptIndex,
            Severity::High,
            format!("Index file cannot be read: {}", e.message()),
        )
        .with_file(relative)
        .with_data_loss()
        .recommend("Move the damaged index aside and rebuild it from HEAD")
        .recommend("Stash or back up uncommitted work first")]),
    }
}
