use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use super::detector::{CheckContext, DetectionError};
use super::types::{CorruptionIssue, CorruptionType, Severity};

/// Lock files directly under the git dir and the issue each one maps to.
const TOP_LEVEL_LOCKS: [(&str, CorruptionType); 4] = [
    ("index.lock", CorruptionType::IndexLock),
    ("HEAD.lock", CorruptionType::StaleLockFile),
    ("config.lock", CorruptionType::StaleLockFile),
    ("packed-refs.lock", CorruptionType::RefLock),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleLock {
    pub path: PathBuf,
    pub lock_type: CorruptionType,
    pub age: Duration,
}

pub async fn check(ctx: &CheckContext) -> Result<Vec<CorruptionIssue>, DetectionError> {
    let git_dir = ctx.git_dir.clone();
    let top_level = ctx.config.top_level_lock_max_age();
    let refs = ctx.config.ref_lock_max_age();
    let stale = tokio::task::spawn_blocking(move || find_stale_locks(&git_dir, SystemTime::now(), top_level, refs)).await?;

    Ok(stale
        .into_iter()
        .map(|lock| {
            CorruptionIssue::new(
                lock.lock_type,
                Severity::Medium,
                format!(
                    "Stale lock file {} ({}s old) blocks git operations",
                    ctx.relative(&lock.path).display(),
                    lock.age.as_secs()
                ),
            )
            .with_file(ctx.relative(&lock.path))
            .auto_recoverable()
            .recommend("Make sure no git process is running, then remove the lock file")
        })
        .collect())
}

/// Lock files older than their threshold as of `now`. Younger locks may
/// belong to a live git process and are ignored.
pub fn find_stale_locks(
    git_dir: &Path,
    now: SystemTime,
    top_level_max_age: Duration,
    ref_max_age: Duration,
) -> Vec<StaleLock> {
    let mut stale = Vec::new();

    for (name, lock_type) in TOP_LEVEL_LOCKS {
        let path = git_dir.join(name);
        if let Some(age) = lock_age(&path, now) {
            if age > top_level_max_age {
                stale.push(StaleLock { path, lock_type, age });
            }
        }
    }

    let mut pending = vec![git_dir.join("refs")];
    while let Some(dir) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "lock") {
                if let Some(age) = lock_age(&path, now) {
                    if age > ref_max_age {
                        stale.push(StaleLock {
                            path,
                            lock_type: CorruptionType::RefLock,
                            age,
                        });
                    }
                }
            }
        }
    }

    stale
}

fn lock_age(path: &Path, now: SystemTime) -> Option<Duration> {
    let modified = std::fs::symlink_metadata(path).ok()?.modified().ok()?;
    Some(now.duration_since(modified).unwrap_or_default())
}
