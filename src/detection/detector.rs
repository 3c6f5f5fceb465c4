use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn, Instrument};

use super::types::{CorruptionIssue, DetectionResult};
use super::{configuration, index, locks, objects, operations, permissions, references};
use crate::config::DetectionConfig;
use crate::external::{GitClient, GitError};
use crate::observability::OperationTimer;
use crate::telemetry::{create_detection_span, generate_correlation_id};

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Git error: {0}")]
    Git(#[from] GitError),
    #[error("Repository library error: {0}")]
    Library(#[from] git2::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Background check panicked or was cancelled: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// How much of the repository a scan inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDepth {
    Full,
    /// Skips the object database scan.
    Quick,
}

/// State shared by every structural check of one scan.
pub struct CheckContext {
    pub git: Arc<GitClient>,
    pub root: PathBuf,
    pub git_dir: PathBuf,
    pub config: DetectionConfig,
    pub depth: ScanDepth,
}

impl CheckContext {
    /// Path relative to the repository root, for reporting.
    pub fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root).map(Path::to_path_buf).unwrap_or_else(|_| path.to_path_buf())
    }
}

/// Runs every structural check against a repository and scores the result.
pub struct CorruptionDetector {
    git: Arc<GitClient>,
    config: DetectionConfig,
}

impl CorruptionDetector {
    pub fn new(git: Arc<GitClient>, config: DetectionConfig) -> Self {
        Self { git, config }
    }

    pub fn root(&self) -> &Path {
        self.git.root()
    }

    /// Full scan. Never fails: problems running a check are logged and the
    /// check contributes no issues.
    pub async fn detect_corruption(&self) -> DetectionResult {
        self.scan(ScanDepth::Full).await
    }

    /// Pre-flight scan with tight per-check timeouts and no object database scan.
    pub async fn quick_scan(&self) -> DetectionResult {
        self.scan(ScanDepth::Quick).await
    }

    async fn scan(&self, depth: ScanDepth) -> DetectionResult {
        let correlation_id = generate_correlation_id();
        let span = create_detection_span(&self.git.root().display().to_string(), &correlation_id);
        self.scan_inner(depth).instrument(span).await
    }

    async fn scan_inner(&self, depth: ScanDepth) -> DetectionResult {
        let timer = OperationTimer::new("detect_corruption");
        let started = Instant::now();
        let root = self.git.root().to_path_buf();
        let git_dir = self.git.git_dir();

        if let Some(problem) = inaccessible(&root, &git_dir) {
            warn!(root = %root.display(), "{}", problem);
            return DetectionResult::inaccessible(problem, elapsed_ms(started));
        }

        let ctx = CheckContext {
            git: Arc::clone(&self.git),
            root,
            git_dir,
            config: self.config.clone(),
            depth,
        };

        let (object_limit, check_limit) = match depth {
            ScanDepth::Full => (
                self.config.fsck_timeout() + self.config.pack_verify_timeout(),
                self.config.check_timeout(),
            ),
            ScanDepth::Quick => (self.config.quick_check_timeout(), self.config.quick_check_timeout()),
        };

        let (objects, index, references, locks, operations, configuration, permissions) = tokio::join!(
            guarded("object_database", object_limit, objects::check(&ctx)),
            guarded("index", check_limit, index::check(&ctx)),
            guarded("references", check_limit, references::check(&ctx)),
            guarded("lock_files", check_limit, locks::check(&ctx)),
            guarded("incomplete_operations", check_limit, operations::check(&ctx)),
            guarded("configuration", check_limit, configuration::check(&ctx)),
            guarded("permissions", check_limit, permissions::check(&ctx)),
        );

        let issues: Vec<CorruptionIssue> = [objects, index, references, locks, operations, configuration, permissions]
            .into_iter()
            .flatten()
            .collect();

        let result = DetectionResult::from_issues(issues, elapsed_ms(started));
        timer.finish();
        info!(
            issues = result.issues.len(),
            integrity_score = result.integrity_score,
            quick = depth == ScanDepth::Quick,
            "Corruption detection finished"
        );
        result
    }
}

/// Bound a check by `limit`, turning errors and timeouts into "no issues".
async fn guarded<F>(name: &str, limit: Duration, check: F) -> Vec<CorruptionIssue>
where
    F: Future<Output = Result<Vec<CorruptionIssue>, DetectionError>>,
{
    match tokio::time::timeout(limit, check).await {
        Ok(Ok(issues)) => {
            debug!(check = name, issues = issues.len(), "Check completed");
            issues
        }
        Ok(Err(e)) => {
            warn!(check = name, error = %e, "Check failed to run; treating as no issues");
            Vec::new()
        }
        Err(_) => {
            warn!(check = name, timeout_ms = limit.as_millis() as u64, "Check timed out; treating as no issues");
            Vec::new()
        }
    }
}

fn inaccessible(root: &Path, git_dir: &Path) -> Option<String> {
    match std::fs::metadata(root) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Some(format!("Repository path {} is not a directory", root.display())),
        Err(e) => return Some(format!("Repository path {} is not accessible: {}", root.display(), e)),
    }
    match std::fs::metadata(git_dir) {
        Ok(meta) if meta.is_dir() => None,
        Ok(_) => Some(format!("Git directory {} is not a directory", git_dir.display())),
        Err(e) => Some(format!("Git directory {} is not accessible: {}", git_dir.display(), e)),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
