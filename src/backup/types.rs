use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::external::{CommandError, GitError};

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Backup {id} not found")]
    NotFound { id: String },
    #[error("Backup {id} has an invalid manifest: {reason}")]
    InvalidManifest { id: String, reason: String },
    #[error("Invalid backup id '{id}'")]
    InvalidId { id: String },
    #[error("Path {path} is not inside the repository")]
    UnsafePath { path: PathBuf },
    #[error("Backup {id} has no bundled commit to restore paths from")]
    NoBundledCommit { id: String },
    #[error("Filesystem error: {0}")]
    Filesystem(String),
    #[error("Git error: {0}")]
    Git(#[from] GitError),
    #[error("Command error: {0}")]
    Command(#[from] CommandError),
    #[error("Archive command failed: {0}")]
    Archive(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BackupError {
    pub fn filesystem(error: anyhow::Error) -> Self {
        BackupError::Filesystem(format!("{error:#}"))
    }
}

/// Branch, HEAD and working tree state at backup time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchState {
    pub branch: Option<String>,
    pub commit: Option<String>,
    pub staged_files: Vec<String>,
    pub unstaged_files: Vec<String>,
    pub untracked_files: Vec<String>,
}

/// The backup manifest, persisted as `backup-info.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupInfo {
    pub id: String,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub reason: String,
    pub branch_state: BranchState,
    /// Bytes on disk.
    pub size: u64,
    pub compressed: bool,
    /// False for repositories without commits.
    #[serde(default)]
    pub has_bundle: bool,
    #[serde(default)]
    pub working_tree_files: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupOptions {
    pub reason: String,
    /// Overrides the configured setting when set.
    pub include_working_tree: Option<bool>,
    /// Overrides the configured setting when set.
    pub compress: Option<bool>,
}

impl BackupOptions {
    pub fn with_reason(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreOptions {
    /// Stash the current dirty state before restoring.
    pub stash_current: bool,
    /// Restore only these working tree files from the backup copy.
    pub partial: Option<Vec<PathBuf>>,
    /// Restore only these paths from the bundled HEAD commit, leaving refs alone.
    pub bundle_paths: Option<Vec<PathBuf>>,
    /// Restore config, hooks and info.
    pub restore_metadata: bool,
    pub target_branch: Option<String>,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            stash_current: true,
            partial: None,
            bundle_paths: None,
            restore_metadata: true,
            target_branch: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreResult {
    pub success: bool,
    pub restored_files: Vec<PathBuf>,
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RestoreResult {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn failed_with(error: impl Into<String>, warnings: Vec<String>) -> Self {
        Self {
            warnings,
            ..Self::failed(error)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageUsage {
    pub directory: PathBuf,
    pub backup_count: usize,
    pub total_bytes: u64,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupVerification {
    pub id: String,
    pub valid: bool,
    pub problems: Vec<String>,
}
