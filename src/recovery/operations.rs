//! Execution of typed recovery operations.
//!
//! Operations never carry shell text: each variant maps to one driver call
//! or one filesystem call, and every path is confined to the repository root.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::types::{RecoveryError, RecoveryOperation};
use crate::external::GitClient;
use crate::fs::FileSystemOperations;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationOutcome {
    Applied,
    /// The target state already held, e.g. the lock file was gone.
    AlreadyClean,
}

pub struct OperationRunner {
    git: Arc<GitClient>,
    fs: Arc<dyn FileSystemOperations>,
}

impl OperationRunner {
    pub fn new(git: Arc<GitClient>, fs: Arc<dyn FileSystemOperations>) -> Self {
        Self { git, fs }
    }

    pub fn git(&self) -> &GitClient {
        &self.git
    }

    pub fn fs(&self) -> &dyn FileSystemOperations {
        self.fs.as_ref()
    }

    /// Join a repository-relative path onto the root, refusing anything that
    /// could escape it.
    pub fn resolve(&self, relative: &Path) -> Result<PathBuf, RecoveryError> {
        let safe = !relative.as_os_str().is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
        if !safe {
            return Err(RecoveryError::UnsafePath {
                path: relative.to_path_buf(),
            });
        }
        Ok(self.git.root().join(relative))
    }

    pub async fn run(&self, operation: &RecoveryOperation) -> Result<OperationOutcome, RecoveryError> {
        debug!(operation = %operation, "Running recovery operation");
        match operation {
            RecoveryOperation::RemoveFile { path } => {
                let target = self.resolve(path)?;
                if !self.fs.exists(&target) {
                    return Ok(OperationOutcome::AlreadyClean);
                }
                let stat = self.fs.stat(&target).await.map_err(RecoveryError::filesystem)?;
                if stat.is_dir {
                    self.fs.remove_dir_all(&target).await.map_err(RecoveryError::filesystem)?;
                } else {
                    self.fs.remove_file(&target).await.map_err(RecoveryError::filesystem)?;
                }
                info!(path = %path.display(), "Removed file");
                Ok(OperationOutcome::Applied)
            }
            RecoveryOperation::MoveFile { from, to } => {
                let source = self.resolve(from)?;
                let destination = self.resolve(to)?;
                if !self.fs.exists(&source) {
                    return Ok(OperationOutcome::AlreadyClean);
                }
                if let Some(parent) = destination.parent() {
                    self.fs.create_dir_all(parent).await.map_err(RecoveryError::filesystem)?;
                }
                self.fs
                    .rename(&source, &destination)
                    .await
                    .map_err(RecoveryError::filesystem)?;
                info!(from = %from.display(), to = %to.display(), "Moved file aside");
                Ok(OperationOutcome::Applied)
            }
            RecoveryOperation::CreateStash {
                message,
                include_untracked,
            } => {
                if self.git.stash_push(message, *include_untracked).await? {
                    Ok(OperationOutcome::Applied)
                } else {
                    Ok(OperationOutcome::AlreadyClean)
                }
            }
            RecoveryOperation::AbortOperation { operation } => {
                self.git.abort(*operation).await?;
                Ok(OperationOutcome::Applied)
            }
            RecoveryOperation::ResetIndex => {
                self.git.reset_index().await?;
                Ok(OperationOutcome::Applied)
            }
            RecoveryOperation::DeleteRef { name } => {
                self.git.delete_ref(name).await?;
                Ok(OperationOutcome::Applied)
            }
            RecoveryOperation::RemoveRemote { name } => {
                self.git.remove_remote(name).await?;
                Ok(OperationOutcome::Applied)
            }
            RecoveryOperation::GarbageCollect { aggressive } => {
                self.git.gc(*aggressive).await?;
                Ok(OperationOutcome::Applied)
            }
            RecoveryOperation::Repack { aggressive } => {
                self.git.repack(*aggressive).await?;
                Ok(OperationOutcome::Applied)
            }
            RecoveryOperation::FetchAll => {
                self.git.fetch_all().await?;
                Ok(OperationOutcome::Applied)
            }
            RecoveryOperation::RepairHead => self.repair_head().await,
            RecoveryOperation::Manual { instruction } => Err(RecoveryError::ManualInterventionRequired {
                instruction: instruction.clone(),
            }),
        }
    }

    /// HEAD is never removed: it is overwritten with a symbolic ref, or left
    /// alone when no existing branch can be inferred.
    async fn repair_head(&self) -> Result<OperationOutcome, RecoveryError> {
        let git_dir = self.git.git_dir();
        let reflog = self.fs.read_to_string(&git_dir.join("logs/HEAD")).await.unwrap_or_default();

        let mut candidates = branches_from_reflog(&reflog);
        candidates.extend(["main".to_string(), "master".to_string()]);
        let mut branch = None;
        for candidate in candidates {
            if self.branch_exists(&git_dir, &candidate).await {
                branch = Some(candidate);
                break;
            }
        }
        let Some(branch) = branch else {
            return Err(RecoveryError::ManualInterventionRequired {
                instruction: "HEAD is unreadable and no branch could be inferred; write `ref: refs/heads/<branch>` into .git/HEAD"
                    .to_string(),
            });
        };

        self.fs
            .write(&git_dir.join("HEAD"), format!("ref: refs/heads/{branch}\n").as_bytes())
            .await
            .map_err(RecoveryError::filesystem)?;
        info!(branch = %branch, "Pointed HEAD at branch");
        Ok(OperationOutcome::Applied)
    }

    async fn branch_exists(&self, git_dir: &Path, branch: &str) -> bool {
        let plain = Path::new(branch)
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if !plain {
            return false;
        }
        if self.fs.exists(&git_dir.join("refs/heads").join(branch)) {
            return true;
        }
        let packed = self.fs.read_to_string(&git_dir.join("packed-refs")).await.unwrap_or_default();
        let wanted = format!("refs/heads/{branch}");
        packed
            .lines()
            .any(|line| line.split_whitespace().nth(1) == Some(wanted.as_str()))
    }
}

/// Checkout targets recorded in a HEAD reflog, most recent first.
fn branches_from_reflog(reflog: &str) -> Vec<String> {
    reflog
        .lines()
        .rev()
        .filter_map(|line| line.split_once('\t').map(|(_, message)| message))
        .filter_map(|message| message.strip_prefix("checkout: moving from "))
        .filter_map(|moves| moves.rsplit_once(" to ").map(|(_, to)| to.trim().to_string()))
        .collect()
}
