//! Git command abstractions
//!
//! `GitClient` is the repository driver: every inspection or repair operation
//! is a git invocation rooted at the repository, bounded by a timeout, and
//! classified into a typed `GitError` on failure.

use super::command::{CommandError, CommandExecutor, CommandOutput, ProcessCommandExecutor};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub type BranchName = String;
pub type CommitHash = String;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum GitError {
    #[error("Repository not found or not a git repository: {path}")]
    RepositoryNotFound { path: PathBuf },
    #[error("Lock file is held: {message}")]
    LockHeld { message: String },
    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },
    #[error("No space left on device")]
    DiskFull,
    #[error("Command execution error: {source}")]
    CommandError {
        #[from]
        source: CommandError,
    },
    #[error("git {command} failed: {message}")]
    GitCommandFailed { command: String, message: String },
}

/// Multi-step operations git can leave half-finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InProgressOperation {
    Merge,
    Rebase,
    CherryPick,
    Apply,
}

impl InProgressOperation {
    pub fn abort_args(self) -> [&'static str; 2] {
        match self {
            InProgressOperation::Merge => ["merge", "--abort"],
            InProgressOperation::Rebase => ["rebase", "--abort"],
            InProgressOperation::CherryPick => ["cherry-pick", "--abort"],
            InProgressOperation::Apply => ["am", "--abort"],
        }
    }

    /// State files and directories under the git dir that mark the operation.
    pub fn marker_paths(self) -> &'static [&'static str] {
        match self {
            InProgressOperation::Merge => &["MERGE_HEAD", "MERGE_MSG", "MERGE_MODE", "AUTO_MERGE"],
            InProgressOperation::Rebase => &["rebase-merge", "rebase-apply"],
            InProgressOperation::CherryPick => &["CHERRY_PICK_HEAD", "sequencer"],
            InProgressOperation::Apply => &["rebase-apply"],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            InProgressOperation::Merge => "merge",
            InProgressOperation::Rebase => "rebase",
            InProgressOperation::CherryPick => "cherry-pick",
            InProgressOperation::Apply => "patch application",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitStatus {
    pub current_branch: Option<BranchName>,
    pub is_clean: bool,
    pub staged_files: Vec<String>,
    pub unstaged_files: Vec<String>,
    pub untracked_files: Vec<String>,
}

/// Repository driver backed by the git CLI
pub struct GitClient {
    executor: Arc<dyn CommandExecutor>,
    root: PathBuf,
    timeout: Duration,
}

impl GitClient {
    pub fn new(executor: Arc<dyn CommandExecutor>, root: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            root: root.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Driver using real `git` processes.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(ProcessCommandExecutor), root)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn executor(&self) -> Arc<dyn CommandExecutor> {
        Arc::clone(&self.executor)
    }

    pub fn default_timeout(&self) -> Duration {
        self.timeout
    }

    /// The metadata directory, following a `.git` file for linked worktrees.
    pub fn git_dir(&self) -> PathBuf {
        resolve_git_dir(&self.root)
    }

    /// Run git and return its output regardless of exit status.
    pub async fn run(&self, args: &[&str], timeout: Duration) -> Result<CommandOutput, GitError> {
        tracing::debug!(args = ?args, timeout_ms = timeout.as_millis() as u64, "Running git");
        Ok(self.executor.execute("git", args, &self.root, timeout).await?)
    }

    async fn execute_git_command(&self, args: &[&str]) -> Result<String, GitError> {
        self.execute_git_command_with_timeout(args, self.timeout).await
    }

    async fn execute_git_command_with_timeout(
        &self,
        args: &[&str],
        timeout: Duration,
    ) -> Result<String, GitError> {
        let output = self.run(args, timeout).await?;

        if !output.success() {
            return Err(self.classify_git_error(&output.stderr, args));
        }

        Ok(output.stdout.trim_end().to_string())
    }

    fn classify_git_error(&self, stderr: &str, args: &[&str]) -> GitError {
        let lowered = stderr.to_lowercase();
        if lowered.contains("not a git repository") {
            GitError::RepositoryNotFound {
                path: self.root.clone(),
            }
        } else if lowered.contains(".lock") && (lowered.contains("file exists") || lowered.contains("unable to create")) {
            GitError::LockHeld {
                message: stderr.trim().to_string(),
            }
        } else if lowered.contains("no space left on device") {
            GitError::DiskFull
        } else if lowered.contains("permission denied") {
            GitError::PermissionDenied {
                message: stderr.trim().to_string(),
            }
        } else {
            GitError::GitCommandFailed {
                command: args.join(" "),
                message: stderr.trim().to_string(),
            }
        }
    }

    fn parse_status_output(&self, output: &str) -> GitStatus {
        let mut staged_files = Vec::new();
        let mut unstaged_files = Vec::new();
        let mut untracked_files = Vec::new();

        for line in output.lines() {
            if line.len() < 4 {
                continue;
            }

            let mut status_chars = line.chars();
            let index_state = status_chars.next().unwrap_or(' ');
            let worktree_state = status_chars.next().unwrap_or(' ');
            let filename = line[3..].to_string();

            if index_state == '?' && worktree_state == '?' {
                untracked_files.push(filename);
                continue;
            }
            if matches!(index_state, 'A' | 'M' | 'D' | 'R' | 'C' | 'U') {
                staged_files.push(filename.clone());
            }
            if matches!(worktree_state, 'M' | 'D' | 'U') {
                unstaged_files.push(filename);
            }
        }

        let is_clean = staged_files.is_empty() && unstaged_files.is_empty() && untracked_files.is_empty();

        GitStatus {
            current_branch: None,
            is_clean,
            staged_files,
            unstaged_files,
            untracked_files,
        }
    }

    /// Current branch, or `None` when HEAD is detached.
    pub async fn current_branch(&self) -> Result<Option<BranchName>, GitError> {
        let output = self.run(&["symbolic-ref", "--quiet", "--short", "HEAD"], self.timeout).await?;
        if output.success() {
            let branch = output.stdout.trim();
            return Ok((!branch.is_empty()).then(|| branch.to_string()));
        }
        if output.status_code == 1 {
            return Ok(None);
        }
        Err(self.classify_git_error(&output.stderr, &["symbolic-ref", "HEAD"]))
    }

    /// HEAD commit, or `None` for an unborn branch.
    pub async fn head_commit(&self) -> Result<Option<CommitHash>, GitError> {
        self.rev_parse("HEAD").await
    }

    pub async fn rev_parse(&self, rev: &str) -> Result<Option<CommitHash>, GitError> {
        let spec = format!("{rev}^{{commit}}");
        let output = self.run(&["rev-parse", "--verify", "--quiet", &spec], self.timeout).await?;
        if output.success() {
            Ok(Some(output.stdout.trim().to_string()))
        } else {
            Ok(None)
        }
    }

    pub async fn status(&self) -> Result<GitStatus, GitError> {
        let output = self
            .run(&["status", "--porcelain", "--untracked-files=all"], self.timeout)
            .await?;
        if !output.success() {
            return Err(self.classify_git_error(&output.stderr, &["status"]));
        }
        let mut status = self.parse_status_output(&output.stdout);
        status.current_branch = self.current_branch().await.ok().flatten();
        Ok(status)
    }

    pub async fn tracked_files(&self) -> Result<Vec<String>, GitError> {
        let output = self.execute_git_command(&["ls-files", "-z"]).await?;
        Ok(split_nul(&output))
    }

    pub async fn untracked_files(&self) -> Result<Vec<String>, GitError> {
        let output = self
            .execute_git_command(&["ls-files", "--others", "--exclude-standard", "-z"])
            .await?;
        Ok(split_nul(&output))
    }

    /// Full strict consistency scan; a non-zero exit is reported, not raised.
    pub async fn fsck(&self, timeout: Duration) -> Result<CommandOutput, GitError> {
        self.run(&["fsck", "--full", "--strict", "--no-progress", "--no-dangling"], timeout)
            .await
    }

    pub async fn verify_pack(&self, index_file: &Path, timeout: Duration) -> Result<CommandOutput, GitError> {
        let path = index_file.to_string_lossy();
        self.run(&["verify-pack", &path], timeout).await
    }

    /// Returns false when there was nothing to stash.
    pub async fn stash_push(&self, message: &str, include_untracked: bool) -> Result<bool, GitError> {
        let mut args = vec!["stash", "push", "--message", message];
        if include_untracked {
            args.push("--include-untracked");
        }
        let output = self.execute_git_command(&args).await?;
        Ok(!output.contains("No local changes to save"))
    }

    pub async fn abort(&self, operation: InProgressOperation) -> Result<(), GitError> {
        self.execute_git_command(&operation.abort_args()).await?;
        Ok(())
    }

    /// Rebuild the index from HEAD, leaving the working tree untouched.
    pub async fn reset_index(&self) -> Result<(), GitError> {
        self.execute_git_command(&["reset", "--mixed", "--quiet", "HEAD"]).await?;
        Ok(())
    }

    pub async fn delete_ref(&self, name: &str) -> Result<(), GitError> {
        self.execute_git_command(&["update-ref", "--no-deref", "-d", name]).await?;
        Ok(())
    }

    pub async fn remove_remote(&self, name: &str) -> Result<(), GitError> {
        self.execute_git_command(&["remote", "remove", name]).await?;
        Ok(())
    }

    pub async fn gc(&self, aggressive: bool) -> Result<(), GitError> {
        let mut args = vec!["gc", "--prune=now", "--quiet"];
        if aggressive {
            args.push("--aggressive");
        }
        self.execute_git_command(&args).await?;
        Ok(())
    }

    pub async fn repack(&self, aggressive: bool) -> Result<(), GitError> {
        let mut args = vec!["repack", "-a", "-d", "-q"];
        if aggressive {
            args.push("-f");
        }
        self.execute_git_command(&args).await?;
        Ok(())
    }

    pub async fn fetch_all(&self) -> Result<(), GitError> {
        self.execute_git_command(&["fetch", "--all", "--quiet"]).await?;
        Ok(())
    }

    pub async fn bundle_create(&self, bundle: &Path, timeout: Duration) -> Result<(), GitError> {
        let path = bundle.to_string_lossy();
        self.execute_git_command_with_timeout(&["bundle", "create", &path, "--all"], timeout)
            .await?;
        Ok(())
    }

    pub async fn bundle_verify(&self, bundle: &Path) -> Result<(), GitError> {
        let path = bundle.to_string_lossy();
        self.execute_git_command(&["bundle", "verify", "--quiet", &path]).await?;
        Ok(())
    }

    /// Fetch refs out of a bundle file with the given refspecs.
    pub async fn fetch_bundle(&self, bundle: &Path, refspecs: &[&str], timeout: Duration) -> Result<(), GitError> {
        let path = bundle.to_string_lossy();
        let mut args = vec!["fetch", "--quiet", "--update-head-ok", &path];
        args.extend_from_slice(refspecs);
        self.execute_git_command_with_timeout(&args, timeout).await?;
        Ok(())
    }

    /// Full names of every ref below `prefix`.
    pub async fn list_refs(&self, prefix: &str) -> Result<Vec<String>, GitError> {
        let output = self
            .execute_git_command(&["for-each-ref", "--format=%(refname)", prefix])
            .await?;
        Ok(output.lines().filter(|line| !line.is_empty()).map(str::to_string).collect())
    }

    pub async fn checkout(&self, branch: &str) -> Result<(), GitError> {
        self.execute_git_command(&["checkout", "--quiet", branch]).await?;
        Ok(())
    }

    /// Check out specific paths from a commit into the index and working tree.
    pub async fn checkout_paths(&self, commit: &str, paths: &[&str]) -> Result<(), GitError> {
        let mut args = vec!["checkout", commit, "--"];
        args.extend_from_slice(paths);
        self.execute_git_command(&args).await?;
        Ok(())
    }
}

/// Locate the git dir for a working tree root without trusting repository state.
pub fn resolve_git_dir(root: &Path) -> PathBuf {
    let dot_git = root.join(".git");
    if dot_git.is_file() {
        if let Ok(contents) = std::fs::read_to_string(&dot_git) {
            if let Some(target) = contents.trim().strip_prefix("gitdir:") {
                let target = Path::new(target.trim());
                return if target.is_absolute() {
                    target.to_path_buf()
                } else {
                    root.join(target)
                };
            }
        }
    }
    dot_git
}

fn split_nul(output: &str) -> Vec<String> {
    output
        .split('\0')
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::scripted::ScriptedExecutor;

    fn client(executor: ScriptedExecutor) -> GitClient {
        GitClient::new(Arc::new(executor), "/repo")
    }

    #[tokio::test]
    async fn test_current_branch_success() {
        let executor = ScriptedExecutor::new().ok("git", &["symbolic-ref", "--quiet", "--short", "HEAD"], "main\n");
        let result = client(executor).current_branch().await;

        assert_eq!(result.unwrap(), Some("main".to_string()));
    }

    #[tokio::test]
    async fn test_current_branch_detached() {
        let executor = ScriptedExecutor::new().expect_command(
            "git",
            &["symbolic-ref", "--quiet", "--short", "HEAD"],
            Ok(CommandOutput {
                status_code: 1,
                stdout: String::new(),
                stderr: String::new(),
            }),
        );

        assert_eq!(client(executor).current_branch().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_head_commit_unborn() {
        let executor = ScriptedExecutor::new().fail("git", &["rev-parse", "--verify", "--quiet", "HEAD^{commit}"], "");
        assert_eq!(client(executor).head_commit().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_status_parsing_keeps_leading_space() {
        let executor = ScriptedExecutor::new()
            .ok(
                "git",
                &["status", "--porcelain", "--untracked-files=all"],
                " M src/lib.rs\nA  new.rs\n?? notes.txt\nMM both.rs\n",
            )
            .ok("git", &["symbolic-ref", "--quiet", "--short", "HEAD"], "main\n");

        let status = client(executor).status().await.unwrap();
        assert_eq!(status.unstaged_files, vec!["src/lib.rs", "both.rs"]);
        assert_eq!(status.staged_files, vec!["new.rs", "both.rs"]);
        assert_eq!(status.untracked_files, vec!["notes.txt"]);
        assert_eq!(status.current_branch.as_deref(), Some("main"));
        assert!(!status.is_clean);
    }

    #[tokio::test]
    async fn test_lock_error_classification() {
        let executor = ScriptedExecutor::new().fail(
            "git",
            &["reset", "--mixed", "--quiet", "HEAD"],
            "fatal: Unable to create '/repo/.git/index.lock': File exists.",
        );

        let err = client(executor).reset_index().await.unwrap_err();
        assert!(matches!(err, GitError::LockHeld { .. }));
    }

    #[tokio::test]
    async fn test_stash_with_nothing_to_save() {
        let executor = ScriptedExecutor::new().ok(
            "git",
            &["stash", "push", "--message", "rescue", "--include-untracked"],
            "No local changes to save\n",
        );

        assert!(!client(executor).stash_push("rescue", true).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_refs_under_prefix() {
        let executor = ScriptedExecutor::new().ok(
            "git",
            &["for-each-ref", "--format=%(refname)", "refs/git-rescue/b1"],
            "refs/git-rescue/b1/heads/main\nrefs/git-rescue/b1/heads/topic\n",
        );

        let refs = client(executor).list_refs("refs/git-rescue/b1").await.unwrap();
        assert_eq!(refs, vec!["refs/git-rescue/b1/heads/main", "refs/git-rescue/b1/heads/topic"]);
    }

    #[test]
    fn test_resolve_git_dir_follows_gitdir_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".git"), "gitdir: ../main/.git/worktrees/wt\n").unwrap();

        let resolved = resolve_git_dir(dir.path());
        assert_eq!(resolved, dir.path().join("../main/.git/worktrees/wt"));
    }

    #[test]
    fn test_abort_args() {
        assert_eq!(InProgressOperation::Apply.abort_args(), ["am", "--abort"]);
        assert_eq!(InProgressOperation::CherryPick.abort_args(), ["cherry-pick", "--abort"]);
    }
}
