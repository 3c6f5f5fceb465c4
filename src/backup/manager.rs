//! Point-in-time repository snapshots
//!
//! A backup is a directory under the backup root:
//!
//! ```text
//! <id>/repository.bundle   every ref and commit (`git bundle create --all`)
//! <id>/working-tree/       tracked and untracked files, relative paths kept
//! <id>/git-metadata/       config, HEAD, packed-refs, refs, logs, hooks, info
//! <id>/backup-info.json    manifest
//! ```
//!
//! Compressed backups replace the directory with `<id>.tar.gz` and keep a
//! copy of the manifest next to it as `<id>.json`.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::types::{
    BackupError, BackupInfo, BackupOptions, BackupVerification, BranchState, RestoreOptions, RestoreResult,
    StorageUsage,
};
use crate::config::BackupConfig;
use crate::external::{GitClient, GitError};
use crate::fs::{copy_tree, tree_size, FileSystemOperations};
use crate::observability::OperationTimer;

const MANIFEST: &str = "backup-info.json";
const BUNDLE: &str = "repository.bundle";
const WORKING_TREE: &str = "working-tree";
const METADATA: &str = "git-metadata";
const METADATA_ENTRIES: [&str; 7] = ["config", "HEAD", "packed-refs", "refs", "logs", "hooks", "info"];
/// Refs and HEAD come back through the bundle and are never overwritten from metadata.
const RESTORABLE_METADATA: [&str; 3] = ["config", "hooks", "info"];
const BUNDLE_REFSPECS: [&str; 2] = ["+refs/heads/*:refs/heads/*", "+refs/tags/*:refs/tags/*"];

pub struct BackupManager {
    git: Arc<GitClient>,
    fs: Arc<dyn FileSystemOperations>,
    config: BackupConfig,
    backup_root: PathBuf,
}

impl BackupManager {
    pub fn new(git: Arc<GitClient>, fs: Arc<dyn FileSystemOperations>, config: BackupConfig) -> Self {
        let backup_root = config.resolve_directory(git.root());
        Self {
            git,
            fs,
            config,
            backup_root,
        }
    }

    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    pub async fn create_backup(&self, options: &BackupOptions) -> Result<BackupInfo, BackupError> {
        let timer = OperationTimer::new("create_backup");
        let created_at = Utc::now();
        let suffix = Uuid::new_v4().simple().to_string();
        let id = format!("backup-{}-{}", created_at.format("%Y%m%d-%H%M%S"), &suffix[..8]);
        let dir = self.dir_for(&id);
        info!(backup.id = %id, reason = %options.reason, "Creating backup");

        let info = match self.populate(&id, &dir, created_at, options).await {
            Ok(info) => info,
            Err(e) => {
                warn!(backup.id = %id, error = %e, "Backup failed; removing partial backup");
                if let Err(cleanup) = self.delete_backup(&id).await {
                    warn!(backup.id = %id, error = %cleanup, "Could not remove partial backup");
                }
                return Err(e);
            }
        };

        match self.cleanup_old_backups(self.config.max_backups).await {
            Ok(deleted) if !deleted.is_empty() => info!(deleted = ?deleted, "Retention removed old backups"),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Backup retention failed"),
        }

        timer.finish();
        info!(backup.id = %info.id, size = info.size, compressed = info.compressed, "Backup created");
        Ok(info)
    }

    async fn populate(
        &self,
        id: &str,
        dir: &Path,
        created_at: DateTime<Utc>,
        options: &BackupOptions,
    ) -> Result<BackupInfo, BackupError> {
        self.fs.create_dir_all(dir).await.map_err(BackupError::filesystem)?;

        let branch_state = self.capture_branch_state().await;

        let has_bundle = if branch_state.commit.is_some() {
            self.git
                .bundle_create(&dir.join(BUNDLE), self.config.bundle_timeout())
                .await?;
            true
        } else {
            warn!(backup.id = %id, "Repository has no commits; backup holds no bundle");
            false
        };

        let copy_working_tree = options
            .include_working_tree
            .unwrap_or(self.config.include_working_tree);
        let working_tree_files = if copy_working_tree {
            self.copy_working_tree(&dir.join(WORKING_TREE)).await?
        } else {
            0
        };

        self.copy_metadata(&dir.join(METADATA)).await?;

        let mut info = BackupInfo {
            id: id.to_string(),
            path: dir.to_path_buf(),
            created_at,
            reason: options.reason.clone(),
            branch_state,
            size: 0,
            compressed: false,
            has_bundle,
            working_tree_files,
            hostname: hostname::get().ok().and_then(|name| name.into_string().ok()),
        };
        info.size = tree_size(self.fs.as_ref(), dir).await.map_err(BackupError::filesystem)?;
        self.write_manifest(&dir.join(MANIFEST), &info).await?;

        if options.compress.unwrap_or(self.config.compress) {
            info = self.compress(info).await?;
        }
        Ok(info)
    }

    /// Lenient: a damaged index must not prevent taking a backup.
    async fn capture_branch_state(&self) -> BranchState {
        let commit = self.git.head_commit().await.unwrap_or_else(|e| {
            warn!(error = %e, "Could not resolve HEAD for backup");
            None
        });
        match self.git.status().await {
            Ok(status) => BranchState {
                branch: status.current_branch,
                commit,
                staged_files: status.staged_files,
                unstaged_files: status.unstaged_files,
                untracked_files: status.untracked_files,
            },
            Err(e) => {
                warn!(error = %e, "Could not read working tree status for backup");
                BranchState {
                    branch: self.git.current_branch().await.ok().flatten(),
                    commit,
                    ..BranchState::default()
                }
            }
        }
    }

    async fn copy_working_tree(&self, destination: &Path) -> Result<usize, BackupError> {
        self.fs.create_dir_all(destination).await.map_err(BackupError::filesystem)?;

        let mut files = BTreeSet::new();
        match self.git.tracked_files().await {
            Ok(tracked) => files.extend(tracked),
            Err(e) => warn!(error = %e, "Could not list tracked files"),
        }
        match self.git.untracked_files().await {
            Ok(untracked) => files.extend(untracked),
            Err(e) => warn!(error = %e, "Could not list untracked files"),
        }

        let root = self.git.root();
        let mut copied = 0;
        for file in files {
            let source = root.join(&file);
            if source.starts_with(&self.backup_root) {
                continue;
            }
            let stat = match self.fs.stat(&source).await {
                Ok(stat) => stat,
                Err(_) => {
                    debug!(file = %file, "Skipping file missing from the working tree");
                    continue;
                }
            };
            if stat.is_symlink || stat.is_dir {
                warn!(file = %file, "Skipping symlink or nested repository in backup");
                continue;
            }
            match self.fs.copy_file(&source, &destination.join(&file)).await {
                Ok(_) => copied += 1,
                Err(e) => warn!(file = %file, error = %e, "Skipping file that could not be copied"),
            }
        }
        Ok(copied)
    }

    async fn copy_metadata(&self, destination: &Path) -> Result<(), BackupError> {
        self.fs.create_dir_all(destination).await.map_err(BackupError::filesystem)?;
        let git_dir = self.git.git_dir();
        for entry in METADATA_ENTRIES {
            copy_entry(self.fs.as_ref(), &git_dir.join(entry), &destination.join(entry)).await?;
        }
        Ok(())
    }

    async fn compress(&self, mut info: BackupInfo) -> Result<BackupInfo, BackupError> {
        let archive = self.archive_for(&info.id);
        let archive_arg = archive.to_string_lossy().to_string();
        let root_arg = self.backup_root.to_string_lossy().to_string();
        let output = self
            .git
            .executor()
            .execute(
                "tar",
                &["-czf", &archive_arg, "-C", &root_arg, &info.id],
                &self.backup_root,
                self.config.bundle_timeout(),
            )
            .await?;
        if !output.success() {
            return Err(BackupError::Archive(output.stderr.trim().to_string()));
        }

        let directory = info.path.clone();
        info.compressed = true;
        info.path = archive.clone();
        info.size = self.fs.stat(&archive).await.map_err(BackupError::filesystem)?.len;
        self.write_manifest(&self.sidecar_for(&info.id), &info).await?;
        self.fs
            .remove_dir_all(&directory)
            .await
            .map_err(BackupError::filesystem)?;
        Ok(info)
    }

    /// Restore a backup. Problems are reported through the result; a missing
    /// or unreadable backup yields `success == false`.
    pub async fn restore_from_backup(&self, id: &str, options: &RestoreOptions) -> Result<RestoreResult, BackupError> {
        let info = match self.get_backup_info(id).await {
            Ok(Some(info)) => info,
            Ok(None) => return Ok(RestoreResult::failed(format!("Backup {id} not found"))),
            Err(e) => return Ok(RestoreResult::failed(format!("Backup {id} cannot be restored: {e}"))),
        };
        let timer = OperationTimer::new("restore_backup");
        info!(backup.id = %id, "Restoring backup");

        let (content, staging) = match self.unpacked(&info).await {
            Ok(unpacked) => unpacked,
            Err(e) => return Ok(RestoreResult::failed(format!("Backup {id} could not be unpacked: {e}"))),
        };
        let result = self.restore_contents(&info, &content, options).await;
        if let Some(staging) = staging {
            if let Err(e) = self.fs.remove_dir_all(&staging).await {
                warn!(path = %staging.display(), error = %e, "Could not remove restore staging directory");
            }
        }

        timer.finish();
        Ok(result)
    }

    async fn restore_contents(&self, info: &BackupInfo, content: &Path, options: &RestoreOptions) -> RestoreResult {
        let mut warnings = Vec::new();

        if options.stash_current {
            match self
                .git
                .stash_push(&format!("git-rescue: before restoring {}", info.id), true)
                .await
            {
                Ok(true) => info!("Stashed current changes before restore"),
                Ok(false) => {}
                Err(e) => warnings.push(format!("Could not stash current changes: {e}")),
            }
        }

        if let Some(paths) = &options.bundle_paths {
            return match self.restore_paths_from_bundle(info, content, paths).await {
                Ok(restored_files) => RestoreResult {
                    success: true,
                    restored_files,
                    warnings,
                    error: None,
                },
                Err(e) => RestoreResult::failed_with(e.to_string(), warnings),
            };
        }

        if info.has_bundle {
            if let Err(e) = self.unbundle(&content.join(BUNDLE)).await {
                return RestoreResult::failed_with(format!("Unbundling backup {} failed: {e}", info.id), warnings);
            }
        }

        let restored_files = match self
            .restore_working_tree(content, options.partial.as_deref(), &mut warnings)
            .await
        {
            Ok(files) => files,
            Err(e) => {
                warnings.push(format!("Working tree files were not restored: {e}"));
                Vec::new()
            }
        };

        if options.restore_metadata {
            if let Err(e) = self.restore_metadata(content).await {
                warnings.push(format!("Repository metadata was not restored: {e}"));
            }
        }

        if let Some(branch) = &options.target_branch {
            if let Err(e) = self.git.checkout(branch).await {
                warnings.push(format!("Could not switch to branch {branch}: {e}"));
            }
        }

        for warning in &warnings {
            warn!(backup.id = %info.id, "{}", warning);
        }
        RestoreResult {
            success: true,
            restored_files,
            warnings,
            error: None,
        }
    }

    async fn unbundle(&self, bundle: &Path) -> Result<(), BackupError> {
        self.git.bundle_verify(bundle).await?;
        let head_before = self.git.head_commit().await.ok().flatten();
        self.git
            .fetch_bundle(bundle, &BUNDLE_REFSPECS, self.config.bundle_timeout())
            .await?;
        let head_after = self.git.head_commit().await.ok().flatten();
        if head_after.is_some() && head_after != head_before {
            self.git.reset_index().await?;
        }
        Ok(())
    }

    async fn restore_working_tree(
        &self,
        content: &Path,
        partial: Option<&[PathBuf]>,
        warnings: &mut Vec<String>,
    ) -> Result<Vec<PathBuf>, BackupError> {
        let tree = content.join(WORKING_TREE);
        if !self.fs.exists(&tree) {
            return Ok(Vec::new());
        }
        let files = list_files(self.fs.as_ref(), &tree).await?;

        let selected: Vec<PathBuf> = match partial {
            Some(wanted) => {
                for path in wanted {
                    ensure_contained(path)?;
                    if !files.iter().any(|file| file.starts_with(path)) {
                        warnings.push(format!("{} is not in the backup", path.display()));
                    }
                }
                files
                    .into_iter()
                    .filter(|file| wanted.iter().any(|path| file.starts_with(path)))
                    .collect()
            }
            None => files,
        };

        let root = self.git.root();
        let mut restored = Vec::new();
        for file in selected {
            match self.fs.copy_file(&tree.join(&file), &root.join(&file)).await {
                Ok(_) => restored.push(file),
                Err(e) => warnings.push(format!("Could not restore {}: {e:#}", file.display())),
            }
        }
        Ok(restored)
    }

    async fn restore_metadata(&self, content: &Path) -> Result<(), BackupError> {
        let metadata = content.join(METADATA);
        let git_dir = self.git.git_dir();
        for entry in RESTORABLE_METADATA {
            copy_entry(self.fs.as_ref(), &metadata.join(entry), &git_dir.join(entry)).await?;
        }
        Ok(())
    }

    /// Check out `paths` from the commit captured at backup time. The bundle
    /// is fetched into a private ref namespace that is removed afterwards.
    async fn restore_paths_from_bundle(
        &self,
        info: &BackupInfo,
        content: &Path,
        paths: &[PathBuf],
    ) -> Result<Vec<PathBuf>, BackupError> {
        let commit = match (&info.branch_state.commit, info.has_bundle) {
            (Some(commit), true) => commit.clone(),
            _ => return Err(BackupError::NoBundledCommit { id: info.id.clone() }),
        };
        for path in paths {
            ensure_contained(path)?;
        }

        let bundle = content.join(BUNDLE);
        self.git.bundle_verify(&bundle).await?;
        let namespace = format!("refs/git-rescue/{}", info.id);
        let refspec = format!("+refs/heads/*:{namespace}/heads/*");
        self.git
            .fetch_bundle(&bundle, &[refspec.as_str()], self.config.bundle_timeout())
            .await?;

        let outcome = self.checkout_from_commit(&commit, paths).await;

        match self.git.list_refs(&namespace).await {
            Ok(refs) => {
                for name in refs {
                    if let Err(e) = self.git.delete_ref(&name).await {
                        warn!(reference = %name, error = %e, "Could not remove temporary restore ref");
                    }
                }
            }
            Err(e) => warn!(error = %e, "Could not list temporary restore refs"),
        }

        outcome
    }

    async fn checkout_from_commit(&self, commit: &str, paths: &[PathBuf]) -> Result<Vec<PathBuf>, BackupError> {
        if self.git.rev_parse(commit).await?.is_none() {
            return Err(BackupError::Git(GitError::GitCommandFailed {
                command: "rev-parse".to_string(),
                message: format!("commit {commit} is not available after unbundling"),
            }));
        }
        let owned: Vec<String> = paths.iter().map(|path| path.to_string_lossy().to_string()).collect();
        let args: Vec<&str> = owned.iter().map(String::as_str).collect();
        self.git.checkout_paths(commit, &args).await?;
        Ok(paths.to_vec())
    }

    /// Content directory of a backup, unpacking compressed backups into a
    /// staging directory that the caller removes.
    async fn unpacked(&self, info: &BackupInfo) -> Result<(PathBuf, Option<PathBuf>), BackupError> {
        if !info.compressed {
            return Ok((self.dir_for(&info.id), None));
        }
        let staging = self.backup_root.join(format!(".staging-{}", info.id));
        if self.fs.exists(&staging) {
            self.fs.remove_dir_all(&staging).await.map_err(BackupError::filesystem)?;
        }
        self.fs.create_dir_all(&staging).await.map_err(BackupError::filesystem)?;

        let archive = self.archive_for(&info.id).to_string_lossy().to_string();
        let staging_arg = staging.to_string_lossy().to_string();
        let output = self
            .git
            .executor()
            .execute(
                "tar",
                &["-xzf", &archive, "-C", &staging_arg],
                &self.backup_root,
                self.config.bundle_timeout(),
            )
            .await?;
        if !output.success() {
            if let Err(e) = self.fs.remove_dir_all(&staging).await {
                debug!(error = %e, "Could not remove staging directory");
            }
            return Err(BackupError::Archive(output.stderr.trim().to_string()));
        }
        Ok((staging.join(&info.id), Some(staging)))
    }

    /// Every readable manifest, newest first.
    pub async fn list_backups(&self) -> Result<Vec<BackupInfo>, BackupError> {
        if !self.fs.exists(&self.backup_root) {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();
        for entry in self
            .fs
            .read_dir(&self.backup_root)
            .await
            .map_err(BackupError::filesystem)?
        {
            let Some(name) = entry.file_name().map(|name| name.to_string_lossy().to_string()) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let is_dir = match self.fs.stat(&entry).await {
                Ok(stat) => stat.is_dir,
                Err(_) => continue,
            };
            let (id, manifest) = if is_dir {
                (name.clone(), entry.join(MANIFEST))
            } else if let Some(id) = name.strip_suffix(".json") {
                (id.to_string(), entry.clone())
            } else {
                continue;
            };
            if !self.fs.exists(&manifest) {
                continue;
            }
            match self.read_manifest(&id, &manifest).await {
                Ok(info) => backups.push(info),
                Err(e) => warn!(path = %manifest.display(), error = %e, "Skipping unreadable backup manifest"),
            }
        }

        backups.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(backups)
    }

    pub async fn get_backup_info(&self, id: &str) -> Result<Option<BackupInfo>, BackupError> {
        validate_id(id)?;
        let sidecar = self.sidecar_for(id);
        if self.fs.exists(&sidecar) {
            return self.read_manifest(id, &sidecar).await.map(Some);
        }
        let manifest = self.dir_for(id).join(MANIFEST);
        if self.fs.exists(&manifest) {
            return self.read_manifest(id, &manifest).await.map(Some);
        }
        Ok(None)
    }

    /// Returns false when there was nothing to delete.
    pub async fn delete_backup(&self, id: &str) -> Result<bool, BackupError> {
        validate_id(id)?;
        let mut removed = false;

        let dir = self.dir_for(id);
        if self.fs.exists(&dir) {
            self.fs.remove_dir_all(&dir).await.map_err(BackupError::filesystem)?;
            removed = true;
        }
        for file in [self.archive_for(id), self.sidecar_for(id)] {
            if self.fs.exists(&file) {
                self.fs.remove_file(&file).await.map_err(BackupError::filesystem)?;
                removed = true;
            }
        }

        if removed {
            info!(backup.id = %id, "Deleted backup");
        }
        Ok(removed)
    }

    /// Delete every backup beyond the `keep` newest. Returns the deleted ids.
    pub async fn cleanup_old_backups(&self, keep: usize) -> Result<Vec<String>, BackupError> {
        let mut deleted = Vec::new();
        for backup in self.list_backups().await?.into_iter().skip(keep) {
            if self.delete_backup(&backup.id).await? {
                deleted.push(backup.id);
            }
        }
        Ok(deleted)
    }

    pub async fn get_backup_storage_usage(&self) -> Result<StorageUsage, BackupError> {
        let backups = self.list_backups().await?;
        let mut total_bytes = 0;
        for backup in &backups {
            total_bytes += match tree_size(self.fs.as_ref(), &backup.path).await {
                Ok(size) => size,
                Err(_) => backup.size,
            };
        }
        Ok(StorageUsage {
            directory: self.backup_root.clone(),
            backup_count: backups.len(),
            total_bytes,
            oldest: backups.last().map(|backup| backup.created_at),
            newest: backups.first().map(|backup| backup.created_at),
        })
    }

    /// Check that a backup is complete and its bundle is readable.
    pub async fn verify_backup(&self, id: &str) -> Result<BackupVerification, BackupError> {
        let info = self
            .get_backup_info(id)
            .await?
            .ok_or_else(|| BackupError::NotFound { id: id.to_string() })?;

        let (content, staging) = match self.unpacked(&info).await {
            Ok(unpacked) => unpacked,
            Err(e) => {
                return Ok(BackupVerification {
                    id: info.id,
                    valid: false,
                    problems: vec![format!("archive cannot be unpacked: {e}")],
                })
            }
        };

        let mut problems = Vec::new();
        if !self.fs.exists(&content.join(MANIFEST)) {
            problems.push("manifest is missing".to_string());
        }
        if !self.fs.exists(&content.join(METADATA)) {
            problems.push("repository metadata is missing".to_string());
        }
        if info.has_bundle {
            let bundle = content.join(BUNDLE);
            if !self.fs.exists(&bundle) {
                problems.push("bundle is missing".to_string());
            } else if let Err(e) = self.git.bundle_verify(&bundle).await {
                problems.push(format!("bundle does not verify: {e}"));
            }
        }

        if let Some(staging) = staging {
            if let Err(e) = self.fs.remove_dir_all(&staging).await {
                debug!(error = %e, "Could not remove staging directory");
            }
        }

        Ok(BackupVerification {
            id: info.id,
            valid: problems.is_empty(),
            problems,
        })
    }

    async fn write_manifest(&self, path: &Path, info: &BackupInfo) -> Result<(), BackupError> {
        let json = serde_json::to_string_pretty(info)?;
        self.fs
            .write(path, json.as_bytes())
            .await
            .map_err(BackupError::filesystem)
    }

    async fn read_manifest(&self, id: &str, path: &Path) -> Result<BackupInfo, BackupError> {
        let text = self.fs.read_to_string(path).await.map_err(BackupError::filesystem)?;
        serde_json::from_str(&text).map_err(|e| BackupError::InvalidManifest {
            id: id.to_string(),
            reason: e.to_string(),
        })
    }

    fn dir_for(&self, id: &str) -> PathBuf {
        self.backup_root.join(id)
    }

    fn archive_for(&self, id: &str) -> PathBuf {
        self.backup_root.join(format!("{id}.tar.gz"))
    }

    fn sidecar_for(&self, id: &str) -> PathBuf {
        self.backup_root.join(format!("{id}.json"))
    }
}

fn validate_id(id: &str) -> Result<(), BackupError> {
    let valid = !id.is_empty() && !id.starts_with('.') && !id.contains(['/', '\\']) && !id.contains("..");
    if valid {
        Ok(())
    } else {
        Err(BackupError::InvalidId { id: id.to_string() })
    }
}

fn ensure_contained(path: &Path) -> Result<(), BackupError> {
    let contained = !path.as_os_str().is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
    if contained {
        Ok(())
    } else {
        Err(BackupError::UnsafePath {
            path: path.to_path_buf(),
        })
    }
}

/// Copy a file or directory if it exists.
async fn copy_entry(fs: &dyn FileSystemOperations, from: &Path, to: &Path) -> Result<(), BackupError> {
    if !fs.exists(from) {
        return Ok(());
    }
    let stat = fs.stat(from).await.map_err(BackupError::filesystem)?;
    if stat.is_dir {
        fs.create_dir_all(to).await.map_err(BackupError::filesystem)?;
        copy_tree(fs, from, to).await.map_err(BackupError::filesystem)?;
    } else if !stat.is_symlink {
        fs.copy_file(from, to).await.map_err(BackupError::filesystem)?;
    }
    Ok(())
}

/// Regular files below `root`, relative to it, sorted.
async fn list_files(fs: &dyn FileSystemOperations, root: &Path) -> Result<Vec<PathBuf>, BackupError> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for child in fs.read_dir(&dir).await.map_err(BackupError::filesystem)? {
            let stat = fs.stat(&child).await.map_err(BackupError::filesystem)?;
            if stat.is_dir {
                pending.push(child);
            } else if !stat.is_symlink {
                if let Ok(relative) = child.strip_prefix(root) {
                    files.push(relative.to_path_buf());
                }
            }
        }
    }
    files.sort();
    Ok(files)
}
