//! File system operations abstraction
//!
//! Backup and recovery code touches the filesystem only through this trait,
//! so that it can be exercised with `mockall` in tests.
//!
//! # Examples
//!
//! ```rust,no_run
//! use git_rescue::fs::{FileSystemOperations, StandardFileSystem};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let fs_ops: Arc<dyn FileSystemOperations> = Arc::new(StandardFileSystem);
//!     fs_ops.create_dir_all(Path::new("/tmp/rescue/test")).await?;
//!     fs_ops.write(Path::new("/tmp/rescue/test/a.txt"), b"hello").await?;
//!     assert!(fs_ops.exists(Path::new("/tmp/rescue/test/a.txt")));
//!     Ok(())
//! }
//! ```

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

/// Subset of file metadata the subsystem cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub len: u64,
    pub modified: Option<SystemTime>,
    pub is_dir: bool,
    pub is_symlink: bool,
    pub readonly: bool,
}

/// Trait for file system operations that can be mocked in tests
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait::async_trait]
pub trait FileSystemOperations: Send + Sync {
    /// Create a directory and all its parent directories
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Write data to a file, creating the file if it doesn't exist
    async fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;

    async fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Copy a file, creating missing parent directories of the destination
    async fn copy_file(&self, from: &Path, to: &Path) -> Result<u64>;

    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    async fn remove_file(&self, path: &Path) -> Result<()>;

    async fn remove_dir_all(&self, path: &Path) -> Result<()>;

    /// Metadata without following symlinks
    async fn stat(&self, path: &Path) -> Result<FileStat>;

    /// Immediate children of a directory
    async fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool;
}

/// Standard implementation that uses actual file system operations
pub struct StandardFileSystem;

#[async_trait::async_trait]
impl FileSystemOperations for StandardFileSystem {
    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        tokio::fs::create_dir_all(path).await.map_err(Into::into)
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        tokio::fs::write(path, contents).await.map_err(Into::into)
    }

    async fn read_to_string(&self, path: &Path) -> Result<String> {
        tokio::fs::read_to_string(path).await.map_err(Into::into)
    }

    async fn copy_file(&self, from: &Path, to: &Path) -> Result<u64> {
        if let Some(parent) = to.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(from, to).await.map_err(Into::into)
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        tokio::fs::rename(from, to).await.map_err(Into::into)
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        tokio::fs::remove_file(path).await.map_err(Into::into)
    }

    async fn remove_dir_all(&self, path: &Path) -> Result<()> {
        tokio::fs::remove_dir_all(path).await.map_err(Into::into)
    }

    async fn stat(&self, path: &Path) -> Result<FileStat> {
        let metadata = tokio::fs::symlink_metadata(path).await?;
        Ok(FileStat {
            len: metadata.len(),
            modified: metadata.modified().ok(),
            is_dir: metadata.is_dir(),
            is_symlink: metadata.file_type().is_symlink(),
            readonly: metadata.permissions().readonly(),
        })
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(path).await?;
        let mut children = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            children.push(entry.path());
        }
        children.sort();
        Ok(children)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// Copy a directory tree file by file, returning the number of files copied.
/// Symlinks are skipped.
pub async fn copy_tree(fs: &dyn FileSystemOperations, from: &Path, to: &Path) -> Result<usize> {
    let mut copied = 0;
    let mut pending = vec![from.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for child in fs.read_dir(&dir).await? {
            let stat = fs.stat(&child).await?;
            if stat.is_symlink {
                continue;
            }
            let relative = child.strip_prefix(from)?;
            if stat.is_dir {
                fs.create_dir_all(&to.join(relative)).await?;
                pending.push(child);
            } else {
                fs.copy_file(&child, &to.join(relative)).await?;
                copied += 1;
            }
        }
    }
    Ok(copied)
}

/// Total size in bytes of every regular file below `path`.
pub async fn tree_size(fs: &dyn FileSystemOperations, path: &Path) -> Result<u64> {
    let stat = fs.stat(path).await?;
    if !stat.is_dir {
        return Ok(stat.len);
    }
    let mut total = 0;
    let mut pending = vec![path.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for child in fs.read_dir(&dir).await? {
            let stat = fs.stat(&child).await?;
            if stat.is_dir {
                pending.push(child);
            } else if !stat.is_symlink {
                total += stat.len;
            }
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_copy_tree_and_size() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("refs/heads")).unwrap();
        std::fs::write(src.path().join("refs/heads/main"), "0123456789").unwrap();
        std::fs::write(src.path().join("HEAD"), "ref: refs/heads/main\n").unwrap();

        let fs = StandardFileSystem;
        let copied = copy_tree(&fs, src.path(), dst.path()).await.unwrap();

        assert_eq!(copied, 2);
        assert!(dst.path().join("refs/heads/main").exists());
        assert_eq!(tree_size(&fs, dst.path()).await.unwrap(), 10 + 21);
    }

    #[tokio::test]
    async fn test_mocked_filesystem() {
        let mut mock_fs = MockFileSystemOperations::new();
        mock_fs
            .expect_exists()
            .returning(|path| path.ends_with("index.lock"));

        assert!(mock_fs.exists(Path::new("/repo/.git/index.lock")));
        assert!(!mock_fs.exists(Path::new("/repo/.git/HEAD.lock")));
    }
}
