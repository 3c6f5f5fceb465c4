//! External tool abstractions
//!
//! Trait-based abstractions over the git CLI and process execution, so that
//! detection and recovery logic can be exercised against scripted executors.

pub mod command;
pub mod git;
#[cfg(any(test, feature = "testing"))]
pub mod scripted;

pub use command::{CommandError, CommandExecutor, CommandOutput, ProcessCommandExecutor};
pub use git::{resolve_git_dir, GitClient, GitError, GitStatus, InProgressOperation};
