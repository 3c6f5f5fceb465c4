//! Repository backups: create, restore, inventory and retention.

pub mod manager;
pub mod types;

pub use manager::BackupManager;
pub use types::{
    BackupError, BackupInfo, BackupOptions, BackupVerification, BranchState, RestoreOptions, RestoreResult,
    StorageUsage,
};
