// git-rescue library - repository integrity diagnosis and recovery
// This exposes the core components for embedding and integration tests

pub mod backup;
pub mod cli;
pub mod config;
pub mod detection;
pub mod external;
pub mod fs;
pub mod guide;
pub mod observability;
pub mod recovery;
pub mod telemetry;

// Re-export key types for easy access
pub use backup::{BackupError, BackupInfo, BackupManager, BackupOptions, RestoreOptions, RestoreResult};
pub use config::RescueConfig;
pub use detection::{integrity_score, CorruptionDetector, CorruptionIssue, CorruptionType, DetectionResult, Severity};
pub use external::{CommandExecutor, GitClient, GitError, ProcessCommandExecutor};
pub use fs::{FileSystemOperations, StandardFileSystem};
pub use guide::{analyze_error, is_corruption_indicator, ErrorAnalysis};
pub use observability::{OperationTimer, RecoveryMetrics};
pub use recovery::{
    DataLossRisk, MaxDataLoss, QuickCheck, RecoveryAction, RecoveryCoordinator, RecoveryError, RecoveryOptions,
    RecoveryPlan, RecoveryResult, StrategyRegistry,
};
pub use telemetry::{generate_correlation_id, init_telemetry};
