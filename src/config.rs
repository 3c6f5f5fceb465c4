use anyhow::Result;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::recovery::RecoveryOptions;

/// Main configuration structure for git-rescue
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RescueConfig {
    /// Structural check thresholds and timeouts
    pub detection: DetectionConfig,
    /// Backup location and retention
    pub backup: BackupConfig,
    /// Default recovery behaviour
    pub recovery: RecoveryConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DetectionConfig {
    /// Age after which index/HEAD/config locks count as stale
    pub top_level_lock_max_age_secs: u64,
    /// Age after which lock files under refs/ count as stale
    pub ref_lock_max_age_secs: u64,
    /// Bound for the full object database scan
    pub fsck_timeout_secs: u64,
    /// Bound for verifying a single packfile
    pub pack_verify_timeout_secs: u64,
    /// Bound for each of the lighter checks
    pub check_timeout_secs: u64,
    /// Bound for every check during a quick pre-flight scan
    pub quick_check_timeout_secs: u64,
    /// Free space below which the disk is considered full
    pub min_free_space_mb: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            top_level_lock_max_age_secs: 60,
            ref_lock_max_age_secs: 300,
            fsck_timeout_secs: 120,
            pack_verify_timeout_secs: 60,
            check_timeout_secs: 15,
            quick_check_timeout_secs: 5,
            min_free_space_mb: 10,
        }
    }
}

impl DetectionConfig {
    pub fn top_level_lock_max_age(&self) -> Duration {
        Duration::from_secs(self.top_level_lock_max_age_secs)
    }

    pub fn ref_lock_max_age(&self) -> Duration {
        Duration::from_secs(self.ref_lock_max_age_secs)
    }

    pub fn fsck_timeout(&self) -> Duration {
        Duration::from_secs(self.fsck_timeout_secs)
    }

    pub fn pack_verify_timeout(&self) -> Duration {
        Duration::from_secs(self.pack_verify_timeout_secs)
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs)
    }

    pub fn quick_check_timeout(&self) -> Duration {
        Duration::from_secs(self.quick_check_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackupConfig {
    /// Backup root; relative paths are resolved against the repository root
    pub directory: PathBuf,
    /// Number of backups kept before the oldest are deleted
    pub max_backups: usize,
    /// Compress new backups into a single archive
    pub compress: bool,
    /// Copy tracked and untracked working files into new backups
    pub include_working_tree: bool,
    /// Bound for bundle creation and unbundling
    pub bundle_timeout_secs: u64,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(".git/rescue-backups"),
            max_backups: 10,
            compress: false,
            include_working_tree: true,
            bundle_timeout_secs: 300,
        }
    }
}

impl BackupConfig {
    pub fn resolve_directory(&self, repo_root: &Path) -> PathBuf {
        if self.directory.is_absolute() {
            self.directory.clone()
        } else {
            repo_root.join(&self.directory)
        }
    }

    pub fn bundle_timeout(&self) -> Duration {
        Duration::from_secs(self.bundle_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecoveryConfig {
    /// Options used when the caller does not supply any
    pub defaults: RecoveryOptions,
    /// Bound for each repair command
    pub command_timeout_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            defaults: RecoveryOptions::default(),
            command_timeout_secs: 120,
        }
    }
}

impl RecoveryConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable output
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl RescueConfig {
    /// Load configuration from the current directory.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Load configuration with precedence:
    /// 1. Default values
    /// 2. Configuration files (git-rescue.toml, .git-rescue-rc)
    /// 3. Environment variables (GIT_RESCUE_<SECTION>__<KEY>)
    pub fn load_from(dir: &Path) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&RescueConfig::default())?);

        let toml_path = dir.join("git-rescue.toml");
        if toml_path.exists() {
            builder = builder.add_source(File::new(&toml_path.to_string_lossy(), FileFormat::Toml));
        }

        let rc_path = dir.join(".git-rescue-rc");
        if rc_path.exists() {
            builder = builder.add_source(File::new(&rc_path.to_string_lossy(), FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("GIT_RESCUE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}
