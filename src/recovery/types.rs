use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::detection::{CorruptionIssue, CorruptionType, DetectionResult, Severity};
use crate::external::{GitError, InProgressOperation};

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("Invalid recovery options: {0}")]
    InvalidOptions(String),
    #[error("Backup failed and confirmation was required, recovery aborted: {0}")]
    BackupFailed(String),
    #[error("Git error: {0}")]
    Git(#[from] GitError),
    #[error("Filesystem error: {0}")]
    Filesystem(String),
    #[error("Path {path} is not inside the repository")]
    UnsafePath { path: PathBuf },
    #[error("Manual intervention required: {instruction}")]
    ManualInterventionRequired { instruction: String },
    #[error("No recovery strategy handles {issue_type}")]
    NoStrategy { issue_type: CorruptionType },
    #[error("Recovery exceeded its {minutes} minute budget")]
    Timeout { minutes: u32 },
}

impl RecoveryError {
    pub fn filesystem(error: anyhow::Error) -> Self {
        RecoveryError::Filesystem(format!("{error:#}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    AutoRepair,
    SafeRepair,
    ManualIntervention,
    BackupRestore,
    DataReconstruction,
}

/// Ordered none < minimal < moderate < high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataLossRisk {
    #[default]
    None,
    Minimal,
    Moderate,
    High,
}

impl DataLossRisk {
    pub fn rank(self) -> u8 {
        match self {
            DataLossRisk::None => 0,
            DataLossRisk::Minimal => 1,
            DataLossRisk::Moderate => 2,
            DataLossRisk::High => 3,
        }
    }
}

impl fmt::Display for DataLossRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataLossRisk::None => "none",
            DataLossRisk::Minimal => "minimal",
            DataLossRisk::Moderate => "moderate",
            DataLossRisk::High => "high",
        })
    }
}

/// The most data loss a caller will tolerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxDataLoss {
    None,
    Minimal,
    Moderate,
    Acceptable,
}

impl MaxDataLoss {
    pub fn rank(self) -> u8 {
        match self {
            MaxDataLoss::None => 0,
            MaxDataLoss::Minimal => 1,
            MaxDataLoss::Moderate => 2,
            MaxDataLoss::Acceptable => 3,
        }
    }

    pub fn permits(self, risk: DataLossRisk) -> bool {
        risk.rank() <= self.rank()
    }
}

impl std::str::FromStr for MaxDataLoss {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(MaxDataLoss::None),
            "minimal" => Ok(MaxDataLoss::Minimal),
            "moderate" => Ok(MaxDataLoss::Moderate),
            "acceptable" => Ok(MaxDataLoss::Acceptable),
            other => Err(format!("unknown data loss level '{other}'")),
        }
    }
}

/// A single typed remediation step. Paths are relative to the repository root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RecoveryOperation {
    RemoveFile { path: PathBuf },
    MoveFile { from: PathBuf, to: PathBuf },
    CreateStash { message: String, include_untracked: bool },
    AbortOperation { operation: InProgressOperation },
    ResetIndex,
    DeleteRef { name: String },
    RemoveRemote { name: String },
    GarbageCollect { aggressive: bool },
    Repack { aggressive: bool },
    FetchAll,
    /// Rewrite an unreadable HEAD as a symbolic ref to the branch it last
    /// pointed at, taken from the HEAD reflog.
    RepairHead,
    /// Cannot be automated; the instruction is surfaced to the user.
    Manual { instruction: String },
}

impl fmt::Display for RecoveryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryOperation::RemoveFile { path } => write!(f, "remove {}", path.display()),
            RecoveryOperation::MoveFile { from, to } => write!(f, "move {} to {}", from.display(), to.display()),
            RecoveryOperation::CreateStash { message, .. } => write!(f, "git stash push -m {message:?}"),
            RecoveryOperation::AbortOperation { operation } => write!(f, "git {}", operation.abort_args().join(" ")),
            RecoveryOperation::ResetIndex => f.write_str("git reset --mixed HEAD"),
            RecoveryOperation::DeleteRef { name } => write!(f, "git update-ref -d {name}"),
            RecoveryOperation::RemoveRemote { name } => write!(f, "git remote remove {name}"),
            RecoveryOperation::GarbageCollect { aggressive } => {
                f.write_str(if *aggressive { "git gc --prune=now --aggressive" } else { "git gc --prune=now" })
            }
            RecoveryOperation::Repack { aggressive } => {
                f.write_str(if *aggressive { "git repack -a -d -f" } else { "git repack -a -d" })
            }
            RecoveryOperation::FetchAll => f.write_str("git fetch --all"),
            RecoveryOperation::RepairHead => f.write_str("point HEAD at its last checked-out branch"),
            RecoveryOperation::Manual { instruction } => write!(f, "manual: {instruction}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryAction {
    pub strategy_kind: StrategyKind,
    pub description: String,
    pub operations: Vec<RecoveryOperation>,
    pub data_loss_risk: DataLossRisk,
    /// Percent, 0 to 100.
    pub success_probability: u8,
    pub estimated_time_minutes: u32,
    pub requires_backup: bool,
    pub requires_user_confirmation: bool,
    pub issue_id: String,
    pub issue_type: CorruptionType,
}

impl RecoveryAction {
    pub fn new(issue: &CorruptionIssue, strategy_kind: StrategyKind, description: impl Into<String>) -> Self {
        Self {
            strategy_kind,
            description: description.into(),
            operations: Vec::new(),
            data_loss_risk: DataLossRisk::None,
            success_probability: 90,
            estimated_time_minutes: 1,
            requires_backup: false,
            requires_user_confirmation: false,
            issue_id: issue.id.clone(),
            issue_type: issue.issue_type,
        }
    }

    pub fn operation(mut self, operation: RecoveryOperation) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn risk(mut self, risk: DataLossRisk) -> Self {
        self.data_loss_risk = risk;
        self
    }

    pub fn success_probability(mut self, percent: u8) -> Self {
        self.success_probability = percent.min(100);
        self
    }

    pub fn minutes(mut self, minutes: u32) -> Self {
        self.estimated_time_minutes = minutes;
        self
    }

    pub fn needs_backup(mut self) -> Self {
        self.requires_backup = true;
        self
    }

    pub fn needs_confirmation(mut self) -> Self {
        self.requires_user_confirmation = true;
        self
    }

    pub fn is_manual(&self) -> bool {
        self.operations
            .iter()
            .any(|operation| matches!(operation, RecoveryOperation::Manual { .. }))
    }

    pub fn is_stash(&self) -> bool {
        !self.operations.is_empty()
            && self
                .operations
                .iter()
                .all(|operation| matches!(operation, RecoveryOperation::CreateStash { .. }))
    }

    /// Position in an execution plan: ascending risk, with stashes placed
    /// after minimal-risk steps and before the first destructive one.
    fn execution_rank(&self) -> u8 {
        if self.is_stash() {
            DataLossRisk::Moderate.rank() * 2
        } else {
            self.data_loss_risk.rank() * 2 + 1
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryOptions {
    pub max_data_loss: MaxDataLoss,
    pub auto_repair: bool,
    pub create_backup: bool,
    pub preserve_uncommitted: bool,
    pub aggressive: bool,
    pub timeout_minutes: u32,
    pub require_confirmation: bool,
}

impl Default for RecoveryOptions {
    fn default() -> Self {
        Self {
            max_data_loss: MaxDataLoss::Minimal,
            auto_repair: false,
            create_backup: true,
            preserve_uncommitted: true,
            aggressive: false,
            timeout_minutes: 30,
            require_confirmation: true,
        }
    }
}

impl RecoveryOptions {
    pub fn validate(&self) -> Result<(), RecoveryError> {
        if self.timeout_minutes == 0 {
            return Err(RecoveryError::InvalidOptions(
                "timeout_minutes must be at least 1".to_string(),
            ));
        }
        if self.timeout_minutes > 24 * 60 {
            return Err(RecoveryError::InvalidOptions(
                "timeout_minutes may not exceed one day".to_string(),
            ));
        }
        Ok(())
    }
}

/// Recommendation tier derived from the worst severity present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryPriority {
    Critical,
    High,
    Medium,
    Low,
}

impl RecoveryPriority {
    pub fn for_severity(severity: Option<Severity>) -> Self {
        match severity {
            Some(Severity::Critical) => RecoveryPriority::Critical,
            Some(Severity::High) => RecoveryPriority::High,
            Some(Severity::Medium) => RecoveryPriority::Medium,
            Some(Severity::Low) | None => RecoveryPriority::Low,
        }
    }

    /// Canned options for this tier.
    pub fn preset(self) -> RecoveryOptions {
        match self {
            RecoveryPriority::Critical => RecoveryOptions {
                max_data_loss: MaxDataLoss::None,
                auto_repair: false,
                create_backup: true,
                preserve_uncommitted: true,
                aggressive: false,
                timeout_minutes: 60,
                require_confirmation: true,
            },
            RecoveryPriority::High => RecoveryOptions {
                max_data_loss: MaxDataLoss::Minimal,
                auto_repair: false,
                create_backup: true,
                preserve_uncommitted: true,
                aggressive: false,
                timeout_minutes: 45,
                require_confirmation: true,
            },
            RecoveryPriority::Medium => RecoveryOptions {
                max_data_loss: MaxDataLoss::Minimal,
                auto_repair: true,
                create_backup: true,
                preserve_uncommitted: true,
                aggressive: false,
                timeout_minutes: 30,
                require_confirmation: false,
            },
            RecoveryPriority::Low => RecoveryOptions {
                max_data_loss: MaxDataLoss::None,
                auto_repair: true,
                create_backup: false,
                preserve_uncommitted: true,
                aggressive: false,
                timeout_minutes: 15,
                require_confirmation: false,
            },
        }
    }
}

impl fmt::Display for RecoveryPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecoveryPriority::Critical => "critical",
            RecoveryPriority::High => "high",
            RecoveryPriority::Medium => "medium",
            RecoveryPriority::Low => "low",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryRecommendation {
    pub priority: RecoveryPriority,
    pub options: RecoveryOptions,
    /// False only when critical issues demand manual intervention first.
    pub can_proceed: bool,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryPlan {
    pub issues: Vec<CorruptionIssue>,
    pub actions: Vec<RecoveryAction>,
    pub estimated_time_minutes: u32,
    pub data_loss_risk: DataLossRisk,
    pub requires_backup: bool,
    pub requires_confirmation: bool,
    pub can_auto_execute: bool,
}

impl RecoveryPlan {
    /// Aggregate actions into a plan. Actions are stably ordered by ascending
    /// risk and only the first stash action is kept.
    pub fn assemble(issues: Vec<CorruptionIssue>, mut actions: Vec<RecoveryAction>, options: &RecoveryOptions) -> Self {
        let mut stashed = false;
        actions.retain(|action| {
            if !action.is_stash() {
                return true;
            }
            !std::mem::replace(&mut stashed, true)
        });
        actions.sort_by_key(RecoveryAction::execution_rank);

        let estimated_time_minutes = actions.iter().map(|action| action.estimated_time_minutes).sum();
        let data_loss_risk = actions
            .iter()
            .map(|action| action.data_loss_risk)
            .max()
            .unwrap_or_default();
        let any_needs_confirmation = actions.iter().any(|action| action.requires_user_confirmation);
        let requires_backup = options.create_backup
            || actions.iter().any(|action| action.requires_backup)
            || issues.iter().any(|issue| issue.backup_required);
        let requires_confirmation = options.require_confirmation || any_needs_confirmation;
        let can_auto_execute =
            options.auto_repair && !any_needs_confirmation && options.max_data_loss.permits(data_loss_risk);

        Self {
            issues,
            actions,
            estimated_time_minutes,
            data_loss_risk,
            requires_backup,
            requires_confirmation,
            can_auto_execute,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryResult {
    pub success: bool,
    pub applied_actions: Vec<RecoveryAction>,
    pub resolved_issues: Vec<CorruptionIssue>,
    pub remaining_issues: Vec<CorruptionIssue>,
    pub data_loss: bool,
    pub recovery_time_ms: u64,
    pub user_messages: Vec<String>,
    pub next_steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_created: Option<String>,
}

/// Progress callback payload: one per completed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryProgress {
    pub label: String,
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Created,
    Backup,
    Executing,
    Validating,
    Success,
    Partial,
    Failed,
}

impl SessionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionPhase::Success | SessionPhase::Partial | SessionPhase::Failed)
    }
}

/// One plan-execution attempt, held in memory by the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoverySession {
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub phase: SessionPhase,
    pub detection_result: Option<DetectionResult>,
    pub planned_actions: Vec<RecoveryAction>,
    pub executed_actions: Vec<RecoveryAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<RecoveryResult>,
    pub options: RecoveryOptions,
}
