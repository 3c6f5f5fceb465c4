use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Every kind of anomaly the detector can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptionType {
    CorruptObject,
    MissingObject,
    CorruptIndex,
    InvalidIndex,
    CorruptRef,
    DanglingRef,
    InvalidRefFormat,
    StaleLockFile,
    IndexLock,
    RefLock,
    IncompleteMerge,
    IncompleteRebase,
    IncompleteCherryPick,
    IncompleteApply,
    CorruptConfig,
    InvalidRemote,
    PermissionDenied,
    DiskFull,
    CorruptPackfile,
    FilesystemError,
}

impl CorruptionType {
    pub const ALL: [CorruptionType; 20] = [
        CorruptionType::CorruptObject,
        CorruptionType::MissingObject,
        CorruptionType::CorruptIndex,
        CorruptionType::InvalidIndex,
        CorruptionType::CorruptRef,
        CorruptionType::DanglingRef,
        CorruptionType::InvalidRefFormat,
        CorruptionType::StaleLockFile,
        CorruptionType::IndexLock,
        CorruptionType::RefLock,
        CorruptionType::IncompleteMerge,
        CorruptionType::IncompleteRebase,
        CorruptionType::IncompleteCherryPick,
        CorruptionType::IncompleteApply,
        CorruptionType::CorruptConfig,
        CorruptionType::InvalidRemote,
        CorruptionType::PermissionDenied,
        CorruptionType::DiskFull,
        CorruptionType::CorruptPackfile,
        CorruptionType::FilesystemError,
    ];

    pub fn is_lock(self) -> bool {
        matches!(
            self,
            CorruptionType::StaleLockFile | CorruptionType::IndexLock | CorruptionType::RefLock
        )
    }
}

impl fmt::Display for CorruptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CorruptionType::CorruptObject => "corrupt object",
            CorruptionType::MissingObject => "missing object",
            CorruptionType::CorruptIndex => "corrupt index",
            CorruptionType::InvalidIndex => "invalid index",
            CorruptionType::CorruptRef => "corrupt reference",
            CorruptionType::DanglingRef => "dangling reference",
            CorruptionType::InvalidRefFormat => "malformed reference",
            CorruptionType::StaleLockFile => "stale lock file",
            CorruptionType::IndexLock => "stale index lock",
            CorruptionType::RefLock => "stale ref lock",
            CorruptionType::IncompleteMerge => "incomplete merge",
            CorruptionType::IncompleteRebase => "incomplete rebase",
            CorruptionType::IncompleteCherryPick => "incomplete cherry-pick",
            CorruptionType::IncompleteApply => "incomplete patch application",
            CorruptionType::CorruptConfig => "corrupt config",
            CorruptionType::InvalidRemote => "invalid remote",
            CorruptionType::PermissionDenied => "permission denied",
            CorruptionType::DiskFull => "disk full",
            CorruptionType::CorruptPackfile => "corrupt packfile",
            CorruptionType::FilesystemError => "filesystem error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Points deducted from the integrity score per issue.
    pub fn deduction(self) -> u32 {
        match self {
            Severity::Low => 5,
            Severity::Medium => 15,
            Severity::High => 30,
            Severity::Critical => 50,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        })
    }
}

/// A detected anomaly in repository state plus remediation metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorruptionIssue {
    pub id: String,
    #[serde(rename = "type")]
    pub issue_type: CorruptionType,
    pub severity: Severity,
    pub description: String,
    /// Paths relative to the repository root.
    pub affected_files: Vec<PathBuf>,
    /// The ref, remote, object id or operation the issue is about.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub detected_at: DateTime<Utc>,
    pub auto_recoverable: bool,
    pub recommended_actions: Vec<String>,
    pub potential_data_loss: bool,
    pub backup_required: bool,
}

impl CorruptionIssue {
    pub fn new(issue_type: CorruptionType, severity: Severity, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            issue_type,
            severity,
            description: description.into(),
            affected_files: Vec::new(),
            target: None,
            detected_at: Utc::now(),
            auto_recoverable: false,
            recommended_actions: Vec::new(),
            potential_data_loss: false,
            backup_required: false,
        }
    }

    pub fn with_files(mut self, files: impl IntoIterator<Item = PathBuf>) -> Self {
        self.affected_files.extend(files);
        self
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.affected_files.push(file.into());
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn auto_recoverable(mut self) -> Self {
        self.auto_recoverable = true;
        self
    }

    /// Marks the issue as risking data loss; such issues also require a backup.
    pub fn with_data_loss(mut self) -> Self {
        self.potential_data_loss = true;
        self.backup_required = true;
        self
    }

    pub fn recommend(mut self, action: impl Into<String>) -> Self {
        self.recommended_actions.push(action.into());
        self
    }

    /// Whether two issues describe the same anomaly, ignoring identity and time.
    pub fn same_anomaly(&self, other: &CorruptionIssue) -> bool {
        self.issue_type == other.issue_type
            && self.target == other.target
            && self.affected_files == other.affected_files
    }
}

/// Outcome of a full detection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub is_corrupted: bool,
    pub issues: Vec<CorruptionIssue>,
    pub integrity_score: u8,
    pub last_check: DateTime<Utc>,
    pub check_duration_ms: u64,
}

impl DetectionResult {
    pub fn from_issues(issues: Vec<CorruptionIssue>, check_duration_ms: u64) -> Self {
        Self {
            is_corrupted: !issues.is_empty(),
            integrity_score: integrity_score(&issues),
            issues,
            last_check: Utc::now(),
            check_duration_ms,
        }
    }

    /// Total failure: the repository could not be inspected at all.
    pub fn inaccessible(description: impl Into<String>, check_duration_ms: u64) -> Self {
        let issue = CorruptionIssue::new(CorruptionType::FilesystemError, Severity::Critical, description)
            .with_data_loss()
            .recommend("Verify that the repository path exists and is readable");
        Self {
            is_corrupted: true,
            issues: vec![issue],
            integrity_score: 0,
            last_check: Utc::now(),
            check_duration_ms,
        }
    }

    pub fn worst_severity(&self) -> Option<Severity> {
        self.issues.iter().map(|issue| issue.severity).max()
    }

    pub fn issues_of(&self, issue_type: CorruptionType) -> impl Iterator<Item = &CorruptionIssue> {
        self.issues.iter().filter(move |issue| issue.issue_type == issue_type)
    }
}

/// 100 minus the severity deductions of every issue, floored at zero.
pub fn integrity_score(issues: &[CorruptionIssue]) -> u8 {
    let deducted: u32 = issues.iter().map(|issue| issue.severity.deduction()).sum();
    100u32.saturating_sub(deducted) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn issue(severity: Severity) -> CorruptionIssue {
        CorruptionIssue::new(CorruptionType::DanglingRef, severity, "test")
    }

    fn severity_strategy() -> impl Strategy<Value = Severity> {
        prop_oneof![
            Just(Severity::Low),
            Just(Severity::Medium),
            Just(Severity::High),
            Just(Severity::Critical),
        ]
    }

    #[test]
    fn test_score_deductions() {
        assert_eq!(integrity_score(&[]), 100);
        assert_eq!(integrity_score(&[issue(Severity::Medium)]), 85);
        assert_eq!(integrity_score(&[issue(Severity::Low), issue(Severity::High)]), 65);
        assert_eq!(integrity_score(&[issue(Severity::Critical), issue(Severity::Critical), issue(Severity::Low)]), 0);
    }

    #[test]
    fn test_inaccessible_result_scores_zero() {
        let result = DetectionResult::inaccessible("gone", 3);
        assert!(result.is_corrupted);
        assert_eq!(result.integrity_score, 0);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].issue_type, CorruptionType::FilesystemError);
        assert_eq!(result.issues[0].severity, Severity::Critical);
    }

    #[test]
    fn test_issue_serializes_type_field() {
        let value = serde_json::to_value(issue(Severity::Low)).unwrap();
        assert_eq!(value["type"], "dangling_ref");
        assert_eq!(value["severity"], "low");
        assert!(value.get("target").is_none());
    }

    proptest! {
        #[test]
        fn score_stays_in_range(severities in proptest::collection::vec(severity_strategy(), 0..30)) {
            let issues: Vec<_> = severities.into_iter().map(issue).collect();
            let result = DetectionResult::from_issues(issues, 0);
            prop_assert!(result.integrity_score <= 100);
            prop_assert_eq!(result.is_corrupted, !result.issues.is_empty());
        }

        #[test]
        fn superset_never_scores_higher(
            base in proptest::collection::vec(severity_strategy(), 0..10),
            extra in proptest::collection::vec(severity_strategy(), 0..10),
        ) {
            let subset: Vec<_> = base.iter().copied().map(issue).collect();
            let mut superset = subset.clone();
            superset.extend(extra.into_iter().map(issue));
            prop_assert!(integrity_score(&superset) <= integrity_score(&subset));
        }

        #[test]
        fn score_is_order_independent(mut severities in proptest::collection::vec(severity_strategy(), 0..12)) {
            let forward: Vec<_> = severities.iter().copied().map(issue).collect();
            severities.reverse();
            let backward: Vec<_> = severities.into_iter().map(issue).collect();
            prop_assert_eq!(integrity_score(&forward), integrity_score(&backward));
        }
    }
}
