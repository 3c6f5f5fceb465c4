use crate::detection::{CorruptionIssue, CorruptionType};
use crate::recovery::strategies::{manual_action, RecoveryStrategy};
use crate::recovery::types::{DataLossRisk, RecoveryAction, RecoveryError, RecoveryOptions, StrategyKind};

/// Permission, disk space and filesystem problems. Nothing inside the
/// repository can fix these, so every action is a manual instruction.
pub struct EnvironmentStrategy;

const HANDLED: &[CorruptionType] = &[
    CorruptionType::PermissionDenied,
    CorruptionType::DiskFull,
    CorruptionType::FilesystemError,
];

impl RecoveryStrategy for EnvironmentStrategy {
    fn name(&self) -> &'static str {
        "environment"
    }

    fn handled_types(&self) -> &'static [CorruptionType] {
        HANDLED
    }

    fn generate_actions(
        &self,
        issue: &CorruptionIssue,
        _options: &RecoveryOptions,
    ) -> Result<Vec<RecoveryAction>, RecoveryError> {
        let instruction = match issue.issue_type {
            CorruptionType::PermissionDenied => {
                "Restore ownership and write permission on the .git directory (for example `chown -R $USER .git`)"
            }
            CorruptionType::DiskFull => "Free disk space on the volume holding the repository, then run detection again",
            _ => "Check that the repository path exists, is mounted and is readable",
        };
        let mut action = manual_action(issue, StrategyKind::ManualIntervention, DataLossRisk::None, instruction);
        action.requires_backup = false;
        action.estimated_time_minutes = 5;
        Ok(vec![action])
    }
}
