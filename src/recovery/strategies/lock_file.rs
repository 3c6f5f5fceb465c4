use crate::detection::{CorruptionIssue, CorruptionType};
use crate::recovery::strategies::{manual_action, RecoveryStrategy};
use crate::recovery::types::{DataLossRisk, RecoveryAction, RecoveryError, RecoveryOperation, RecoveryOptions, StrategyKind};

/// Deletes stale lock files left by interrupted git processes.
pub struct LockFileStrategy;

const HANDLED: &[CorruptionType] = &[
    CorruptionType::StaleLockFile,
    CorruptionType::IndexLock,
    CorruptionType::RefLock,
];

impl RecoveryStrategy for LockFileStrategy {
    fn name(&self) -> &'static str {
        "lock_file"
    }

    fn handled_types(&self) -> &'static [CorruptionType] {
        HANDLED
    }

    fn generate_actions(
        &self,
        issue: &CorruptionIssue,
        _options: &RecoveryOptions,
    ) -> Result<Vec<RecoveryAction>, RecoveryError> {
        if issue.affected_files.is_empty() {
            return Ok(vec![manual_action(
                issue,
                StrategyKind::ManualIntervention,
                DataLossRisk::None,
                "Locate and remove the stale *.lock file under .git once no git process is running",
            )]);
        }

        Ok(issue
            .affected_files
            .iter()
            .map(|path| {
                RecoveryAction::new(
                    issue,
                    StrategyKind::AutoRepair,
                    format!("Remove stale lock file {}", path.display()),
                )
                .operation(RecoveryOperation::RemoveFile { path: path.clone() })
                .risk(DataLossRisk::None)
                .success_probability(95)
                .minutes(1)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Severity;
    use std::path::PathBuf;

    #[test]
    fn test_one_removal_per_lock_file() {
        let issue = CorruptionIssue::new(CorruptionType::IndexLock, Severity::Medium, "lock")
            .with_file(".git/index.lock");
        let actions = LockFileStrategy
            .generate_actions(&issue, &RecoveryOptions::default())
            .unwrap();

        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].data_loss_risk, DataLossRisk::None);
        assert_eq!(actions[0].success_probability, 95);
        assert!(!actions[0].requires_user_confirmation);
        assert_eq!(
            actions[0].operations,
            vec![RecoveryOperation::RemoveFile {
                path: PathBuf::from(".git/index.lock")
            }]
        );
        assert_eq!(actions[0].issue_id, issue.id);
    }
}
