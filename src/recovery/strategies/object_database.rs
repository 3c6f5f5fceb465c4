use crate::detection::{CorruptionIssue, CorruptionType};
use crate::recovery::strategies::{manual_action, preserve_uncommitted, RecoveryStrategy};
use crate::recovery::types::{DataLossRisk, RecoveryAction, RecoveryError, RecoveryOperation, RecoveryOptions, StrategyKind};

/// Repacks damaged packfiles, refetches missing objects and points at
/// backups for genuinely corrupt objects.
pub struct ObjectDatabaseStrategy;

const HANDLED: &[CorruptionType] = &[
    CorruptionType::CorruptObject,
    CorruptionType::MissingObject,
    CorruptionType::CorruptPackfile,
];

impl RecoveryStrategy for ObjectDatabaseStrategy {
    fn name(&self) -> &'static str {
        "object_database"
    }

    fn handled_types(&self) -> &'static [CorruptionType] {
        HANDLED
    }

    fn generate_actions(
        &self,
        issue: &CorruptionIssue,
        options: &RecoveryOptions,
    ) -> Result<Vec<RecoveryAction>, RecoveryError> {
        let action = match issue.issue_type {
            CorruptionType::CorruptPackfile => {
                RecoveryAction::new(issue, StrategyKind::AutoRepair, "Repack the object database")
                    .operation(RecoveryOperation::Repack {
                        aggressive: options.aggressive,
                    })
                    .risk(DataLossRisk::Moderate)
                    .success_probability(75)
                    .minutes(10)
                    .needs_backup()
                    .needs_confirmation()
            }
            CorruptionType::MissingObject => RecoveryAction::new(
                issue,
                StrategyKind::DataReconstruction,
                "Fetch missing objects from every configured remote",
            )
            .operation(RecoveryOperation::FetchAll)
            .risk(DataLossRisk::High)
            .success_probability(50)
            .minutes(15)
            .needs_backup()
            .needs_confirmation(),
            _ => {
                let mut action = manual_action(
                    issue,
                    StrategyKind::BackupRestore,
                    DataLossRisk::High,
                    "Restore from a backup with `git-rescue backup list` and `git-rescue backup restore <id>`, or re-clone and copy local work across",
                );
                action.estimated_time_minutes = 30;
                action
            }
        };
        Ok(preserve_uncommitted(issue, options, vec![action]))
    }
}
