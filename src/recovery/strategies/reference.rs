use crate::detection::{CorruptionIssue, CorruptionType};
use crate::recovery::strategies::{manual_action, RecoveryStrategy};
use crate::recovery::types::{DataLossRisk, RecoveryAction, RecoveryError, RecoveryOperation, RecoveryOptions, StrategyKind};

/// Prunes dangling refs, deletes malformed ref files, repairs an unreadable
/// HEAD in place and escalates anything deeper.
pub struct ReferenceStrategy;

const HANDLED: &[CorruptionType] = &[
    CorruptionType::CorruptRef,
    CorruptionType::DanglingRef,
    CorruptionType::InvalidRefFormat,
];

impl RecoveryStrategy for ReferenceStrategy {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn handled_types(&self) -> &'static [CorruptionType] {
        HANDLED
    }

    fn generate_actions(
        &self,
        issue: &CorruptionIssue,
        options: &RecoveryOptions,
    ) -> Result<Vec<RecoveryAction>, RecoveryError> {
        let action = match (issue.issue_type, issue.target.as_deref(), issue.affected_files.first()) {
            (CorruptionType::DanglingRef, Some(name), _) => {
                RecoveryAction::new(issue, StrategyKind::AutoRepair, format!("Delete dangling reference {name} and collect garbage"))
                    .operation(RecoveryOperation::DeleteRef { name: name.to_string() })
                    .operation(RecoveryOperation::GarbageCollect {
                        aggressive: options.aggressive,
                    })
                    .risk(DataLossRisk::Moderate)
                    .success_probability(85)
                    .minutes(3)
            }
            // Without HEAD git no longer recognises the repository.
            (CorruptionType::InvalidRefFormat, Some("HEAD"), _) => {
                RecoveryAction::new(issue, StrategyKind::SafeRepair, "Point HEAD back at its last checked-out branch")
                    .operation(RecoveryOperation::RepairHead)
                    .risk(DataLossRisk::Minimal)
                    .success_probability(80)
                    .minutes(1)
            }
            (CorruptionType::InvalidRefFormat, _, Some(path)) => RecoveryAction::new(
                issue,
                StrategyKind::SafeRepair,
                format!("Delete malformed reference file {}", path.display()),
            )
            .operation(RecoveryOperation::RemoveFile { path: path.clone() })
            .risk(DataLossRisk::Moderate)
            .success_probability(90)
            .minutes(1)
            .needs_backup(),
            _ => manual_action(
                issue,
                StrategyKind::ManualIntervention,
                DataLossRisk::Moderate,
                "Inspect .git/refs and .git/packed-refs by hand; recreate damaged refs with `git update-ref`",
            ),
        };
        Ok(vec![action])
    }
}
