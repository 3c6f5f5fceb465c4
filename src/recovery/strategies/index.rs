use chrono::Utc;
use std::path::PathBuf;

use crate::detection::{CorruptionIssue, CorruptionType};
use crate::recovery::strategies::RecoveryStrategy;
use crate::recovery::types::{DataLossRisk, RecoveryAction, RecoveryError, RecoveryOperation, RecoveryOptions, StrategyKind};

/// Rebuilds a missing or corrupt index from HEAD.
///
/// `git reset --mixed` never touches the working tree, so only staged state is
/// at stake. With `preserve_uncommitted` the damaged index is moved aside
/// instead of deleted.
pub struct IndexStrategy;

const HANDLED: &[CorruptionType] = &[CorruptionType::CorruptIndex, CorruptionType::InvalidIndex];

impl RecoveryStrategy for IndexStrategy {
    fn name(&self) -> &'static str {
        "index"
    }

    fn handled_types(&self) -> &'static [CorruptionType] {
        HANDLED
    }

    fn generate_actions(
        &self,
        issue: &CorruptionIssue,
        options: &RecoveryOptions,
    ) -> Result<Vec<RecoveryAction>, RecoveryError> {
        let index = issue
            .affected_files
            .first()
            .cloned()
            .unwrap_or_else(|| PathBuf::from(".git/index"));

        let action = match issue.issue_type {
            CorruptionType::InvalidIndex => {
                RecoveryAction::new(issue, StrategyKind::SafeRepair, "Rebuild the missing index from HEAD")
                    .operation(RecoveryOperation::ResetIndex)
                    .risk(DataLossRisk::None)
                    .success_probability(90)
                    .minutes(1)
            }
            _ if options.preserve_uncommitted => {
                let quarantine = quarantine_path(&index);
                RecoveryAction::new(
                    issue,
                    StrategyKind::SafeRepair,
                    format!("Move the corrupt index to {} and rebuild it from HEAD", quarantine.display()),
                )
                .operation(RecoveryOperation::MoveFile {
                    from: index,
                    to: quarantine,
                })
                .operation(RecoveryOperation::ResetIndex)
                .risk(DataLossRisk::Minimal)
                .success_probability(85)
                .minutes(2)
                .needs_backup()
            }
            _ => RecoveryAction::new(issue, StrategyKind::AutoRepair, "Delete the corrupt index and rebuild it from HEAD")
                .operation(RecoveryOperation::RemoveFile { path: index })
                .operation(RecoveryOperation::ResetIndex)
                .risk(DataLossRisk::Moderate)
                .success_probability(80)
                .minutes(1)
                .needs_backup(),
        };
        Ok(vec![action])
    }
}

fn quarantine_path(index: &std::path::Path) -> PathBuf {
    let name = format!(
        "{}.corrupt-{}",
        index.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
        Utc::now().format("%Y%m%d%H%M%S")
    );
    index.with_file_name(name)
}
