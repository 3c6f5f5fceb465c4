use async_trait::async_trait;
use std::path::PathBuf;
use tracing::warn;

use crate::detection::operations::operation_for;
use crate::detection::{CorruptionIssue, CorruptionType};
use crate::recovery::operations::OperationOutcome;
use crate::recovery::strategies::{run_actions, RecoveryStrategy, StrategyContext, StrategyOutcome};
use crate::recovery::types::{DataLossRisk, RecoveryAction, RecoveryError, RecoveryOperation, RecoveryOptions, StrategyKind};

/// Aborts half-finished merges, rebases, cherry-picks and patch applications.
///
/// When git refuses to abort, the operation's marker files are removed so the
/// repository is no longer considered mid-operation.
pub struct IncompleteOperationStrategy;

const HANDLED: &[CorruptionType] = &[
    CorruptionType::IncompleteMerge,
    CorruptionType::IncompleteRebase,
    CorruptionType::IncompleteCherryPick,
    CorruptionType::IncompleteApply,
];

#[async_trait]
impl RecoveryStrategy for IncompleteOperationStrategy {
    fn name(&self) -> &'static str {
        "incomplete_operation"
    }

    fn handled_types(&self) -> &'static [CorruptionType] {
        HANDLED
    }

    fn generate_actions(
        &self,
        issue: &CorruptionIssue,
        _options: &RecoveryOptions,
    ) -> Result<Vec<RecoveryAction>, RecoveryError> {
        let operation = operation_for(issue.issue_type).ok_or(RecoveryError::NoStrategy {
            issue_type: issue.issue_type,
        })?;

        Ok(vec![RecoveryAction::new(
            issue,
            StrategyKind::SafeRepair,
            format!("Abort the in-progress {}", operation.label()),
        )
        .operation(RecoveryOperation::AbortOperation { operation })
        .risk(DataLossRisk::Minimal)
        .success_probability(90)
        .minutes(1)])
    }

    async fn execute_actions(&self, actions: &[RecoveryAction], ctx: &StrategyContext<'_>) -> StrategyOutcome {
        let mut outcome = run_actions(actions, ctx).await;
        if outcome.success {
            return outcome;
        }

        for action in actions {
            if outcome.resolved.contains(&action.issue_type) {
                continue;
            }
            let Some(operation) = operation_for(action.issue_type) else {
                continue;
            };
            warn!(operation = operation.label(), "Abort failed; removing operation state files");

            let git_dir = ctx.runner.git().git_dir();
            let git_dir = git_dir.strip_prefix(ctx.runner.git().root()).map(PathBuf::from).unwrap_or(git_dir);
            let mut cleared = true;
            for marker in operation.marker_paths() {
                let removal = RecoveryOperation::RemoveFile {
                    path: git_dir.join(marker),
                };
                match ctx.runner.run(&removal).await {
                    Ok(OperationOutcome::Applied) => outcome.messages.push(format!("✅ {removal}")),
                    Ok(OperationOutcome::AlreadyClean) => {}
                    Err(e) => {
                        outcome.messages.push(format!("❌ {removal}: {e}"));
                        cleared = false;
                    }
                }
            }
            if cleared {
                outcome.resolved.push(action.issue_type);
                outcome
                    .next_steps
                    .push(format!("Review the working tree: the {} left changes behind", operation.label()));
            }
        }

        outcome.success = actions.iter().all(|action| outcome.resolved.contains(&action.issue_type));
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Severity;
    use crate::external::scripted::ScriptedExecutor;
    use crate::external::{GitClient, InProgressOperation};
    use crate::fs::StandardFileSystem;
    use crate::recovery::operations::OperationRunner;
    use std::sync::Arc;

    #[test]
    fn test_merge_abort_action() {
        let issue = CorruptionIssue::new(CorruptionType::IncompleteMerge, Severity::Medium, "merge");
        let actions = IncompleteOperationStrategy
            .generate_actions(&issue, &RecoveryOptions::default())
            .unwrap();

        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].data_loss_risk, DataLossRisk::Minimal);
        assert_eq!(
            actions[0].operations,
            vec![RecoveryOperation::AbortOperation {
                operation: InProgressOperation::Merge
            }]
        );
    }

    #[tokio::test]
    async fn test_failed_abort_falls_back_to_marker_removal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git/MERGE_HEAD"), "0123456789abcdef0123456789abcdef01234567\n").unwrap();
        std::fs::write(dir.path().join(".git/MERGE_MSG"), "Merge branch 'x'\n").unwrap();

        let executor = ScriptedExecutor::new().fail("git", &["merge", "--abort"], "fatal: There is no merge to abort");
        let runner = OperationRunner::new(
            Arc::new(GitClient::new(Arc::new(executor), dir.path())),
            Arc::new(StandardFileSystem),
        );
        let options = RecoveryOptions::default();
        let ctx = StrategyContext {
            runner: &runner,
            options: &options,
        };
        let issue = CorruptionIssue::new(CorruptionType::IncompleteMerge, Severity::Medium, "merge");
        let actions = IncompleteOperationStrategy.generate_actions(&issue, &options).unwrap();

        let outcome = IncompleteOperationStrategy.execute_actions(&actions, &ctx).await;
        assert!(outcome.success);
        assert_eq!(outcome.resolved, vec![CorruptionType::IncompleteMerge]);
        assert!(!dir.path().join(".git/MERGE_HEAD").exists());
        assert!(!dir.path().join(".git/MERGE_MSG").exists());
    }
}
