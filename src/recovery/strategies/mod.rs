//! Recovery strategies
//!
//! One strategy per issue category. A strategy turns an issue into ordered
//! [`RecoveryAction`]s and later executes those actions through the
//! [`OperationRunner`].

mod configuration;
mod environment;
mod incomplete_operation;
mod index;
mod lock_file;
mod object_database;
mod reference;
mod registry;

pub use configuration::ConfigurationStrategy;
pub use environment::EnvironmentStrategy;
pub use incomplete_operation::IncompleteOperationStrategy;
pub use index::IndexStrategy;
pub use lock_file::LockFileStrategy;
pub use object_database::ObjectDatabaseStrategy;
pub use reference::ReferenceStrategy;
pub use registry::StrategyRegistry;

use async_trait::async_trait;
use tracing::{info, warn};

use super::operations::{OperationOutcome, OperationRunner};
use super::types::{
    DataLossRisk, RecoveryAction, RecoveryError, RecoveryOperation, RecoveryOptions, StrategyKind,
};
use crate::detection::{CorruptionIssue, CorruptionType};

/// What a strategy needs at execution time.
pub struct StrategyContext<'a> {
    pub runner: &'a OperationRunner,
    pub options: &'a RecoveryOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategyOutcome {
    /// True when every operation of every action completed.
    pub success: bool,
    pub resolved: Vec<CorruptionType>,
    pub messages: Vec<String>,
    pub next_steps: Vec<String>,
}

#[async_trait]
pub trait RecoveryStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn handled_types(&self) -> &'static [CorruptionType];

    fn can_handle(&self, issue: &CorruptionIssue) -> bool {
        self.handled_types().contains(&issue.issue_type)
    }

    /// Ordered actions for one issue. Must not touch the repository.
    fn generate_actions(
        &self,
        issue: &CorruptionIssue,
        options: &RecoveryOptions,
    ) -> Result<Vec<RecoveryAction>, RecoveryError>;

    async fn execute_actions(&self, actions: &[RecoveryAction], ctx: &StrategyContext<'_>) -> StrategyOutcome {
        run_actions(actions, ctx).await
    }
}

/// Run each action's operations in order. An action stops at its first
/// failing operation; later actions still run.
pub async fn run_actions(actions: &[RecoveryAction], ctx: &StrategyContext<'_>) -> StrategyOutcome {
    let mut outcome = StrategyOutcome {
        success: true,
        ..StrategyOutcome::default()
    };

    for action in actions {
        let mut action_ok = true;
        for operation in &action.operations {
            match ctx.runner.run(operation).await {
                Ok(OperationOutcome::Applied) => outcome.messages.push(format!("✅ {operation}")),
                Ok(OperationOutcome::AlreadyClean) => {
                    outcome.messages.push(format!("✅ {operation} (nothing to do)"))
                }
                Err(RecoveryError::ManualInterventionRequired { instruction }) => {
                    outcome.messages.push(format!("🔧 Manual step required: {instruction}"));
                    outcome.next_steps.push(instruction);
                    action_ok = false;
                    break;
                }
                Err(e) => {
                    warn!(operation = %operation, error = %e, "Recovery operation failed");
                    outcome.messages.push(format!("❌ {operation}: {e}"));
                    action_ok = false;
                    break;
                }
            }
        }
        if action_ok {
            info!(action = %action.description, "Recovery action completed");
            outcome.resolved.push(action.issue_type);
        } else {
            outcome.success = false;
        }
    }
    outcome
}

/// Prepend a stash of uncommitted work when the caller wants it preserved
/// and some action risks it.
pub fn preserve_uncommitted(
    issue: &CorruptionIssue,
    options: &RecoveryOptions,
    mut actions: Vec<RecoveryAction>,
) -> Vec<RecoveryAction> {
    let destructive = actions
        .iter()
        .any(|action| action.data_loss_risk >= DataLossRisk::Moderate && !action.is_manual());
    if options.preserve_uncommitted && destructive {
        let stash = RecoveryAction::new(issue, StrategyKind::SafeRepair, "Stash uncommitted changes")
            .operation(RecoveryOperation::CreateStash {
                message: format!("git-rescue: before repairing {}", issue.issue_type),
                include_untracked: true,
            })
            .success_probability(95);
        actions.insert(0, stash);
    }
    actions
}

/// A manual-intervention action for situations no automation can fix.
pub fn manual_action(
    issue: &CorruptionIssue,
    kind: StrategyKind,
    risk: DataLossRisk,
    instruction: impl Into<String>,
) -> RecoveryAction {
    let instruction = instruction.into();
    RecoveryAction::new(issue, kind, instruction.clone())
        .operation(RecoveryOperation::Manual { instruction })
        .risk(risk)
        .success_probability(50)
        .minutes(15)
        .needs_backup()
        .needs_confirmation()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Severity;
    use crate::external::scripted::ScriptedExecutor;
    use crate::external::GitClient;
    use crate::fs::StandardFileSystem;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[test]
    fn test_preserve_only_for_destructive_actions() {
        let issue = CorruptionIssue::new(CorruptionType::CorruptPackfile, Severity::High, "pack");
        let options = RecoveryOptions::default();

        let safe = vec![RecoveryAction::new(&issue, StrategyKind::AutoRepair, "safe").risk(DataLossRisk::Minimal)];
        assert_eq!(preserve_uncommitted(&issue, &options, safe).len(), 1);

        let risky = vec![RecoveryAction::new(&issue, StrategyKind::AutoRepair, "risky")
            .operation(RecoveryOperation::Repack { aggressive: false })
            .risk(DataLossRisk::Moderate)];
        let actions = preserve_uncommitted(&issue, &options, risky.clone());
        assert_eq!(actions.len(), 2);
        assert!(actions[0].is_stash());

        let no_preserve = RecoveryOptions {
            preserve_uncommitted: false,
            ..RecoveryOptions::default()
        };
        assert_eq!(preserve_uncommitted(&issue, &no_preserve, risky).len(), 1);
    }

    #[tokio::test]
    async fn test_run_actions_collects_manual_steps() {
        let dir = tempfile::tempdir().unwrap();
        let runner = OperationRunner::new(
            Arc::new(GitClient::new(Arc::new(ScriptedExecutor::new()), dir.path())),
            Arc::new(StandardFileSystem),
        );
        let options = RecoveryOptions::default();
        let ctx = StrategyContext {
            runner: &runner,
            options: &options,
        };
        let lock = CorruptionIssue::new(CorruptionType::IndexLock, Severity::Medium, "lock");
        let object = CorruptionIssue::new(CorruptionType::CorruptObject, Severity::Critical, "object");
        let actions = vec![
            RecoveryAction::new(&lock, StrategyKind::AutoRepair, "remove lock").operation(
                RecoveryOperation::RemoveFile {
                    path: PathBuf::from(".git/index.lock"),
                },
            ),
            manual_action(&object, StrategyKind::BackupRestore, DataLossRisk::High, "restore from backup"),
        ];

        let outcome = run_actions(&actions, &ctx).await;
        assert!(!outcome.success);
        assert_eq!(outcome.resolved, vec![CorruptionType::IndexLock]);
        assert_eq!(outcome.next_steps, vec!["restore from backup".to_string()]);
    }
}
