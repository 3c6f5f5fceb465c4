//! Recovery orchestration
//!
//! detect -> plan -> optional backup -> sequential execution -> re-validation.
//! Callers must guarantee single-writer access to the repository for the
//! duration of a session; nothing here takes a lock of its own.

use serde::{Deserialize, Serialize};
use statig::prelude::*;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use super::operations::OperationRunner;
use super::session::{SessionEvent, SessionLifecycle};
use super::strategies::{StrategyContext, StrategyRegistry};
use super::types::{
    DataLossRisk, RecoveryAction, RecoveryError, RecoveryOperation, RecoveryOptions, RecoveryPlan, RecoveryPriority,
    RecoveryProgress, RecoveryRecommendation, RecoveryResult, RecoverySession, SessionPhase, StrategyKind,
};
use crate::backup::{BackupManager, BackupOptions};
use crate::config::RescueConfig;
use crate::detection::{CorruptionDetector, CorruptionIssue, DetectionResult, Severity};
use crate::external::GitClient;
use crate::fs::{FileSystemOperations, StandardFileSystem};
use crate::observability::{create_session_span, OperationTimer, RecoveryMetrics};
use crate::telemetry::generate_correlation_id;

/// Post-recovery score above which a session counts as successful.
const SUCCESS_SCORE: u8 = 80;

/// Invoked synchronously once per completed step.
pub type ProgressCallback<'a> = &'a (dyn Fn(RecoveryProgress) + Send + Sync);

/// Outcome of the pre-flight gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickCheck {
    /// False when any Critical or High issue is present.
    pub can_continue: bool,
    pub integrity_score: u8,
    pub blocking_issues: Vec<CorruptionIssue>,
}

pub struct RecoveryCoordinator {
    detector: CorruptionDetector,
    registry: StrategyRegistry,
    backups: BackupManager,
    runner: OperationRunner,
    metrics: RecoveryMetrics,
    sessions: Mutex<HashMap<String, RecoverySession>>,
}

impl RecoveryCoordinator {
    pub fn new(git: Arc<GitClient>, fs: Arc<dyn FileSystemOperations>, config: &RescueConfig) -> Self {
        Self {
            detector: CorruptionDetector::new(Arc::clone(&git), config.detection.clone()),
            registry: StrategyRegistry::with_default_strategies(),
            backups: BackupManager::new(Arc::clone(&git), Arc::clone(&fs), config.backup.clone()),
            runner: OperationRunner::new(git, fs),
            metrics: RecoveryMetrics::new(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Coordinator for the repository at `root` using real git and the local filesystem.
    pub fn open(root: impl Into<PathBuf>, config: &RescueConfig) -> Self {
        let git = Arc::new(GitClient::open(root).with_timeout(config.recovery.command_timeout()));
        Self::new(git, Arc::new(StandardFileSystem), config)
    }

    pub fn with_registry(mut self, registry: StrategyRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    pub fn metrics(&self) -> &RecoveryMetrics {
        &self.metrics
    }

    pub async fn detect_corruption(&self) -> DetectionResult {
        let result = self.detector.detect_corruption().await;
        self.metrics.record_detection(result.issues.len());
        result
    }

    /// Every issue yields at least one action: issues no strategy can plan
    /// for get a manual placeholder.
    pub fn create_recovery_plan(&self, detection: &DetectionResult, options: &RecoveryOptions) -> RecoveryPlan {
        let mut actions = Vec::new();
        for issue in &detection.issues {
            let generated = match self.registry.find_strategy(issue) {
                Some(strategy) => match strategy.generate_actions(issue, options) {
                    Ok(generated) if !generated.is_empty() => Some(generated),
                    Ok(_) => {
                        warn!(strategy = strategy.name(), issue.kind = %issue.issue_type, "Strategy produced no actions");
                        None
                    }
                    Err(e) => {
                        warn!(strategy = strategy.name(), issue.kind = %issue.issue_type, error = %e, "Action generation failed");
                        None
                    }
                },
                None => {
                    warn!(issue.kind = %issue.issue_type, "No recovery strategy registered");
                    None
                }
            };
            actions.extend(generated.unwrap_or_else(|| vec![placeholder_action(issue)]));
        }

        RecoveryPlan::assemble(detection.issues.clone(), actions, options)
    }

    pub async fn execute_recovery_plan(
        &self,
        plan: &RecoveryPlan,
        options: &RecoveryOptions,
        on_progress: Option<ProgressCallback<'_>>,
    ) -> Result<RecoveryResult, RecoveryError> {
        options.validate()?;

        let session_id = Uuid::new_v4().to_string();
        let span = create_session_span(&session_id, &generate_correlation_id());
        self.run_session(session_id, plan, options, on_progress)
            .instrument(span)
            .await
    }

    async fn run_session(
        &self,
        session_id: String,
        plan: &RecoveryPlan,
        options: &RecoveryOptions,
        on_progress: Option<ProgressCallback<'_>>,
    ) -> Result<RecoveryResult, RecoveryError> {
        let timer = OperationTimer::new("recovery_session");
        let started = Instant::now();
        let budget = Duration::from_secs(u64::from(options.timeout_minutes) * 60);
        self.metrics.record_session_started();

        let mut session = RecoverySession {
            id: session_id.clone(),
            start_time: chrono::Utc::now(),
            phase: SessionPhase::Created,
            detection_result: None,
            planned_actions: plan.actions.clone(),
            executed_actions: Vec::new(),
            backup_created: None,
            result: None,
            options: options.clone(),
        };
        let mut lifecycle = SessionLifecycle::new(session_id.clone()).state_machine();
        lifecycle.handle(&SessionEvent::Start);
        self.publish(&mut session, &lifecycle).await;
        info!(actions = plan.actions.len(), backup = plan.requires_backup, "Starting recovery session");

        let total = usize::from(plan.requires_backup) + plan.actions.len() + 1;
        let mut completed = 0;
        let mut report = |label: String| {
            completed += 1;
            if let Some(callback) = on_progress {
                callback(RecoveryProgress { label, completed, total });
            }
        };

        let mut user_messages = Vec::new();
        let mut next_steps = Vec::new();

        if plan.requires_backup {
            let backup_options = BackupOptions::with_reason(format!("Before recovery session {session_id}"));
            match self.backups.create_backup(&backup_options).await {
                Ok(info) => {
                    self.metrics.record_backup();
                    user_messages.push(format!("💾 Backup created: {}", info.id));
                    lifecycle.handle(&SessionEvent::BackupSucceeded {
                        backup_id: info.id.clone(),
                    });
                    session.backup_created = Some(info.id);
                    self.publish(&mut session, &lifecycle).await;
                    report("Backup created".to_string());
                }
                Err(e) => {
                    let reason = e.to_string();
                    lifecycle.handle(&SessionEvent::BackupFailed {
                        reason: reason.clone(),
                        abort: options.require_confirmation,
                    });
                    if options.require_confirmation {
                        error!(error = %reason, "Backup failed; aborting recovery");
                        session.phase = lifecycle.inner().phase;
                        self.finish_session(session, false).await;
                        return Err(RecoveryError::BackupFailed(reason));
                    }
                    user_messages.push(format!("⚠️  Backup failed, continuing without one: {reason}"));
                    self.publish(&mut session, &lifecycle).await;
                    report("Backup skipped after failure".to_string());
                }
            }
        } else {
            lifecycle.handle(&SessionEvent::BackupSkipped);
            self.publish(&mut session, &lifecycle).await;
        }

        let ctx = StrategyContext {
            runner: &self.runner,
            options,
        };
        let mut data_loss = false;
        for (position, action) in plan.actions.iter().enumerate() {
            if started.elapsed() > budget {
                warn!(minutes = options.timeout_minutes, "Recovery time budget exhausted");
                user_messages.push(RecoveryError::Timeout {
                    minutes: options.timeout_minutes,
                }
                .to_string());
                lifecycle.handle(&SessionEvent::Halted);
                break;
            }

            let Some(strategy) = self.registry.find_for_type(action.issue_type) else {
                user_messages.push(format!("❌ No strategy can execute: {}", action.description));
                lifecycle.handle(&SessionEvent::ActionFinished { success: false });
                self.metrics.record_action(false);
                self.publish(&mut session, &lifecycle).await;
                report(action.description.clone());
                continue;
            };

            let outcome = strategy
                .execute_actions(std::slice::from_ref(action), &ctx)
                .await;
            user_messages.extend(outcome.messages);
            next_steps.extend(outcome.next_steps);
            self.metrics.record_action(outcome.success);
            lifecycle.handle(&SessionEvent::ActionFinished {
                success: outcome.success,
            });
            if outcome.success {
                session.executed_actions.push(action.clone());
                data_loss |= action.data_loss_risk >= DataLossRisk::Moderate;
            }
            self.publish(&mut session, &lifecycle).await;
            report(action.description.clone());

            // Includes manual steps.
            if !outcome.success && action.data_loss_risk == DataLossRisk::High {
                warn!(action = %action.description, "High-risk action failed; halting recovery");
                user_messages.push(format!(
                    "🛑 Stopped after a failed high-risk step; {} action(s) not attempted",
                    plan.actions.len() - position - 1
                ));
                lifecycle.handle(&SessionEvent::Halted);
                break;
            }
        }
        lifecycle.handle(&SessionEvent::ExecutionFinished);
        self.publish(&mut session, &lifecycle).await;

        let post = self.detect_corruption().await;
        let success = post.integrity_score > SUCCESS_SCORE || post.issues.is_empty();
        lifecycle.handle(&SessionEvent::Validated { success });
        report("Validation".to_string());

        let resolved_issues: Vec<CorruptionIssue> = plan
            .issues
            .iter()
            .filter(|issue| !post.issues.iter().any(|remaining| remaining.same_anomaly(issue)))
            .cloned()
            .collect();
        if !success {
            next_steps.push("Run `git-rescue detect` to review the remaining issues".to_string());
            if let Some(backup_id) = &session.backup_created {
                next_steps.push(format!("Restore the pre-recovery state with `git-rescue backup restore {backup_id}`"));
            }
        }

        let result = RecoveryResult {
            success,
            applied_actions: session.executed_actions.clone(),
            resolved_issues,
            remaining_issues: post.issues.clone(),
            data_loss,
            recovery_time_ms: timer.elapsed().as_millis() as u64,
            user_messages,
            next_steps,
            backup_created: session.backup_created.clone(),
        };

        info!(
            success,
            phase = ?lifecycle.inner().phase,
            resolved = result.resolved_issues.len(),
            remaining = result.remaining_issues.len(),
            score = post.integrity_score,
            "Recovery session finished"
        );
        timer.finish();

        session.phase = lifecycle.inner().phase;
        session.detection_result = Some(post);
        session.result = Some(result.clone());
        self.finish_session(session, success).await;
        Ok(result)
    }

    /// Make the session's current phase visible through `session()`.
    async fn publish(&self, session: &mut RecoverySession, lifecycle: &StateMachine<SessionLifecycle>) {
        session.phase = lifecycle.inner().phase;
        self.sessions.lock().await.insert(session.id.clone(), session.clone());
    }

    async fn finish_session(&self, session: RecoverySession, success: bool) {
        self.metrics.record_session_finished(success);
        self.sessions.lock().await.insert(session.id.clone(), session);
    }

    /// Canned options for the worst severity present.
    pub fn get_recovery_recommendations(&self, detection: &DetectionResult) -> RecoveryRecommendation {
        recommend(detection)
    }

    /// Cheap pre-flight gate: only Critical and High issues block.
    pub async fn quick_corruption_check(&self) -> QuickCheck {
        let result = self.detector.quick_scan().await;
        self.metrics.record_detection(result.issues.len());
        let blocking_issues: Vec<CorruptionIssue> = result
            .issues
            .into_iter()
            .filter(|issue| issue.severity >= Severity::High)
            .collect();
        QuickCheck {
            can_continue: blocking_issues.is_empty(),
            integrity_score: result.integrity_score,
            blocking_issues,
        }
    }

    /// Detect, plan and execute in one call.
    pub async fn recover(
        &self,
        options: &RecoveryOptions,
        on_progress: Option<ProgressCallback<'_>>,
    ) -> Result<RecoveryResult, RecoveryError> {
        options.validate()?;
        let detection = self.detect_corruption().await;
        let plan = self.create_recovery_plan(&detection, options);
        self.execute_recovery_plan(&plan, options, on_progress).await
    }

    pub async fn session(&self, id: &str) -> Option<RecoverySession> {
        self.sessions.lock().await.get(id).cloned()
    }

    pub async fn sessions(&self) -> Vec<RecoverySession> {
        let mut sessions: Vec<RecoverySession> = self.sessions.lock().await.values().cloned().collect();
        sessions.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        sessions
    }
}

fn placeholder_action(issue: &CorruptionIssue) -> RecoveryAction {
    let instruction = format!("Inspect and repair {} manually: {}", issue.issue_type, issue.description);
    RecoveryAction::new(issue, StrategyKind::ManualIntervention, instruction.clone())
        .operation(RecoveryOperation::Manual { instruction })
        .risk(DataLossRisk::Moderate)
        .success_probability(50)
        .minutes(15)
        .needs_backup()
        .needs_confirmation()
}

fn recommend(detection: &DetectionResult) -> RecoveryRecommendation {
    let priority = RecoveryPriority::for_severity(detection.worst_severity());
    let summary = match priority {
        RecoveryPriority::Critical => {
            "Critical corruption detected; resolve it manually before running automated recovery".to_string()
        }
        _ if detection.issues.is_empty() => "No corruption detected".to_string(),
        _ => format!(
            "{} issue(s) found, worst severity {}; integrity score {}",
            detection.issues.len(),
            priority,
            detection.integrity_score
        ),
    };
    RecoveryRecommendation {
        priority,
        options: priority.preset(),
        can_proceed: priority != RecoveryPriority::Critical,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::CorruptionType;
    use crate::external::command::CommandOutput;
    use crate::external::scripted::ScriptedExecutor;

    fn coordinator(root: &std::path::Path) -> RecoveryCoordinator {
        RecoveryCoordinator::new(
            Arc::new(GitClient::new(Arc::new(ScriptedExecutor::new()), root)),
            Arc::new(StandardFileSystem),
            &RescueConfig::default(),
        )
    }

    fn detection(issues: Vec<CorruptionIssue>) -> DetectionResult {
        DetectionResult::from_issues(issues, 1)
    }

    #[test]
    fn test_recommendations_for_clean_repository() {
        let recommendation = recommend(&detection(Vec::new()));
        assert_eq!(recommendation.priority, RecoveryPriority::Low);
        assert!(recommendation.can_proceed);
        assert!(recommendation.options.auto_repair);
        assert!(!recommendation.options.create_backup);
    }

    #[test]
    fn test_critical_issues_block_automation() {
        let recommendation = recommend(&detection(vec![CorruptionIssue::new(
            CorruptionType::CorruptObject,
            Severity::Critical,
            "bad object",
        )]));
        assert_eq!(recommendation.priority, RecoveryPriority::Critical);
        assert!(!recommendation.can_proceed);
    }

    #[test]
    fn test_every_issue_gets_an_action() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = coordinator(dir.path());
        let issues: Vec<CorruptionIssue> = CorruptionType::ALL
            .iter()
            .map(|issue_type| {
                CorruptionIssue::new(*issue_type, Severity::Medium, "issue")
                    .with_file(".git/index.lock")
                    .with_target("origin")
            })
            .collect();

        let plan = coordinator.create_recovery_plan(&detection(issues.clone()), &RecoveryOptions::default());
        for issue in &issues {
            assert!(
                plan.actions.iter().any(|action| action.issue_id == issue.id),
                "no action for {}",
                issue.issue_type
            );
        }
    }

    #[test]
    fn test_unhandled_issue_gets_manual_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = coordinator(dir.path()).with_registry(StrategyRegistry::empty());
        let issue = CorruptionIssue::new(CorruptionType::DanglingRef, Severity::Medium, "dangling");

        let plan = coordinator.create_recovery_plan(&detection(vec![issue]), &RecoveryOptions::default());
        assert_eq!(plan.actions.len(), 1);
        let action = &plan.actions[0];
        assert_eq!(action.strategy_kind, StrategyKind::ManualIntervention);
        assert_eq!(action.data_loss_risk, DataLossRisk::Moderate);
        assert!(action.requires_backup && action.requires_user_confirmation);
        assert!(!plan.can_auto_execute);
    }

    #[test]
    fn test_manual_plans_never_auto_execute() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = coordinator(dir.path());
        let options = RecoveryOptions {
            auto_repair: true,
            require_confirmation: false,
            max_data_loss: crate::recovery::MaxDataLoss::Acceptable,
            ..RecoveryOptions::default()
        };
        let issue = CorruptionIssue::new(CorruptionType::CorruptObject, Severity::Critical, "object");
        let plan = coordinator.create_recovery_plan(&detection(vec![issue]), &options);
        assert!(plan.actions.iter().any(|action| action.requires_user_confirmation));
        assert!(!plan.can_auto_execute);
    }

    /// Repository skeleton driven by a scripted git that fails anything unscripted.
    fn scripted_repository() -> (tempfile::TempDir, Arc<ScriptedExecutor>) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git/stale.lock"), "").unwrap();
        let executor = Arc::new(ScriptedExecutor::new().with_fallback(Ok(CommandOutput {
            status_code: 1,
            stdout: String::new(),
            stderr: "fatal: unscripted".to_string(),
        })));
        (dir, executor)
    }

    fn scripted_coordinator(
        root: &std::path::Path,
        executor: &Arc<ScriptedExecutor>,
        config: &RescueConfig,
    ) -> RecoveryCoordinator {
        RecoveryCoordinator::new(
            Arc::new(GitClient::new(executor.clone(), root)),
            Arc::new(StandardFileSystem),
            config,
        )
    }

    fn lock_removal() -> (CorruptionIssue, RecoveryAction) {
        let issue = CorruptionIssue::new(CorruptionType::StaleLockFile, Severity::Medium, "stale lock")
            .with_file(".git/stale.lock");
        let action = RecoveryAction::new(&issue, StrategyKind::AutoRepair, "Remove stale lock").operation(
            RecoveryOperation::RemoveFile {
                path: PathBuf::from(".git/stale.lock"),
            },
        );
        (issue, action)
    }

    fn unattended(create_backup: bool, require_confirmation: bool) -> RecoveryOptions {
        RecoveryOptions {
            auto_repair: true,
            create_backup,
            require_confirmation,
            ..RecoveryOptions::default()
        }
    }

    #[tokio::test]
    async fn test_session_phase_is_visible_while_running() {
        let (dir, executor) = scripted_repository();
        let coordinator = scripted_coordinator(dir.path(), &executor, &RescueConfig::default());
        let (issue, action) = lock_removal();
        let options = unattended(false, false);
        let plan = RecoveryPlan::assemble(vec![issue], vec![action], &options);

        let seen = std::sync::Mutex::new(Vec::new());
        let record = |progress: RecoveryProgress| {
            let phases: Vec<SessionPhase> = coordinator
                .sessions
                .try_lock()
                .map(|sessions| sessions.values().map(|session| session.phase).collect())
                .unwrap_or_default();
            seen.lock().unwrap().push((progress.completed, progress.total, phases));
        };
        let callback: ProgressCallback<'_> = &record;
        let result = coordinator.execute_recovery_plan(&plan, &options, Some(callback)).await.unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (1, 2, vec![SessionPhase::Executing]),
                (2, 2, vec![SessionPhase::Validating]),
            ]
        );
        assert!(!dir.path().join(".git/stale.lock").exists());
        assert_eq!(result.applied_actions.len(), 1);

        let sessions = coordinator.sessions().await;
        assert_eq!(sessions.len(), 1);
        assert!(sessions[0].phase.is_terminal());
        assert_eq!(sessions[0].executed_actions.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_high_risk_step_halts_remaining_actions() {
        let (dir, executor) = scripted_repository();
        let coordinator = scripted_coordinator(dir.path(), &executor, &RescueConfig::default());
        let corrupt = CorruptionIssue::new(CorruptionType::CorruptObject, Severity::Critical, "corrupt object");
        let missing = CorruptionIssue::new(CorruptionType::MissingObject, Severity::High, "missing object");
        let restore = RecoveryAction::new(&corrupt, StrategyKind::BackupRestore, "Restore from a backup")
            .operation(RecoveryOperation::Manual {
                instruction: "Restore the repository from a backup".to_string(),
            })
            .risk(DataLossRisk::High);
        let fetch = RecoveryAction::new(&missing, StrategyKind::DataReconstruction, "Fetch missing objects")
            .operation(RecoveryOperation::FetchAll)
            .risk(DataLossRisk::High);
        let options = unattended(false, false);
        let plan = RecoveryPlan::assemble(vec![corrupt, missing], vec![restore, fetch], &options);

        let steps = std::sync::Mutex::new(Vec::new());
        let record = |progress: RecoveryProgress| steps.lock().unwrap().push((progress.completed, progress.total));
        let callback: ProgressCallback<'_> = &record;
        let result = coordinator.execute_recovery_plan(&plan, &options, Some(callback)).await.unwrap();

        assert!(!executor.calls().iter().any(|call| call.starts_with("git fetch")));
        assert!(result.applied_actions.is_empty());
        assert!(result.user_messages.iter().any(|message| message.contains("1 action(s) not attempted")));
        assert_eq!(*steps.lock().unwrap(), vec![(1, 3), (2, 3)]);
    }

    fn unwritable_backups(root: &std::path::Path) -> RescueConfig {
        std::fs::write(root.join("blocker"), "not a directory").unwrap();
        let mut config = RescueConfig::default();
        config.backup.directory = PathBuf::from("blocker/backups");
        config
    }

    #[tokio::test]
    async fn test_backup_failure_aborts_when_confirmation_required() {
        let (dir, executor) = scripted_repository();
        let config = unwritable_backups(dir.path());
        let coordinator = scripted_coordinator(dir.path(), &executor, &config);
        let (issue, action) = lock_removal();
        let options = unattended(true, true);
        let plan = RecoveryPlan::assemble(vec![issue], vec![action], &options);
        assert!(plan.requires_backup);

        let result = coordinator.execute_recovery_plan(&plan, &options, None).await;

        assert!(matches!(result, Err(RecoveryError::BackupFailed(_))));
        assert!(dir.path().join(".git/stale.lock").exists());
        let sessions = coordinator.sessions().await;
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].phase, SessionPhase::Failed);
        assert!(sessions[0].executed_actions.is_empty());
    }

    #[tokio::test]
    async fn test_backup_failure_continues_with_warning_otherwise() {
        let (dir, executor) = scripted_repository();
        let config = unwritable_backups(dir.path());
        let coordinator = scripted_coordinator(dir.path(), &executor, &config);
        let (issue, action) = lock_removal();
        let options = unattended(true, false);
        let plan = RecoveryPlan::assemble(vec![issue], vec![action], &options);

        let result = coordinator.execute_recovery_plan(&plan, &options, None).await.unwrap();

        assert!(result.backup_created.is_none());
        assert!(result.user_messages.iter().any(|message| message.contains("Backup failed")));
        assert!(!dir.path().join(".git/stale.lock").exists());
        assert_eq!(result.applied_actions.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_options_are_rejected_before_anything_runs() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = coordinator(dir.path());
        let plan = RecoveryPlan::assemble(Vec::new(), Vec::new(), &RecoveryOptions::default());
        let options = RecoveryOptions {
            timeout_minutes: 0,
            ..RecoveryOptions::default()
        };

        let result = coordinator.execute_recovery_plan(&plan, &options, None).await;
        assert!(matches!(result, Err(RecoveryError::InvalidOptions(_))));
        assert!(coordinator.sessions().await.is_empty());
    }
}
