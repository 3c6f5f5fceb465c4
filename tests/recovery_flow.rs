// End-to-end planning and execution against real repositories

mod fixtures;

use fixtures::RepositoryFixture;
use git_rescue::recovery::{ProgressCallback, RecoveryPriority, RecoveryProgress, SessionPhase};
use git_rescue::{
    CorruptionIssue, CorruptionType, DataLossRisk, DetectionResult, MaxDataLoss, RecoveryCoordinator, RecoveryOptions,
    RecoveryPlan, RescueConfig, Severity,
};
use std::sync::Mutex;
use std::time::Duration;

fn coordinator(fixture: &RepositoryFixture) -> RecoveryCoordinator {
    RecoveryCoordinator::open(fixture.path(), &RescueConfig::default())
}

fn unattended() -> RecoveryOptions {
    RecoveryOptions {
        auto_repair: true,
        create_backup: false,
        require_confirmation: false,
        ..RecoveryOptions::default()
    }
}

#[tokio::test]
async fn test_merge_plan_is_a_single_minimal_risk_abort() {
    let fixture = RepositoryFixture::with_commit();
    std::fs::write(fixture.git_dir().join("MERGE_HEAD"), format!("{}\n", fixture.head())).unwrap();
    let coordinator = coordinator(&fixture);

    let detection = coordinator.detect_corruption().await;
    let plan = coordinator.create_recovery_plan(&detection, &RecoveryOptions::default());

    let merge_actions: Vec<_> = plan
        .actions
        .iter()
        .filter(|action| action.issue_type == CorruptionType::IncompleteMerge)
        .collect();
    assert_eq!(merge_actions.len(), 1, "plan: {:?}", plan.actions);
    assert_eq!(merge_actions[0].data_loss_risk, DataLossRisk::Minimal);
}

#[tokio::test]
async fn test_stale_lock_is_removed_unattended() {
    let fixture = RepositoryFixture::with_commit();
    let lock = fixture.aged_git_file("index.lock", Duration::from_secs(120));
    let coordinator = coordinator(&fixture);

    let detection = coordinator.detect_corruption().await;
    let options = unattended();
    let plan = coordinator.create_recovery_plan(&detection, &options);
    assert!(plan.can_auto_execute);
    assert!(!plan.requires_backup);

    let steps = Mutex::new(Vec::new());
    let record = |progress: RecoveryProgress| {
        steps.lock().unwrap().push((progress.completed, progress.total));
    };
    let callback: ProgressCallback<'_> = &record;
    let result = coordinator
        .execute_recovery_plan(&plan, &options, Some(callback))
        .await
        .unwrap();

    assert!(result.success, "messages: {:?}", result.user_messages);
    assert!(!lock.exists());
    assert_eq!(result.resolved_issues.len(), 1);
    assert!(result.remaining_issues.is_empty());
    assert!(!result.data_loss);
    assert_eq!(*steps.lock().unwrap(), vec![(1, 2), (2, 2)]);

    let sessions = coordinator.sessions().await;
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].phase, SessionPhase::Success);
    assert_eq!(sessions[0].executed_actions.len(), 1);
}

#[tokio::test]
async fn test_recovery_with_backup_records_backup_id() {
    let fixture = RepositoryFixture::with_commit();
    std::fs::write(fixture.git_dir().join("MERGE_HEAD"), format!("{}\n", fixture.head())).unwrap();
    let coordinator = coordinator(&fixture);
    let options = RecoveryOptions {
        create_backup: true,
        ..unattended()
    };

    let result = coordinator.recover(&options, None).await.unwrap();

    assert!(result.success, "messages: {:?}", result.user_messages);
    assert!(!fixture.git_dir().join("MERGE_HEAD").exists());
    let backup_id = result.backup_created.expect("backup id");
    assert!(coordinator.backups().get_backup_info(&backup_id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_clean_repository_recommendations() {
    let fixture = RepositoryFixture::with_commit();
    let coordinator = coordinator(&fixture);

    let detection = coordinator.detect_corruption().await;
    let recommendation = coordinator.get_recovery_recommendations(&detection);

    assert_eq!(recommendation.priority, RecoveryPriority::Low);
    assert!(recommendation.can_proceed);
    assert!(recommendation.options.auto_repair);
    assert!(!recommendation.options.create_backup);
}

#[tokio::test]
async fn test_confirmation_blocks_auto_execution() {
    let fixture = RepositoryFixture::with_commit();
    let coordinator = coordinator(&fixture);
    let options = RecoveryOptions {
        max_data_loss: MaxDataLoss::Acceptable,
        ..unattended()
    };
    let issue = CorruptionIssue::new(CorruptionType::IndexLock, Severity::Medium, "stale lock")
        .with_file(".git/index.lock")
        .auto_recoverable();
    let detection = DetectionResult::from_issues(vec![issue], 1);

    let mut plan = coordinator.create_recovery_plan(&detection, &options);
    assert!(plan.can_auto_execute);

    plan.actions[0].requires_user_confirmation = true;
    let replanned = RecoveryPlan::assemble(plan.issues.clone(), plan.actions.clone(), &options);
    assert!(!replanned.can_auto_execute);
    assert!(replanned.requires_confirmation);
}

#[tokio::test]
async fn test_quick_check_gates_on_severity() {
    let fixture = RepositoryFixture::with_commit();
    fixture.aged_git_file("index.lock", Duration::from_secs(120));
    let coordinator = coordinator(&fixture);

    let check = coordinator.quick_corruption_check().await;

    assert!(check.can_continue, "medium issues must not block");
    assert_eq!(check.integrity_score, 85);
}

#[tokio::test]
async fn test_malformed_head_is_repaired_in_place() {
    let fixture = RepositoryFixture::with_commit();
    let head = fixture.head();
    std::fs::write(fixture.git_dir().join("HEAD"), "garbage").unwrap();
    let coordinator = coordinator(&fixture);

    let detection = coordinator.detect_corruption().await;
    let malformed: Vec<_> = detection.issues_of(CorruptionType::InvalidRefFormat).collect();
    assert_eq!(malformed.len(), 1, "issues: {:?}", detection.issues);
    assert_eq!(malformed[0].target.as_deref(), Some("HEAD"));

    let options = unattended();
    let plan = coordinator.create_recovery_plan(&detection, &options);
    coordinator.execute_recovery_plan(&plan, &options, None).await.unwrap();

    assert_eq!(
        std::fs::read_to_string(fixture.git_dir().join("HEAD")).unwrap(),
        "ref: refs/heads/main\n"
    );
    assert_eq!(fixture.branch(), "main");
    assert_eq!(fixture.head(), head);
}
