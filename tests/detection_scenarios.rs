// Detection against real repositories in temporary directories

mod fixtures;

use fixtures::RepositoryFixture;
use git_rescue::config::DetectionConfig;
use git_rescue::{CorruptionDetector, CorruptionType, GitClient, Severity};
use std::sync::Arc;
use std::time::Duration;

fn detector(fixture: &RepositoryFixture) -> CorruptionDetector {
    CorruptionDetector::new(Arc::new(GitClient::open(fixture.path())), DetectionConfig::default())
}

#[tokio::test]
async fn test_healthy_repository_scores_100() {
    let fixture = RepositoryFixture::with_commit();

    let result = detector(&fixture).detect_corruption().await;

    assert!(!result.is_corrupted, "unexpected issues: {:?}", result.issues);
    assert_eq!(result.integrity_score, 100);
}

#[tokio::test]
async fn test_two_minute_old_index_lock_is_the_only_issue() {
    let fixture = RepositoryFixture::with_commit();
    fixture.aged_git_file("index.lock", Duration::from_secs(120));

    let result = detector(&fixture).detect_corruption().await;

    assert!(result.is_corrupted);
    assert_eq!(result.issues.len(), 1, "issues: {:?}", result.issues);
    let issue = &result.issues[0];
    assert!(issue.issue_type.is_lock());
    assert_eq!(issue.issue_type, CorruptionType::IndexLock);
    assert_eq!(issue.severity, Severity::Medium);
    assert!(issue.auto_recoverable);
    assert_eq!(result.integrity_score, 85);
}

#[tokio::test]
async fn test_fresh_lock_is_not_flagged() {
    let fixture = RepositoryFixture::with_commit();
    fixture.aged_git_file("index.lock", Duration::from_secs(1));
    fixture.aged_git_file("refs/heads/main.lock", Duration::from_secs(60));

    let result = detector(&fixture).detect_corruption().await;

    assert!(!result.is_corrupted, "unexpected issues: {:?}", result.issues);
}

#[tokio::test]
async fn test_nested_ref_lock_uses_longer_threshold() {
    let fixture = RepositoryFixture::with_commit();
    fixture.aged_git_file("refs/heads/main.lock", Duration::from_secs(301));

    let result = detector(&fixture).detect_corruption().await;

    let locks: Vec<_> = result.issues_of(CorruptionType::RefLock).collect();
    assert_eq!(locks.len(), 1, "issues: {:?}", result.issues);
}

#[tokio::test]
async fn test_merge_marker_is_an_incomplete_merge() {
    let fixture = RepositoryFixture::with_commit();
    std::fs::write(fixture.git_dir().join("MERGE_HEAD"), format!("{}\n", fixture.head())).unwrap();

    let result = detector(&fixture).detect_corruption().await;

    let merges: Vec<_> = result.issues_of(CorruptionType::IncompleteMerge).collect();
    assert_eq!(merges.len(), 1, "issues: {:?}", result.issues);
    assert!(merges[0].auto_recoverable);
    assert!(!merges[0].potential_data_loss);
}

#[tokio::test]
async fn test_malformed_and_dangling_refs() {
    let fixture = RepositoryFixture::with_commit();
    fixture.write(".git/refs/heads/garbage", "not a hash\n");
    fixture.write(
        ".git/refs/heads/ghost",
        "0123456789abcdef0123456789abcdef01234567\n",
    );

    let result = detector(&fixture).detect_corruption().await;

    assert_eq!(result.issues_of(CorruptionType::InvalidRefFormat).count(), 1, "issues: {:?}", result.issues);
    let dangling: Vec<_> = result.issues_of(CorruptionType::DanglingRef).collect();
    assert_eq!(dangling.len(), 1, "issues: {:?}", result.issues);
    assert_eq!(dangling[0].target.as_deref(), Some("refs/heads/ghost"));
}

#[tokio::test]
async fn test_invalid_remote_url() {
    let fixture = RepositoryFixture::with_commit();
    fixture.git(&["remote", "add", "origin", "https://example.com/repo.git"]);
    fixture.git(&["remote", "add", "broken", "gopher://example.com/repo"]);

    let result = detector(&fixture).detect_corruption().await;

    let remotes: Vec<_> = result.issues_of(CorruptionType::InvalidRemote).collect();
    assert_eq!(remotes.len(), 1, "issues: {:?}", result.issues);
    assert_eq!(remotes[0].target.as_deref(), Some("broken"));
    assert_eq!(remotes[0].severity, Severity::Low);
}

#[tokio::test]
async fn test_deleted_index_is_invalid_index() {
    let fixture = RepositoryFixture::with_commit();
    std::fs::remove_file(fixture.git_dir().join("index")).unwrap();

    let result = detector(&fixture).detect_corruption().await;

    let index: Vec<_> = result.issues_of(CorruptionType::InvalidIndex).collect();
    assert_eq!(index.len(), 1, "issues: {:?}", result.issues);
    assert_eq!(index[0].severity, Severity::Low);
    assert!(index[0].auto_recoverable);
}

#[tokio::test]
async fn test_missing_repository_collapses_to_filesystem_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");

    let detector = CorruptionDetector::new(Arc::new(GitClient::open(&missing)), DetectionConfig::default());
    let result = detector.detect_corruption().await;

    assert!(result.is_corrupted);
    assert_eq!(result.integrity_score, 0);
    assert_eq!(result.issues.len(), 1);
    assert_eq!(result.issues[0].issue_type, CorruptionType::FilesystemError);
    assert_eq!(result.issues[0].severity, Severity::Critical);
}

#[tokio::test]
async fn test_quick_scan_still_sees_locks() {
    let fixture = RepositoryFixture::with_commit();
    fixture.aged_git_file("index.lock", Duration::from_secs(600));

    let result = detector(&fixture).quick_scan().await;

    assert_eq!(result.issues_of(CorruptionType::IndexLock).count(), 1);
}
