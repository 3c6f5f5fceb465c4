// Backup creation and restoration against real repositories

mod fixtures;

use fixtures::RepositoryFixture;
use git_rescue::config::BackupConfig;
use git_rescue::{BackupError, BackupManager, BackupOptions, GitClient, RestoreOptions, StandardFileSystem};
use std::path::PathBuf;
use std::sync::Arc;

fn manager(fixture: &RepositoryFixture, config: BackupConfig) -> BackupManager {
    BackupManager::new(
        Arc::new(GitClient::open(fixture.path())),
        Arc::new(StandardFileSystem),
        config,
    )
}

#[tokio::test]
async fn test_round_trip_preserves_branch_and_head() {
    let fixture = RepositoryFixture::with_commit();
    fixture.write("notes.txt", "untracked work\n");
    let head = fixture.head();
    let manager = manager(&fixture, BackupConfig::default());

    let info = manager
        .create_backup(&BackupOptions::with_reason("round trip"))
        .await
        .unwrap();

    assert_eq!(info.branch_state.branch.as_deref(), Some("main"));
    assert_eq!(info.branch_state.commit.as_deref(), Some(head.as_str()));
    assert!(info.branch_state.untracked_files.contains(&"notes.txt".to_string()));
    assert!(info.has_bundle);
    assert!(!info.compressed);
    assert!(info.size > 0);
    assert!(info.path.join("repository.bundle").exists());
    assert!(info.path.join("working-tree/src/lib.rs").exists());
    assert!(info.path.join("git-metadata/HEAD").exists());

    let result = manager
        .restore_from_backup(&info.id, &RestoreOptions::default())
        .await
        .unwrap();

    assert!(result.success, "error: {:?}, warnings: {:?}", result.error, result.warnings);
    assert_eq!(fixture.branch(), "main");
    assert_eq!(fixture.head(), head);
    assert_eq!(fixture.read("notes.txt"), "untracked work\n");
}

#[tokio::test]
async fn test_partial_restore_from_working_tree_copy() {
    let fixture = RepositoryFixture::with_commit();
    let manager = manager(&fixture, BackupConfig::default());
    let info = manager.create_backup(&BackupOptions::with_reason("partial")).await.unwrap();

    fixture.write("README.md", "overwritten\n");
    fixture.write("src/lib.rs", "also overwritten\n");

    let options = RestoreOptions {
        stash_current: false,
        partial: Some(vec![PathBuf::from("README.md"), PathBuf::from("nope.txt")]),
        restore_metadata: false,
        ..RestoreOptions::default()
    };
    let result = manager.restore_from_backup(&info.id, &options).await.unwrap();

    assert!(result.success);
    assert_eq!(result.restored_files, vec![PathBuf::from("README.md")]);
    assert_eq!(fixture.read("README.md"), "# Fixture\n");
    assert_eq!(fixture.read("src/lib.rs"), "also overwritten\n");
    assert!(result.warnings.iter().any(|warning| warning.contains("nope.txt")));
}

#[tokio::test]
async fn test_paths_restored_from_bundled_commit() {
    let fixture = RepositoryFixture::with_commit();
    let manager = manager(&fixture, BackupConfig::default());
    let info = manager.create_backup(&BackupOptions::with_reason("bundle paths")).await.unwrap();

    std::fs::remove_file(fixture.path().join("src/lib.rs")).unwrap();
    fixture.commit_all("Remove lib");

    let options = RestoreOptions {
        stash_current: false,
        bundle_paths: Some(vec![PathBuf::from("src/lib.rs")]),
        ..RestoreOptions::default()
    };
    let result = manager.restore_from_backup(&info.id, &options).await.unwrap();

    assert!(result.success, "error: {:?}", result.error);
    assert_eq!(fixture.read("src/lib.rs"), "pub fn answer() -> u32 { 42 }\n");
    let leftover = fixture.git(&["for-each-ref", "refs/git-rescue"]);
    assert!(leftover.is_empty(), "temporary refs left behind: {leftover}");
}

#[tokio::test]
async fn test_bundle_paths_without_commit_fail_loudly() {
    let fixture = RepositoryFixture::new();
    fixture.write("draft.txt", "no commits yet\n");
    let manager = manager(&fixture, BackupConfig::default());
    let info = manager.create_backup(&BackupOptions::with_reason("unborn")).await.unwrap();
    assert!(!info.has_bundle);

    let options = RestoreOptions {
        stash_current: false,
        bundle_paths: Some(vec![PathBuf::from("draft.txt")]),
        ..RestoreOptions::default()
    };
    let result = manager.restore_from_backup(&info.id, &options).await.unwrap();

    assert!(!result.success);
    assert!(result.error.unwrap().contains("no bundled commit"));
}

#[tokio::test]
async fn test_restore_unknown_backup_reports_the_id() {
    let fixture = RepositoryFixture::with_commit();
    let manager = manager(&fixture, BackupConfig::default());

    let result = manager
        .restore_from_backup("backup-does-not-exist", &RestoreOptions::default())
        .await
        .unwrap();

    assert!(!result.success);
    assert!(result.error.unwrap().contains("backup-does-not-exist"));
}

#[tokio::test]
async fn test_compressed_backup_lists_and_restores() {
    let fixture = RepositoryFixture::with_commit();
    let head = fixture.head();
    let config = BackupConfig {
        compress: true,
        ..BackupConfig::default()
    };
    let manager = manager(&fixture, config);

    let info = manager.create_backup(&BackupOptions::with_reason("compressed")).await.unwrap();
    assert!(info.compressed);
    assert!(info.path.to_string_lossy().ends_with(".tar.gz"));
    assert!(!manager.backup_root().join(&info.id).exists());

    let listed = manager.list_backups().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, info.id);

    let verification = manager.verify_backup(&info.id).await.unwrap();
    assert!(verification.valid, "problems: {:?}", verification.problems);

    fixture.write("README.md", "changed\n");
    let result = manager
        .restore_from_backup(&info.id, &RestoreOptions::default())
        .await
        .unwrap();
    assert!(result.success, "error: {:?}", result.error);
    assert_eq!(fixture.head(), head);
    assert_eq!(fixture.read("README.md"), "# Fixture\n");
    assert!(!manager.backup_root().join(format!(".staging-{}", info.id)).exists());
}

#[tokio::test]
async fn test_retention_keeps_configured_maximum() {
    let fixture = RepositoryFixture::with_commit();
    let config = BackupConfig {
        max_backups: 2,
        include_working_tree: false,
        ..BackupConfig::default()
    };
    let manager = manager(&fixture, config);

    let mut ids = Vec::new();
    for n in 0..3 {
        let info = manager
            .create_backup(&BackupOptions::with_reason(format!("backup {n}")))
            .await
            .unwrap();
        ids.push(info.id);
    }

    let listed: Vec<String> = manager.list_backups().await.unwrap().into_iter().map(|b| b.id).collect();
    assert_eq!(listed, vec![ids[2].clone(), ids[1].clone()]);
    assert!(manager.get_backup_info(&ids[0]).await.unwrap().is_none());

    let usage = manager.get_backup_storage_usage().await.unwrap();
    assert_eq!(usage.backup_count, 2);
}

#[tokio::test]
async fn test_path_like_ids_are_rejected() {
    let fixture = RepositoryFixture::with_commit();
    let manager = manager(&fixture, BackupConfig::default());

    assert!(matches!(
        manager.delete_backup("../../etc").await,
        Err(BackupError::InvalidId { .. })
    ));
}
