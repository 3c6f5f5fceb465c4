// Binary-level checks of the command line surface

mod fixtures;

use assert_cmd::Command;
use fixtures::RepositoryFixture;
use predicates::prelude::*;

fn git_rescue() -> Command {
    let mut cmd = Command::cargo_bin("git-rescue").unwrap();
    cmd.env("RUST_LOG", "error");
    cmd
}

#[test]
fn test_no_arguments_shows_getting_started() {
    git_rescue()
        .assert()
        .success()
        .stdout(predicate::str::contains("git-rescue detect"));
}

#[test]
fn test_explain_recognizes_stale_lock() {
    git_rescue()
        .args([
            "explain",
            "fatal: Unable to create '/work/repo/.git/index.lock': File exists.",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stale lock file"));
}

#[test]
fn test_explain_json_names_the_pattern() {
    git_rescue()
        .args(["explain", "--json", "error: you have not concluded your merge (MERGE_HEAD exists)."])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"pattern\": \"merge\""));
}

#[test]
fn test_detect_json_on_healthy_repository() {
    let fixture = RepositoryFixture::with_commit();

    git_rescue()
        .arg("--repo")
        .arg(fixture.path())
        .args(["detect", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"is_corrupted\": false"));
}

#[test]
fn test_backup_list_starts_empty() {
    let fixture = RepositoryFixture::with_commit();

    git_rescue()
        .arg("--repo")
        .arg(fixture.path())
        .args(["backup", "list", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

#[test]
fn test_unknown_data_loss_level_is_rejected() {
    git_rescue()
        .args(["plan", "--max-data-loss", "everything"])
        .assert()
        .failure();
}
