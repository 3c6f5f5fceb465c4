use std::path::Path;

use super::detector::{CheckContext, DetectionError};
use super::types::{CorruptionIssue, CorruptionType, Severity};
use crate::external::InProgressOperation;

/// Half-finished merges, rebases, cherry-picks and patch applications.
pub async fn check(ctx: &CheckContext) -> Result<Vec<CorruptionIssue>, DetectionError> {
    Ok(find_in_progress(&ctx.git_dir)
        .into_iter()
        .map(|(operation, marker)| {
            let issue_type = issue_type_for(operation);
            CorruptionIssue::new(
                issue_type,
                Severity::Medium,
                format!("A {} was started but never completed", operation.label()),
            )
            .with_file(ctx.relative(&ctx.git_dir.join(marker)))
            .with_target(operation.label())
            .auto_recoverable()
            .recommend(format!("Abort the {} with `git {}`", operation.label(), operation.abort_args().join(" ")))
            .recommend(format!("Or resolve and continue the {} by hand", operation.label()))
        })
        .collect())
}

pub fn issue_type_for(operation: InProgressOperation) -> CorruptionType {
    match operation {
        InProgressOperation::Merge => CorruptionType::IncompleteMerge,
        InProgressOperation::Rebase => CorruptionType::IncompleteRebase,
        InProgressOperation::CherryPick => CorruptionType::IncompleteCherryPick,
        InProgressOperation::Apply => CorruptionType::IncompleteApply,
    }
}

pub fn operation_for(issue_type: CorruptionType) -> Option<InProgressOperation> {
    match issue_type {
        CorruptionType::IncompleteMerge => Some(InProgressOperation::Merge),
        CorruptionType::IncompleteRebase => Some(InProgressOperation::Rebase),
        CorruptionType::IncompleteCherryPick => Some(InProgressOperation::CherryPick),
        CorruptionType::IncompleteApply => Some(InProgressOperation::Apply),
        _ => None,
    }
}

/// In-progress operations with the marker that revealed each one.
/// `rebase-apply` means `git am` when it holds an `applying` file.
pub fn find_in_progress(git_dir: &Path) -> Vec<(InProgressOperation, &'static str)> {
    let mut found = Vec::new();
    if git_dir.join("MERGE_HEAD").is_file() {
        found.push((InProgressOperation::Merge, "MERGE_HEAD"));
    }
    if git_dir.join("rebase-merge").is_dir() {
        found.push((InProgressOperation::Rebase, "rebase-merge"));
    }
    if git_dir.join("rebase-apply").is_dir() {
        if git_dir.join("rebase-apply").join("applying").exists() {
            found.push((InProgressOperation::Apply, "rebase-apply"));
        } else {
            found.push((InProgressOperation::Rebase, "rebase-apply"));
        }
    }
    if git_dir.join("CHERRY_PICK_HEAD").is_file() {
        found.push((InProgressOperation::CherryPick, "CHERRY_PICK_HEAD"));
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_git_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_in_progress(dir.path()).is_empty());
    }

    #[test]
    fn test_merge_head_marks_merge() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("MERGE_HEAD"), "0123456789abcdef0123456789abcdef01234567\n").unwrap();

        assert_eq!(find_in_progress(dir.path()), vec![(InProgressOperation::Merge, "MERGE_HEAD")]);
    }

    #[test]
    fn test_rebase_apply_distinguishes_am() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("rebase-apply")).unwrap();
        assert_eq!(find_in_progress(dir.path())[0].0, InProgressOperation::Rebase);

        std::fs::write(dir.path().join("rebase-apply/applying"), "").unwrap();
        assert_eq!(find_in_progress(dir.path())[0].0, InProgressOperation::Apply);
    }

    #[test]
    fn test_type_mapping_round_trips() {
        for operation in [
            InProgressOperation::Merge,
            InProgressOperation::Rebase,
            InProgressOperation::CherryPick,
            InProgressOperation::Apply,
        ] {
            assert_eq!(operation_for(issue_type_for(operation)), Some(operation));
        }
        assert_eq!(operation_for(CorruptionType::IndexLock), None);
    }
}
