use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::sync::LazyLock;

use crate::detection::{CorruptionType, Severity};
use crate::recovery::DataLossRisk;

/// Human-readable remediation for one class of failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecoveryInstruction {
    pub title: &'static str,
    pub symptom: &'static str,
    pub likely_cause: &'static str,
    pub immediate_actions: &'static [&'static str],
    pub recovery_steps: &'static [&'static str],
    pub prevention_tips: &'static [&'static str],
    pub severity: Severity,
    pub auto_recoverable: bool,
    pub data_loss_risk: DataLossRisk,
}

pub struct ErrorPattern {
    pub name: &'static str,
    pub regex: Regex,
    pub corruption_type: Option<CorruptionType>,
    pub instruction: RecoveryInstruction,
}

fn pattern(
    name: &'static str,
    expression: &str,
    corruption_type: Option<CorruptionType>,
    instruction: RecoveryInstruction,
) -> ErrorPattern {
    ErrorPattern {
        name,
        regex: RegexBuilder::new(expression)
            .case_insensitive(true)
            .build()
            .expect("valid regex"),
        corruption_type,
        instruction,
    }
}

/// Ordered table; the first matching pattern wins.
pub static PATTERNS: LazyLock<Vec<ErrorPattern>> = LazyLock::new(|| {
    vec![
        pattern(
            "index",
            r"index file (is )?(corrupt|smaller than expected|open failed)|bad index file|unable to read index|index uses \S+ extension|bad signature 0x",
            Some(CorruptionType::CorruptIndex),
            RecoveryInstruction {
                title: "Corrupted index",
                symptom: "Git cannot read the staging area (.git/index)",
                likely_cause: "An interrupted write, a crash during `git add`, or a disk error",
                immediate_actions: &[
                    "Stop running git commands that write to the index",
                    "Copy .git/index somewhere safe",
                ],
                recovery_steps: &[
                    "Move the damaged index aside: mv .git/index .git/index.corrupt",
                    "Rebuild it from HEAD: git reset --mixed HEAD",
                    "Re-stage your changes with git add",
                ],
                prevention_tips: &[
                    "Avoid killing git processes mid-operation",
                    "Keep repositories off unreliable network filesystems",
                ],
                severity: Severity::High,
                auto_recoverable: true,
                data_loss_risk: DataLossRisk::Minimal,
            },
        ),
        pattern(
            "object",
            r"(object|blob|tree|commit) [0-9a-f]{4,40} is corrupt|loose object \S+ .*is corrupt|missing (blob|tree|commit|object)|unable to read [0-9a-f]{40}|bad object|invalid object|object file \S+ is empty|inflate: data stream error",
            Some(CorruptionType::CorruptObject),
            RecoveryInstruction {
                title: "Corrupted or missing objects",
                symptom: "Git reports objects that are missing or cannot be decompressed",
                likely_cause: "Disk corruption, an interrupted transfer, or files removed from .git/objects",
                immediate_actions: &[
                    "Do not run `git gc` or `git prune` until the repository is backed up",
                    "Back up the whole repository directory",
                ],
                recovery_steps: &[
                    "Run git fsck --full to list every damaged object",
                    "Fetch missing objects from a remote: git fetch --all",
                    "Restore from a backup if the objects exist nowhere else",
                ],
                prevention_tips: &["Push regularly so objects exist on a remote", "Monitor disk health"],
                severity: Severity::Critical,
                auto_recoverable: false,
                data_loss_risk: DataLossRisk::High,
            },
        ),
        pattern(
            "lock",
            r"\.lock'?: file exists|unable to create '?\S+\.lock|another git process seems to be running|lock file \S+ exists|cannot lock ref",
            Some(CorruptionType::StaleLockFile),
            RecoveryInstruction {
                title: "Stale lock file",
                symptom: "Git refuses to run because a .lock file already exists",
                likely_cause: "A previous git process crashed or was killed before releasing its lock",
                immediate_actions: &["Make sure no other git process is running in this repository"],
                recovery_steps: &[
                    "Remove the lock file named in the error, for example rm .git/index.lock",
                    "Retry the original command",
                ],
                prevention_tips: &["Let git commands finish instead of interrupting them"],
                severity: Severity::Medium,
                auto_recoverable: true,
                data_loss_risk: DataLossRisk::None,
            },
        ),
        pattern(
            "merge",
            r"you have not concluded your merge|merge_head exists|merging is not possible|you have unmerged paths|fix conflicts and then commit",
            Some(CorruptionType::IncompleteMerge),
            RecoveryInstruction {
                title: "Unfinished merge",
                symptom: "A merge is still in progress",
                likely_cause: "Conflicts were never resolved or the merge was interrupted",
                immediate_actions: &["Check git status to see which files conflict"],
                recovery_steps: &[
                    "Resolve conflicts, git add the files, then git commit",
                    "Or abandon the merge: git merge --abort",
                ],
                prevention_tips: &["Finish or abort merges before switching tasks"],
                severity: Severity::Medium,
                auto_recoverable: true,
                data_loss_risk: DataLossRisk::Minimal,
            },
        ),
        pattern(
            "rebase",
            r"rebase-merge|rebase-apply|rebase in progress|already a rebase|interactive rebase already started",
            Some(CorruptionType::IncompleteRebase),
            RecoveryInstruction {
                title: "Unfinished rebase",
                symptom: "A rebase is still in progress",
                likely_cause: "A conflict stopped the rebase or it was interrupted",
                immediate_actions: &["Check git status to see where the rebase stopped"],
                recovery_steps: &[
                    "Resolve conflicts and run git rebase --continue",
                    "Or abandon it: git rebase --abort",
                ],
                prevention_tips: &["Finish or abort rebases before starting other work"],
                severity: Severity::Medium,
                auto_recoverable: true,
                data_loss_risk: DataLossRisk::Minimal,
            },
        ),
        pattern(
            "reference",
            r"bad ref|invalid ref|broken ref|unable to resolve reference|not a valid ref|reference broken|refs/\S+: invalid",
            Some(CorruptionType::CorruptRef),
            RecoveryInstruction {
                title: "Broken reference",
                symptom: "A branch or tag points at nothing, or its file is unreadable",
                likely_cause: "A truncated ref file, a crash during update, or a missing target object",
                immediate_actions: &["Note which ref is named in the error"],
                recovery_steps: &[
                    "Inspect the ref file under .git/refs",
                    "Find the last good value in the reflog: git reflog show <ref>",
                    "Reset it: git update-ref <ref> <commit>, or delete it with git update-ref -d <ref>",
                ],
                prevention_tips: &["Avoid editing files under .git/refs by hand"],
                severity: Severity::High,
                auto_recoverable: false,
                data_loss_risk: DataLossRisk::Moderate,
            },
        ),
        pattern(
            "packfile",
            r"pack(file)? \S+ (is corrupt|does not match|is truncated)|bad pack|\.idx is too small|packfile \S+ cannot be accessed|non-monotonic index|pack-\S+\.pack",
            Some(CorruptionType::CorruptPackfile),
            RecoveryInstruction {
                title: "Damaged packfile",
                symptom: "A packfile or its index fails verification",
                likely_cause: "Disk corruption or an interrupted gc/repack",
                immediate_actions: &["Back up the repository before repacking"],
                recovery_steps: &[
                    "Verify packs: git verify-pack -v .git/objects/pack/*.idx",
                    "Rebuild packs: git repack -a -d",
                    "Fetch anything still missing: git fetch --all",
                ],
                prevention_tips: &["Do not interrupt git gc", "Monitor disk health"],
                severity: Severity::High,
                auto_recoverable: false,
                data_loss_risk: DataLossRisk::Moderate,
            },
        ),
        pattern(
            "permission",
            r"permission denied|operation not permitted|insufficient permission|read-only file system",
            Some(CorruptionType::PermissionDenied),
            RecoveryInstruction {
                title: "Permission problem",
                symptom: "Git cannot read or write files in the repository",
                likely_cause: "Files owned by another user, often after running git with sudo",
                immediate_actions: &["Check ownership: ls -la .git"],
                recovery_steps: &[
                    "Restore ownership: chown -R $(whoami) .git",
                    "Restore write access: chmod -R u+rwX .git",
                ],
                prevention_tips: &["Never run git with sudo inside a user repository"],
                severity: Severity::High,
                auto_recoverable: false,
                data_loss_risk: DataLossRisk::None,
            },
        ),
        pattern(
            "disk",
            r"no space left on device|disk (is )?full|quota exceeded|out of disk space",
            Some(CorruptionType::DiskFull),
            RecoveryInstruction {
                title: "Disk full",
                symptom: "Writes fail because the filesystem has no free space",
                likely_cause: "The disk or quota holding the repository is exhausted",
                immediate_actions: &["Stop running git commands until space is freed"],
                recovery_steps: &[
                    "Free space on the filesystem holding the repository",
                    "Run git fsck to check for writes cut short",
                    "Retry the failed operation",
                ],
                prevention_tips: &["Keep free space monitoring in place", "Prune old backups"],
                severity: Severity::Critical,
                auto_recoverable: false,
                data_loss_risk: DataLossRisk::High,
            },
        ),
        pattern(
            "network",
            r"could not resolve host|connection (timed out|refused|reset)|failed to connect|network is unreachable|unable to access '\S+'|the remote end hung up|early eof",
            None,
            RecoveryInstruction {
                title: "Network failure",
                symptom: "Git cannot reach the remote",
                likely_cause: "Connectivity, DNS, proxy or remote server problems",
                immediate_actions: &["Check connectivity to the remote host"],
                recovery_steps: &["Verify the remote URL with git remote -v", "Retry once the network is reachable"],
                prevention_tips: &["Use a stable connection for large fetches and pushes"],
                severity: Severity::Low,
                auto_recoverable: false,
                data_loss_risk: DataLossRisk::None,
            },
        ),
    ]
});

/// Guidance for text that matches no pattern.
pub const GENERIC_INSTRUCTION: RecoveryInstruction = RecoveryInstruction {
    title: "Unrecognized git error",
    symptom: "Git reported an error that is not a known corruption pattern",
    likely_cause: "Unknown",
    immediate_actions: &["Read the full error message", "Run git status"],
    recovery_steps: &[
        "Run git-rescue detect for a full integrity scan",
        "Create a backup before attempting manual repairs",
    ],
    prevention_tips: &["Keep regular backups and push often"],
    severity: Severity::Low,
    auto_recoverable: false,
    data_loss_risk: DataLossRisk::None,
};

/// Words that suggest corruption even without a known pattern.
pub static CORRUPTION_VOCABULARY: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"\b(corrupt(ed|ion)?|damaged|broken|invalid|malformed)\b|checksum mismatch")
        .case_insensitive(true)
        .build()
        .expect("valid regex")
});
