use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use super::detector::{CheckContext, DetectionError};
use super::types::{CorruptionIssue, CorruptionType, Severity};

static OBJECT_ID_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9a-f]{40}$").expect("valid regex"));

/// Loose ref file whose contents are neither an object id nor a symbolic ref.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRef {
    pub name: String,
    pub path: PathBuf,
}

pub async fn check(ctx: &CheckContext) -> Result<Vec<CorruptionIssue>, DetectionError> {
    let root = ctx.root.clone();
    let git_dir = ctx.git_dir.clone();
    let (malformed, library_findings) = tokio::task::spawn_blocking(move || {
        let malformed = scan_loose_refs(&git_dir);
        let findings = inspect_with_library(&root, !malformed.is_empty());
        (malformed, findings)
    })
    .await?;

    let mut issues: Vec<CorruptionIssue> = malformed
        .into_iter()
        .map(|found| {
            let advice = if found.name == "HEAD" {
                "Point HEAD at an existing branch with `ref: refs/heads/<branch>`"
            } else {
                "Remove the malformed reference file"
            };
            CorruptionIssue::new(
                CorruptionType::InvalidRefFormat,
                Severity::Medium,
                format!("Reference {} has malformed contents", found.name),
            )
            .with_file(ctx.relative(&found.path))
            .with_target(found.name)
            .auto_recoverable()
            .recommend(advice)
        })
        .collect();
    issues.extend(library_findings);
    Ok(issues)
}

/// Walk `HEAD` and `refs/` checking the raw contents of every loose ref.
pub fn scan_loose_refs(git_dir: &Path) -> Vec<MalformedRef> {
    let mut found = Vec::new();
    let head = git_dir.join("HEAD");
    if head.is_file() && !is_well_formed(&head) {
        found.push(MalformedRef {
            name: "HEAD".to_string(),
            path: head,
        });
    }

    let mut pending = vec![git_dir.join("refs")];
    while let Some(dir) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
                continue;
            }
            if path.extension().is_some_and(|ext| ext == "lock") {
                continue;
            }
            if !is_well_formed(&path) {
                let name = path
                    .strip_prefix(git_dir)
                    .map(|rel| rel.to_string_lossy().replace('\\', "/"))
                    .unwrap_or_else(|_| path.to_string_lossy().to_string());
                found.push(MalformedRef { name, path });
            }
        }
    }
    found.sort_by(|a, b| a.name.cmp(&b.name));
    found
}

fn is_well_formed(path: &Path) -> bool {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let contents = contents.trim();
            contents.starts_with("ref: ") || OBJECT_ID_LINE.is_match(contents)
        }
        Err(_) => false,
    }
}

/// Enumerate references through libgit2 and report targets missing from the
/// object database. Enumeration failures become a single corrupt-ref issue
/// unless malformed loose refs already account for them.
fn inspect_with_library(root: &Path, malformed_seen: bool) -> Vec<CorruptionIssue> {
    let corrupt = |detail: String| {
        CorruptionIssue::new(
            CorruptionType::CorruptRef,
            Severity::High,
            format!("References cannot be enumerated: {detail}"),
        )
        .with_data_loss()
        .recommend("Inspect .git/refs and .git/packed-refs by hand")
    };

    let repo = match git2::Repository::open(root) {
        Ok(repo) => repo,
        Err(e) if malformed_seen => {
            tracing::debug!(error = %e, "Repository open failed alongside malformed refs");
            return Vec::new();
        }
        Err(e) => return vec![corrupt(e.message().to_string())],
    };
    let odb = match repo.odb() {
        Ok(odb) => odb,
        Err(e) => return vec![corrupt(e.message().to_string())],
    };
    let references = match repo.references() {
        Ok(references) => references,
        Err(e) if malformed_seen => {
            tracing::debug!(error = %e, "Reference enumeration failed alongside malformed refs");
            return Vec::new();
        }
        Err(e) => return vec![corrupt(e.message().to_string())],
    };

    let mut issues = Vec::new();
    let mut enumeration_errors = Vec::new();
    for reference in references {
        let reference = match reference {
            Ok(reference) => reference,
            Err(e) => {
                enumeration_errors.push(e.message().to_string());
                continue;
            }
        };
        let Some(oid) = reference.target() else {
            continue;
        };
        if odb.exists(oid) {
            continue;
        }
        let name = String::from_utf8_lossy(reference.name_bytes()).to_string();
        issues.push(
            CorruptionIssue::new(
                CorruptionType::DanglingRef,
                Severity::Medium,
                format!("Reference {name} points at missing object {oid}"),
            )
            .with_target(name)
            .auto_recoverable()
            .recommend("Delete the dangling reference")
            .recommend("Fetch from a remote if the commit should exist"),
        );
    }

    if !enumeration_errors.is_empty() && !malformed_seen {
        issues.push(corrupt(enumeration_errors.join("; ")));
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_flags_malformed_loose_refs() {
        let dir = tempfile::tempdir().unwrap();
        let git_dir = dir.path();
        std::fs::create_dir_all(git_dir.join("refs/heads/feature")).unwrap();
        std::fs::write(git_dir.join("HEAD"), "ref: refs/heads/main\n").unwrap();
        std::fs::write(
            git_dir.join("refs/heads/main"),
            "0123456789abcdef0123456789abcdef01234567\n",
        )
        .unwrap();
        std::fs::write(git_dir.join("refs/heads/feature/broken"), "not-a-sha\n").unwrap();
        std::fs::write(git_dir.join("refs/heads/main.lock"), "garbage").unwrap();

        let found = scan_loose_refs(git_dir);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "refs/heads/feature/broken");
    }

    #[test]
    fn test_scan_flags_garbled_head() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("refs")).unwrap();
        std::fs::write(dir.path().join("HEAD"), "\u{0}\u{0}garbled").unwrap();

        let found = scan_loose_refs(dir.path());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "HEAD");
    }

    #[test]
    fn test_uppercase_hex_is_not_well_formed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ref");
        std::fs::write(&path, "0123456789ABCDEF0123456789ABCDEF01234567").unwrap();
        assert!(!is_well_formed(&path));
    }
}
