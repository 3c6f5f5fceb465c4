use std::path::Path;

use super::detector::{CheckContext, DetectionError};
use super::types::{CorruptionIssue, CorruptionType, Severity};

const REMOTE_SCHEMES: [&str; 6] = ["http", "https", "ssh", "git", "file", "git+ssh"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigFinding {
    Unreadable(String),
    InvalidRemote { remote: String, url: String },
}

pub async fn check(ctx: &CheckContext) -> Result<Vec<CorruptionIssue>, DetectionError> {
    let config_path = ctx.git_dir.join("config");
    let relative = ctx.relative(&config_path);
    let findings = tokio::task::spawn_blocking(move || inspect_config(&config_path)).await?;

    Ok(findings
        .into_iter()
        .map(|finding| match finding {
            ConfigFinding::Unreadable(reason) => CorruptionIssue::new(
                CorruptionType::CorruptConfig,
                Severity::Medium,
                format!("Repository config cannot be parsed: {reason}"),
            )
            .with_file(relative.clone())
            .recommend("Repair .git/config by hand or restore it from a backup"),
            ConfigFinding::InvalidRemote { remote, url } => CorruptionIssue::new(
                CorruptionType::InvalidRemote,
                Severity::Low,
                format!("Remote '{remote}' has an invalid URL: {url:?}"),
            )
            .with_file(relative.clone())
            .with_target(remote.clone())
            .auto_recoverable()
            .recommend(format!("Fix the URL with `git remote set-url {remote} <url>`"))
            .recommend(format!("Or remove the remote with `git remote remove {remote}`")),
        })
        .collect())
}

/// Parse the repository config and validate every `remote.<name>.url`.
pub fn inspect_config(config_path: &Path) -> Vec<ConfigFinding> {
    if !config_path.is_file() {
        return vec![ConfigFinding::Unreadable("config file is missing".to_string())];
    }
    let config = match git2::Config::open(config_path) {
        Ok(config) => config,
        Err(e) => return vec![ConfigFinding::Unreadable(e.message().to_string())],
    };
    let mut entries = match config.entries(Some(r"remote\..*\.url")) {
        Ok(entries) => entries,
        Err(e) => return vec![ConfigFinding::Unreadable(e.message().to_string())],
    };

    let mut findings = Vec::new();
    while let Some(entry) = entries.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => return vec![ConfigFinding::Unreadable(e.message().to_string())],
        };
        let (Some(name), value) = (entry.name(), entry.value()) else {
            continue;
        };
        let Some(remote) = name.strip_prefix("remote.").and_then(|rest| rest.strip_suffix(".url")) else {
            continue;
        };
        let url = value.unwrap_or_default();
        if !is_valid_remote_url(url) {
            findings.push(ConfigFinding::InvalidRemote {
                remote: remote.to_string(),
                url: url.to_string(),
            });
        }
    }
    findings
}

/// Accepts scheme URLs git can talk to, scp-like `user@host:path`, and local paths.
pub fn is_valid_remote_url(url: &str) -> bool {
    let url = url.trim();
    if url.is_empty() || url.chars().any(char::is_whitespace) {
        return false;
    }
    match url.split_once("://") {
        Some((scheme, rest)) => REMOTE_SCHEMES.contains(&scheme.to_ascii_lowercase().as_str()) && !rest.is_empty(),
        None => true,
    }
}
