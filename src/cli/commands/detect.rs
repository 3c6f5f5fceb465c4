use anyhow::Result;
use std::path::PathBuf;

use super::{open_coordinator, severity_icon, Command};
use crate::config::RescueConfig;
use crate::detection::DetectionResult;

pub struct DetectCommand {
    pub repo: PathBuf,
    pub config: RescueConfig,
    pub json: bool,
    pub quick: bool,
}

impl Command for DetectCommand {
    async fn execute(&self) -> Result<()> {
        let coordinator = open_coordinator(&self.repo, &self.config)?;

        if self.quick {
            let check = coordinator.quick_corruption_check().await;
            if self.json {
                println!("{}", serde_json::to_string_pretty(&check)?);
                return Ok(());
            }
            if check.can_continue {
                println!("✅ Quick check passed (integrity score {})", check.integrity_score);
            } else {
                println!("🛑 Quick check failed (integrity score {})", check.integrity_score);
                for issue in &check.blocking_issues {
                    println!("   {} {}: {}", severity_icon(issue.severity), issue.issue_type, issue.description);
                }
                println!();
                println!("💡 Run 'git-rescue detect' for a full scan");
            }
            return Ok(());
        }

        if self.json {
            let result = coordinator.detect_corruption().await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            println!("🔍 Scanning {} ...", self.repo.display());
            print_detection(&coordinator.detect_corruption().await);
        }
        Ok(())
    }
}

pub fn print_detection(result: &DetectionResult) {
    println!();
    if !result.is_corrupted {
        println!("✅ No corruption detected (integrity score {})", result.integrity_score);
        println!("   ⏱️  Checked in {} ms", result.check_duration_ms);
        return;
    }

    println!(
        "⚠️  {} issue(s) found, integrity score {}/100",
        result.issues.len(),
        result.integrity_score
    );
    println!("────────────────────────────────────");
    for issue in &result.issues {
        println!("{} [{}] {}", severity_icon(issue.severity), issue.severity, issue.issue_type);
        println!("   {}", issue.description);
        for file in &issue.affected_files {
            println!("   📄 {}", file.display());
        }
        for action in &issue.recommended_actions {
            println!("   👉 {action}");
        }
        if issue.potential_data_loss {
            println!("   ⚠️  Potential data loss");
        }
    }
    println!();
    println!("   ⏱️  Checked in {} ms", result.check_duration_ms);
    println!("💡 Run 'git-rescue plan' to see how these would be repaired");
}
