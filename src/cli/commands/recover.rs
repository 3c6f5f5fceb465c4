use anyhow::Result;
use std::path::PathBuf;

use super::detect::print_detection;
use super::plan::{print_plan, recovery_options};
use super::{confirm, open_coordinator, Command};
use crate::config::RescueConfig;
use crate::recovery::{MaxDataLoss, ProgressCallback, RecoveryProgress, RecoveryResult};

pub struct RecoverCommand {
    pub repo: PathBuf,
    pub config: RescueConfig,
    pub yes: bool,
    pub aggressive: bool,
    pub no_backup: bool,
    pub max_data_loss: Option<MaxDataLoss>,
    pub json: bool,
}

impl Command for RecoverCommand {
    async fn execute(&self) -> Result<()> {
        let coordinator = open_coordinator(&self.repo, &self.config)?;
        let options = recovery_options(&self.config, self.aggressive, self.max_data_loss, self.no_backup);

        let detection = coordinator.detect_corruption().await;
        if !detection.is_corrupted {
            if self.json {
                println!("{}", serde_json::to_string_pretty(&detection)?);
            } else {
                print_detection(&detection);
            }
            return Ok(());
        }

        let plan = coordinator.create_recovery_plan(&detection, &options);
        if !self.json {
            print_detection(&detection);
            print_plan(&plan);
            println!();
        }

        if !options.max_data_loss.permits(plan.data_loss_risk) {
            println!(
                "🛑 The plan risks {} data loss, above the tolerated level; rerun with --max-data-loss to accept it",
                plan.data_loss_risk
            );
            return Ok(());
        }

        let needs_prompt = plan.requires_confirmation && !plan.can_auto_execute;
        if needs_prompt && !self.yes && !confirm("🔧 Execute this recovery plan?")? {
            println!("❌ Recovery cancelled");
            return Ok(());
        }

        let json = self.json;
        let progress = move |step: RecoveryProgress| {
            if !json {
                println!("   [{}/{}] {}", step.completed, step.total, step.label);
            }
        };
        let callback: ProgressCallback<'_> = &progress;
        let result = coordinator
            .execute_recovery_plan(&plan, &options, Some(callback))
            .await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            print_result(&result);
        }
        Ok(())
    }
}

fn print_result(result: &RecoveryResult) {
    println!();
    for message in &result.user_messages {
        println!("   {message}");
    }
    println!();
    if result.success {
        println!("✅ Recovery succeeded in {} ms", result.recovery_time_ms);
    } else {
        println!("⚠️  Recovery incomplete after {} ms", result.recovery_time_ms);
    }
    println!(
        "   🩹 Resolved: {}   🔍 Remaining: {}",
        result.resolved_issues.len(),
        result.remaining_issues.len()
    );
    if result.data_loss {
        println!("   ⚠️  Some uncommitted or unreachable data may have been discarded");
    }
    if let Some(backup) = &result.backup_created {
        println!("   💾 Backup: {backup}");
    }
    if !result.next_steps.is_empty() {
        println!();
        println!("👉 Next steps:");
        for step in &result.next_steps {
            println!("   • {step}");
        }
    }
}
