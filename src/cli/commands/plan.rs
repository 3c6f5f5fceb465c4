use anyhow::Result;
use std::path::PathBuf;

use super::detect::print_detection;
use super::{open_coordinator, Command};
use crate::config::RescueConfig;
use crate::recovery::{MaxDataLoss, RecoveryOptions, RecoveryPlan};

pub struct PlanCommand {
    pub repo: PathBuf,
    pub config: RescueConfig,
    pub json: bool,
    pub aggressive: bool,
    pub max_data_loss: Option<MaxDataLoss>,
}

impl Command for PlanCommand {
    async fn execute(&self) -> Result<()> {
        let coordinator = open_coordinator(&self.repo, &self.config)?;
        let options = recovery_options(&self.config, self.aggressive, self.max_data_loss, false);

        let detection = coordinator.detect_corruption().await;
        let plan = coordinator.create_recovery_plan(&detection, &options);
        if self.json {
            println!("{}", serde_json::to_string_pretty(&plan)?);
            return Ok(());
        }

        print_detection(&detection);
        if plan.is_empty() {
            return Ok(());
        }
        print_plan(&plan);

        let recommendation = coordinator.get_recovery_recommendations(&detection);
        println!();
        println!("🧭 Recommendation ({} priority): {}", recommendation.priority, recommendation.summary);
        if recommendation.can_proceed {
            println!("💡 Run 'git-rescue recover' to execute this plan");
        } else {
            println!("🛑 Resolve critical issues manually before running automated recovery");
        }
        Ok(())
    }
}

/// Configured defaults with command-line overrides applied.
pub fn recovery_options(
    config: &RescueConfig,
    aggressive: bool,
    max_data_loss: Option<MaxDataLoss>,
    no_backup: bool,
) -> RecoveryOptions {
    let mut options = config.recovery.defaults.clone();
    options.aggressive |= aggressive;
    if let Some(max_data_loss) = max_data_loss {
        options.max_data_loss = max_data_loss;
    }
    if no_backup {
        options.create_backup = false;
    }
    options
}

pub fn print_plan(plan: &RecoveryPlan) {
    println!();
    println!("📋 RECOVERY PLAN");
    println!("────────────────");
    for (number, action) in plan.actions.iter().enumerate() {
        println!(
            "{}. {} ({} risk, {}% success, ~{} min)",
            number + 1,
            action.description,
            action.data_loss_risk,
            action.success_probability,
            action.estimated_time_minutes
        );
        for operation in &action.operations {
            println!("     ▸ {operation}");
        }
        if action.requires_user_confirmation {
            println!("     ⚠️  Requires confirmation");
        }
    }
    println!();
    println!("   ⏱️  Estimated time: {} min", plan.estimated_time_minutes);
    println!("   📉 Worst data loss risk: {}", plan.data_loss_risk);
    println!("   💾 Backup: {}", if plan.requires_backup { "yes" } else { "no" });
    println!(
        "   🤖 Auto-executable: {}",
        if plan.can_auto_execute { "yes" } else { "no" }
    );
}
