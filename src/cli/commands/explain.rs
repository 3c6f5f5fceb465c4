use anyhow::Result;

use super::{severity_icon, Command};
use crate::guide::{analyze_error, is_corruption_indicator};

pub struct ExplainCommand {
    pub text: String,
    pub json: bool,
}

impl Command for ExplainCommand {
    async fn execute(&self) -> Result<()> {
        let analysis = analyze_error(&self.text);
        if self.json {
            println!("{}", serde_json::to_string_pretty(&analysis)?);
            return Ok(());
        }

        let instruction = &analysis.instruction;
        println!("{} {}", severity_icon(instruction.severity), instruction.title);
        println!();
        println!("🩺 Symptom: {}", instruction.symptom);
        println!("🔎 Likely cause: {}", instruction.likely_cause);
        if let Some(corruption_type) = analysis.corruption_type {
            println!("🏷️  Issue type: {corruption_type}");
        }

        println!();
        println!("⚡ Do now:");
        for action in instruction.immediate_actions {
            println!("   • {action}");
        }
        println!("🔧 Recovery:");
        for (number, step) in instruction.recovery_steps.iter().enumerate() {
            println!("   {}. {step}", number + 1);
        }
        println!("🛡️  Prevention:");
        for tip in instruction.prevention_tips {
            println!("   • {tip}");
        }

        println!();
        println!(
            "   Data loss risk: {}   Automatic repair: {}",
            instruction.data_loss_risk,
            if instruction.auto_recoverable { "yes" } else { "no" }
        );
        if !analysis.matched() {
            if let Some(indicator) = is_corruption_indicator(&self.text) {
                println!("⚠️  The message mentions corruption ({} severity)", indicator.severity);
            }
        }
        if analysis.corruption_type.is_some() {
            println!("💡 Run 'git-rescue detect' to confirm against the repository");
        }
        Ok(())
    }
}
