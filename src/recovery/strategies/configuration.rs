use crate::detection::{CorruptionIssue, CorruptionType};
use crate::recovery::strategies::{manual_action, RecoveryStrategy};
use crate::recovery::types::{DataLossRisk, RecoveryAction, RecoveryError, RecoveryOperation, RecoveryOptions, StrategyKind};

pub struct ConfigurationStrategy;

const HANDLED: &[CorruptionType] = &[CorruptionType::CorruptConfig, CorruptionType::InvalidRemote];

impl RecoveryStrategy for ConfigurationStrategy {
    fn name(&self) -> &'static str {
        "configuration"
    }

    fn handled_types(&self) -> &'static [CorruptionType] {
        HANDLED
    }

    fn generate_actions(
        &self,
        issue: &CorruptionIssue,
        _options: &RecoveryOptions,
    ) -> Result<Vec<RecoveryAction>, RecoveryError> {
        let action = match (issue.issue_type, issue.target.as_deref()) {
            (CorruptionType::InvalidRemote, Some(remote)) => RecoveryAction::new(
                issue,
                StrategyKind::SafeRepair,
                format!("Remove remote '{remote}' with an invalid URL"),
            )
            .operation(RecoveryOperation::RemoveRemote {
                name: remote.to_string(),
            })
            .risk(DataLossRisk::Minimal)
            .success_probability(90)
            .minutes(1),
            _ => manual_action(
                issue,
                StrategyKind::ManualIntervention,
                DataLossRisk::Moderate,
                "Inspect .git/config by hand or restore it from a backup",
            ),
        };
        Ok(vec![action])
    }
}
