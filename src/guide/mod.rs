//! Error recovery guide
//!
//! Maps raw git error text onto structured remediation guidance. Always
//! returns something usable: unmatched text gets a generic instruction.

mod patterns;

pub use patterns::{ErrorPattern, RecoveryInstruction, GENERIC_INSTRUCTION, PATTERNS};

use serde::Serialize;

use crate::detection::{CorruptionType, Severity};
use crate::recovery::{DataLossRisk, MaxDataLoss, RecoveryOptions};
use patterns::CORRUPTION_VOCABULARY;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorAnalysis {
    /// Name of the matching pattern, `None` for the generic fallback.
    pub pattern: Option<&'static str>,
    pub corruption_type: Option<CorruptionType>,
    pub instruction: RecoveryInstruction,
    pub recovery_options: RecoveryOptions,
}

impl ErrorAnalysis {
    pub fn matched(&self) -> bool {
        self.pattern.is_some()
    }
}

/// Triage verdict for free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CorruptionIndicator {
    pub severity: Severity,
    pub corruption_type: Option<CorruptionType>,
}

/// First matching pattern wins; table order is significant.
pub fn analyze_error(text: &str) -> ErrorAnalysis {
    match PATTERNS.iter().find(|pattern| pattern.regex.is_match(text)) {
        Some(pattern) => {
            tracing::debug!(pattern = pattern.name, "Matched error pattern");
            ErrorAnalysis {
                pattern: Some(pattern.name),
                corruption_type: pattern.corruption_type,
                recovery_options: options_for(&pattern.instruction),
                instruction: pattern.instruction.clone(),
            }
        }
        None => ErrorAnalysis {
            pattern: None,
            corruption_type: None,
            recovery_options: options_for(&GENERIC_INSTRUCTION),
            instruction: GENERIC_INSTRUCTION,
        },
    }
}

/// Flags text that names a corruption pattern, or failing that uses
/// corruption vocabulary (reported at Medium).
pub fn is_corruption_indicator(text: &str) -> Option<CorruptionIndicator> {
    let matched = PATTERNS
        .iter()
        .filter(|pattern| pattern.corruption_type.is_some())
        .find(|pattern| pattern.regex.is_match(text));
    if let Some(pattern) = matched {
        return Some(CorruptionIndicator {
            severity: pattern.instruction.severity,
            corruption_type: pattern.corruption_type,
        });
    }
    CORRUPTION_VOCABULARY.is_match(text).then_some(CorruptionIndicator {
        severity: Severity::Medium,
        corruption_type: None,
    })
}

fn options_for(instruction: &RecoveryInstruction) -> RecoveryOptions {
    let risk = instruction.data_loss_risk;
    RecoveryOptions {
        max_data_loss: match risk {
            DataLossRisk::None => MaxDataLoss::None,
            DataLossRisk::Minimal => MaxDataLoss::Minimal,
            DataLossRisk::Moderate | DataLossRisk::High => MaxDataLoss::Moderate,
        },
        auto_repair: instruction.auto_recoverable && risk <= DataLossRisk::Minimal,
        create_backup: risk > DataLossRisk::None || instruction.severity >= Severity::High,
        preserve_uncommitted: true,
        aggressive: false,
        timeout_minutes: match instruction.severity {
            Severity::Critical => 60,
            Severity::High => 45,
            _ => 30,
        },
        require_confirmation: instruction.severity >= Severity::High || risk >= DataLossRisk::Moderate,
    }
}
