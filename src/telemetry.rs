use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::config::ObservabilityConfig;

/// Initialize tracing. `RUST_LOG` wins over the configured level when set.
/// Logs go to stderr so command output on stdout stays machine-readable.
pub fn init_telemetry(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.log_level))?;

    if config.json_logs {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(std::io::stderr),
            )
            .with(filter)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
            .with(filter)
            .try_init()?;
    }

    tracing::debug!(json = config.json_logs, "git-rescue telemetry initialized");
    Ok(())
}

/// Generate a correlation ID for linking related operations
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span for a single detection run
pub fn create_detection_span(repo: &str, correlation_id: &str) -> tracing::Span {
    tracing::info_span!(
        "corruption_detection",
        repo.path = repo,
        correlation.id = correlation_id,
    )
}
