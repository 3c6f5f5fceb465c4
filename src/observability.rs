use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::info;

/// Counters for detection, recovery and backup activity
#[derive(Debug, Default)]
pub struct RecoveryMetrics {
    pub detections: AtomicU64,
    pub issues_found: AtomicU64,
    pub sessions_started: AtomicU64,
    pub sessions_succeeded: AtomicU64,
    pub sessions_failed: AtomicU64,
    pub actions_executed: AtomicU64,
    pub actions_failed: AtomicU64,
    pub backups_created: AtomicU64,
}

impl RecoveryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_detection(&self, issues: usize) {
        self.detections.fetch_add(1, Ordering::Relaxed);
        self.issues_found.fetch_add(issues as u64, Ordering::Relaxed);
    }

    pub fn record_session_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_finished(&self, success: bool) {
        if success {
            self.sessions_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.sessions_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_action(&self, success: bool) {
        self.actions_executed.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.actions_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_backup(&self) {
        self.backups_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> RecoveryStats {
        RecoveryStats {
            detections: self.detections.load(Ordering::Relaxed),
            issues_found: self.issues_found.load(Ordering::Relaxed),
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            sessions_succeeded: self.sessions_succeeded.load(Ordering::Relaxed),
            sessions_failed: self.sessions_failed.load(Ordering::Relaxed),
            actions_executed: self.actions_executed.load(Ordering::Relaxed),
            actions_failed: self.actions_failed.load(Ordering::Relaxed),
            backups_created: self.backups_created.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Recovery metrics: detections={}, issues={}, sessions={}/{} ok/failed, actions={} ({} failed), backups={}",
            stats.detections,
            stats.issues_found,
            stats.sessions_succeeded,
            stats.sessions_failed,
            stats.actions_executed,
            stats.actions_failed,
            stats.backups_created
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryStats {
    pub detections: u64,
    pub issues_found: u64,
    pub sessions_started: u64,
    pub sessions_succeeded: u64,
    pub sessions_failed: u64,
    pub actions_executed: u64,
    pub actions_failed: u64,
    pub backups_created: u64,
}

/// Span wrapping everything done on behalf of one recovery session
pub fn create_session_span(session_id: &str, correlation_id: &str) -> tracing::Span {
    tracing::info_span!(
        "recovery_session",
        session.id = session_id,
        correlation.id = correlation_id,
    )
}

/// Time an operation and record metrics
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn finish(self) -> Duration {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis() as u64,
            "Operation completed"
        );
        duration
    }
}
