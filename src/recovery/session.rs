use statig::prelude::*;

use super::types::SessionPhase;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Start,
    BackupSkipped,
    BackupSucceeded { backup_id: String },
    /// `abort` is set when the caller demanded confirmation, so recovery may
    /// not continue without a safety net.
    BackupFailed { reason: String, abort: bool },
    ActionFinished { success: bool },
    /// A high-risk action failed; no further actions may run.
    Halted,
    ExecutionFinished,
    Validated { success: bool },
    Abort { reason: String },
}

/// Lifecycle of one recovery session:
/// created -> backup -> executing -> validating -> success | partial | failed.
#[derive(Debug)]
pub struct SessionLifecycle {
    pub session_id: String,
    pub phase: SessionPhase,
    pub backup_id: Option<String>,
    pub actions_succeeded: usize,
    pub actions_failed: usize,
    pub halted: bool,
    pub failure_reason: Option<String>,
}

impl SessionLifecycle {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            phase: SessionPhase::Created,
            backup_id: None,
            actions_succeeded: 0,
            actions_failed: 0,
            halted: false,
            failure_reason: None,
        }
    }

    fn enter(&mut self, phase: SessionPhase) {
        tracing::debug!(session.id = %self.session_id, from = ?self.phase, to = ?phase, "Session phase change");
        self.phase = phase;
    }

    fn fail(&mut self, reason: &str) -> Outcome<State> {
        self.failure_reason = Some(reason.to_string());
        self.enter(SessionPhase::Failed);
        Transition(State::failed())
    }
}

#[state_machine(initial = "State::created()")]
impl SessionLifecycle {
    #[state]
    fn created(&mut self, event: &SessionEvent) -> Outcome<State> {
        match event {
            SessionEvent::Start => {
                self.enter(SessionPhase::Backup);
                Transition(State::backup())
            }
            SessionEvent::Abort { reason } => self.fail(reason),
            _ => Handled,
        }
    }

    #[state]
    fn backup(&mut self, event: &SessionEvent) -> Outcome<State> {
        match event {
            SessionEvent::BackupSkipped => {
                self.enter(SessionPhase::Executing);
                Transition(State::executing())
            }
            SessionEvent::BackupSucceeded { backup_id } => {
                self.backup_id = Some(backup_id.clone());
                self.enter(SessionPhase::Executing);
                Transition(State::executing())
            }
            SessionEvent::BackupFailed { reason, abort: true } => self.fail(reason),
            SessionEvent::BackupFailed { reason, abort: false } => {
                tracing::warn!(session.id = %self.session_id, reason = %reason, "Continuing without a backup");
                self.enter(SessionPhase::Executing);
                Transition(State::executing())
            }
            SessionEvent::Abort { reason } => self.fail(reason),
            _ => Handled,
        }
    }

    #[state]
    fn executing(&mut self, event: &SessionEvent) -> Outcome<State> {
        match event {
            SessionEvent::ActionFinished { success: true } => {
                self.actions_succeeded += 1;
                Handled
            }
            SessionEvent::ActionFinished { success: false } => {
                self.actions_failed += 1;
                Handled
            }
            SessionEvent::Halted => {
                self.halted = true;
                self.enter(SessionPhase::Validating);
                Transition(State::validating())
            }
            SessionEvent::ExecutionFinished => {
                self.enter(SessionPhase::Validating);
                Transition(State::validating())
            }
            SessionEvent::Abort { reason } => self.fail(reason),
            _ => Handled,
        }
    }

    #[state]
    fn validating(&mut self, event: &SessionEvent) -> Outcome<State> {
        match event {
            SessionEvent::Validated { success: true } => {
                self.enter(SessionPhase::Success);
                Transition(State::success())
            }
            SessionEvent::Validated { success: false } if self.actions_succeeded > 0 => {
                self.enter(SessionPhase::Partial);
                Transition(State::partial())
            }
            SessionEvent::Validated { success: false } => self.fail("issues remain after recovery"),
            SessionEvent::Abort { reason } => self.fail(reason),
            _ => Handled,
        }
    }

    #[state]
    fn success(&mut self, event: &SessionEvent) -> Outcome<State> {
        tracing::trace!(session.id = %self.session_id, ?event, "Session already finished");
        Handled
    }

    #[state]
    fn partial(&mut self, event: &SessionEvent) -> Outcome<State> {
        tracing::trace!(session.id = %self.session_id, ?event, "Session already finished");
        Handled
    }

    #[state]
    fn failed(&mut self, event: &SessionEvent) -> Outcome<State> {
        tracing::trace!(session.id = %self.session_id, ?event, "Session already finished");
        Handled
    }
}
