// src/dispatch/task.rs

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::ProviderDescriptor;
use crate::diagnostics::Diagnostic;

/// Attempt counter for one task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetryState {
    /// Network calls issued so far
    pub attempt: u32,
    pub max_attempts: u32,
}

impl RetryState {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempt: 0,
            max_attempts,
        }
    }

    /// Count a new call and return its 1-based number
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempt = (self.attempt + 1).min(self.max_attempts);
        self.attempt
    }

    pub fn has_remaining(&self) -> bool {
        self.attempt < self.max_attempts
    }

    pub fn clear(&mut self) {
        self.attempt = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TaskState {
    Pending,
    InFlight,
    RetryScheduled,
    Succeeded,
    Failed,
}

impl TaskState {
    /// Whether moving from `self` to `next` is a legal step
    pub fn can_transition(&self, next: TaskState) -> bool {
        use TaskState::*;
        matches!(
            (self, next),
            (Pending, InFlight)
                | (Pending, Succeeded)
                | (Pending, Failed)
                | (InFlight, Succeeded)
                | (InFlight, RetryScheduled)
                | (InFlight, Failed)
                | (RetryScheduled, InFlight)
                | (RetryScheduled, Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Failed)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskState::Pending => "pending",
            TaskState::InFlight => "in_flight",
            TaskState::RetryScheduled => "retry_scheduled",
            TaskState::Succeeded => "succeeded",
            TaskState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One translation request against one provider
#[derive(Debug, Clone)]
pub struct TranslationTask {
    pub id: Uuid,
    pub descriptor: Arc<ProviderDescriptor>,
    pub text: String,
    pub source: String,
    pub target: String,
    pub retry: RetryState,
    state: TaskState,
}

impl TranslationTask {
    pub fn new(
        descriptor: Arc<ProviderDescriptor>,
        text: &str,
        source: &str,
        target: &str,
        max_attempts: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            descriptor,
            text: text.to_string(),
            source: source.to_string(),
            target: target.to_string(),
            retry: RetryState::new(max_attempts),
            state: TaskState::Pending,
        }
    }

    pub fn provider(&self) -> &str {
        &self.descriptor.name
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Move to `next`; illegal steps are ignored and reported as `false`
    pub fn transition(&mut self, next: TaskState) -> bool {
        if !self.state.can_transition(next) {
            tracing::debug!(
                task_id = %self.id,
                from = %self.state,
                to = %next,
                "Ignored illegal task transition"
            );
            return false;
        }
        self.state = next;
        if next.is_terminal() {
            self.retry.clear();
        }
        true
    }
}

/// Terminal result of a task as seen by the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TaskOutcome {
    Succeeded {
        task_id: Uuid,
        provider: String,
        text: String,
        attempts: u32,
        from_cache: bool,
    },
    Failed {
        task_id: Uuid,
        provider: String,
        diagnostic: Diagnostic,
        attempts: u32,
    },
}

impl TaskOutcome {
    pub fn provider(&self) -> &str {
        match self {
            TaskOutcome::Succeeded { provider, .. } | TaskOutcome::Failed { provider, .. } => {
                provider
            }
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            TaskOutcome::Succeeded { attempts, .. } | TaskOutcome::Failed { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Succeeded { .. })
    }

    /// Translated text, if the task succeeded
    pub fn text(&self) -> Option<&str> {
        match self {
            TaskOutcome::Succeeded { text, .. } => Some(text),
            TaskOutcome::Failed { .. } => None,
        }
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            TaskOutcome::Failed { diagnostic, .. } => Some(diagnostic),
            TaskOutcome::Succeeded { .. } => None,
        }
    }
}
