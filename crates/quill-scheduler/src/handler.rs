//! Job handlers and the table that routes jobs to them.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::{Job, JobOutcome, SchedulerError};

/// Error type a handler may fail with. The scheduler only logs it.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Work performed when a job of a given (subject, kind) comes due.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn run(&self, job: &Job, now: i64) -> Result<JobOutcome, HandlerError>;
}

/// Maps (subject, kind) pairs to handlers.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<(String, String), Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one for the same pair.
    pub fn register(
        &mut self,
        subject: impl Into<String>,
        kind: impl Into<String>,
        handler: Arc<dyn JobHandler>,
    ) -> &mut Self {
        self.handlers.insert((subject.into(), kind.into()), handler);
        self
    }

    pub fn get(&self, subject: &str, kind: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers
            .get(&(subject.to_string(), kind.to_string()))
            .cloned()
    }

    pub fn contains(&self, subject: &str, kind: &str) -> bool {
        self.get(subject, kind).is_some()
    }

    /// Pairs from `required` that have no handler, formatted as `subject/kind`.
    pub fn missing(&self, required: &[(&str, &str)]) -> Vec<String> {
        required
            .iter()
            .filter(|(subject, kind)| !self.contains(subject, kind))
            .map(|(subject, kind)| format!("{subject}/{kind}"))
            .collect()
    }

    /// Fail if any of `required` has no handler.
    pub fn ensure_complete(&self, required: &[(&str, &str)]) -> Result<(), SchedulerError> {
        let missing = self.missing(required);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SchedulerError::MissingHandlers(missing))
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
