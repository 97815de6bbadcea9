//! The recurring goal reset job.

use std::sync::Arc;

use async_trait::async_trait;
use quill_scheduler::{HandlerError, HandlerRegistry, Job, JobHandler, JobOutcome, StoreError, TaskQueue};

use crate::GoalTracker;

pub const SUBJECT: &str = "goal";
pub const RESET: &str = "reset";

/// Seconds between reset passes.
pub const RESET_INTERVAL_SECONDS: u64 = 1800;

/// (subject, kind) pairs the daemon needs handlers for.
pub const JOB_KINDS: [(&str, &str); 1] = [(SUBJECT, RESET)];

/// Scans for and resets every due goal.
pub struct GoalResetJob {
    tracker: Arc<GoalTracker>,
}

impl GoalResetJob {
    pub fn new(tracker: Arc<GoalTracker>) -> Self {
        Self { tracker }
    }
}

#[async_trait]
impl JobHandler for GoalResetJob {
    async fn run(&self, _job: &Job, now: i64) -> Result<JobOutcome, HandlerError> {
        self.tracker.reset_due(now).await?;
        Ok(JobOutcome::Done)
    }
}

pub fn register_jobs(registry: &mut HandlerRegistry, tracker: Arc<GoalTracker>) {
    registry.register(SUBJECT, RESET, Arc::new(GoalResetJob::new(tracker)));
}

/// Replace any stored reset job with one fresh recurring job, due now.
pub async fn install(queue: &TaskQueue, now: i64) -> Result<Job, StoreError> {
    queue
        .ensure_recurring(SUBJECT, RESET, RESET_INTERVAL_SECONDS, now)
        .await
}
