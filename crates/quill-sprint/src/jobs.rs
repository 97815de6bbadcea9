//! Scheduler handlers for sprint phase changes.

use std::sync::Arc;

use async_trait::async_trait;
use quill_scheduler::{HandlerError, HandlerRegistry, Job, JobHandler, JobOutcome};
use tracing::warn;

use crate::service::{Advance, SprintService, Step};

/// Job subject for every sprint job.
pub const SUBJECT: &str = "sprint";

pub const START: &str = "start";
pub const END: &str = "end";
pub const COMPLETE: &str = "complete";

/// (subject, kind) pairs the daemon needs handlers for.
pub const JOB_KINDS: [(&str, &str); 3] = [(SUBJECT, START), (SUBJECT, END), (SUBJECT, COMPLETE)];

/// Runs one lifecycle step for the sprint named by the job.
pub struct SprintJob {
    service: Arc<SprintService>,
    step: Step,
}

impl SprintJob {
    pub fn new(service: Arc<SprintService>, step: Step) -> Self {
        Self { service, step }
    }
}

#[async_trait]
impl JobHandler for SprintJob {
    async fn run(&self, job: &Job, _now: i64) -> Result<JobOutcome, HandlerError> {
        let Some(sprint_id) = job.subject_id else {
            warn!(job_id = job.id, "sprint job without a sprint id");
            return Ok(JobOutcome::SubjectMissing);
        };

        let outcome = match self.service.advance(sprint_id, self.step, None).await? {
            Advance::Applied | Advance::Stale => JobOutcome::Done,
            Advance::NotYet => JobOutcome::NotYet,
            Advance::Missing => JobOutcome::SubjectMissing,
        };
        Ok(outcome)
    }
}

/// Register the start, end and complete handlers.
pub fn register_jobs(registry: &mut HandlerRegistry, service: Arc<SprintService>) {
    registry
        .register(SUBJECT, START, Arc::new(SprintJob::new(service.clone(), Step::Start)))
        .register(
            SUBJECT,
            END,
            Arc::new(SprintJob::new(service.clone(), Step::End { forced: false })),
        )
        .register(SUBJECT, COMPLETE, Arc::new(SprintJob::new(service, Step::Complete)));
}
