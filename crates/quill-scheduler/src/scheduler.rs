//! Polling loop that claims due jobs and dispatches them.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use crate::{Clock, HandlerRegistry, Job, JobOutcome, JobStore, SchedulerError};

/// Default time between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Counts of what happened to the jobs seen in one tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Jobs finished (or whose subject was gone).
    pub completed: usize,
    /// Jobs that reported they could not finish yet.
    pub deferred: usize,
    /// Jobs held by another worker.
    pub skipped: usize,
    /// Jobs with no registered handler.
    pub unhandled: usize,
    /// Jobs whose handler or bookkeeping failed.
    pub failed: usize,
}

/// Outcome of a single job within a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Completed,
    Deferred,
    Skipped,
    Unhandled,
    Failed,
}

/// The job scheduler.
pub struct Scheduler {
    store: Arc<dyn JobStore>,
    registry: HandlerRegistry,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
}

impl Scheduler {
    /// Create a new scheduler polling every [`DEFAULT_POLL_INTERVAL`].
    pub fn new(store: Arc<dyn JobStore>, registry: HandlerRegistry, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            registry,
            clock,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Forget every claim left behind by a previous run, so those jobs are retried.
    ///
    /// Call once at startup, before the first tick.
    #[tracing::instrument(skip(self))]
    pub async fn recover(&self) -> Result<usize, SchedulerError> {
        let released = self.store.release_all().await?;
        if released > 0 {
            warn!(released, "released jobs claimed by a previous run");
        }

        for job in self.store.list_jobs().await? {
            if !self.registry.contains(&job.subject, &job.kind) {
                warn!(job_id = job.id, key = %job.key(), "stored job has no registered handler");
            }
        }

        Ok(released)
    }

    /// Run every job due at `now`, one after another, in ascending id order.
    ///
    /// Per-job failures are logged and counted; only a failure to list due jobs is returned.
    #[tracing::instrument(skip(self))]
    pub async fn run_due(&self, now: i64) -> Result<TickReport, SchedulerError> {
        let due = self.store.due_jobs(now).await?;
        let mut report = TickReport::default();

        for job in due {
            match self.execute_job(&job, now).await {
                Disposition::Completed => report.completed += 1,
                Disposition::Deferred => report.deferred += 1,
                Disposition::Skipped => report.skipped += 1,
                Disposition::Unhandled => report.unhandled += 1,
                Disposition::Failed => report.failed += 1,
            }
        }

        if report != TickReport::default() {
            debug!(?report, "tick finished");
        }
        Ok(report)
    }

    /// Run the scheduler loop until `shutdown_rx` flips to true.
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(poll_interval = ?self.poll_interval, "scheduler starting");

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            tokio::select! {
                biased;
                changed = shutdown_rx.changed() => {
                    // Sender dropped counts as shutdown
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("scheduler received shutdown signal");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let now = self.clock.now();
                    if let Err(e) = self.run_due(now).await {
                        error!(error = %e, "failed to poll due jobs");
                    }
                }
            }
        }

        info!("scheduler shut down gracefully");
    }

    /// Execute a single job: claim, dispatch, then settle the row.
    #[tracing::instrument(skip(self, job), fields(job_id = job.id, key = %job.key()))]
    async fn execute_job(&self, job: &Job, now: i64) -> Disposition {
        if job.claimed {
            debug!("job already claimed, skipping");
            return Disposition::Skipped;
        }

        match self.store.try_claim(job.id).await {
            Ok(true) => {}
            Ok(false) => {
                debug!("lost claim race, skipping");
                return Disposition::Skipped;
            }
            Err(e) => {
                error!(error = %e, "failed to claim job");
                return Disposition::Failed;
            }
        }

        let Some(handler) = self.registry.get(&job.subject, &job.kind) else {
            warn!("no handler registered for job");
            self.release(job).await;
            return Disposition::Unhandled;
        };

        let result = handler.run(job, now).await;

        // Move recurring jobs forward before the claim is dropped
        if let Some(next) = job.next_due_after(now) {
            match self.store.set_due(job.id, next).await {
                Ok(()) => debug!(next_due = next, "rescheduled recurring job"),
                Err(e) => error!(error = %e, "failed to reschedule recurring job"),
            }
        }

        match result {
            Ok(JobOutcome::Done) | Ok(JobOutcome::SubjectMissing) if !job.is_recurring() => {
                match self.store.delete_job(job.id).await {
                    Ok(()) => {
                        info!("job completed");
                        Disposition::Completed
                    }
                    Err(e) => {
                        error!(error = %e, "failed to delete completed job");
                        self.release(job).await;
                        Disposition::Failed
                    }
                }
            }
            Ok(JobOutcome::Done) | Ok(JobOutcome::SubjectMissing) => {
                self.release(job).await;
                Disposition::Completed
            }
            Ok(JobOutcome::NotYet) => {
                debug!("job not finished yet, releasing");
                self.release(job).await;
                Disposition::Deferred
            }
            Err(e) => {
                error!(error = %e, "job handler failed, will retry");
                self.release(job).await;
                Disposition::Failed
            }
        }
    }

    async fn release(&self, job: &Job) {
        if let Err(e) = self.store.release(job.id).await {
            error!(job_id = job.id, error = %e, "failed to release job");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::{HandlerError, JobHandler, JobKey, ManualClock, MemoryJobStore, TaskQueue};

    /// Records the ids it sees and answers with a fixed outcome.
    struct Recording {
        outcome: Result<JobOutcome, String>,
        seen: Mutex<Vec<i64>>,
    }

    impl Recording {
        fn new(outcome: Result<JobOutcome, String>) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<i64> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl JobHandler for Recording {
        async fn run(&self, job: &Job, _now: i64) -> Result<JobOutcome, HandlerError> {
            self.seen.lock().unwrap().push(job.id);
            self.outcome.clone().map_err(Into::into)
        }
    }

    fn setup(handler: Arc<Recording>) -> (Arc<MemoryJobStore>, TaskQueue, Scheduler) {
        let store = Arc::new(MemoryJobStore::new());
        let queue = TaskQueue::new(store.clone());
        let mut registry = HandlerRegistry::new();
        registry
            .register("sprint", "start", handler.clone())
            .register("sprint", "end", handler.clone())
            .register("goal", "reset", handler);
        let scheduler = Scheduler::new(store.clone(), registry, Arc::new(ManualClock::new(0)));
        (store, queue, scheduler)
    }

    #[tokio::test]
    async fn test_done_deletes_one_shot_job() {
        let handler = Recording::new(Ok(JobOutcome::Done));
        let (store, queue, scheduler) = setup(handler.clone());
        queue.schedule("end", 100, "sprint", Some(1)).await.unwrap();

        let report = scheduler.run_due(100).await.unwrap();

        assert_eq!(report.completed, 1);
        assert_eq!(handler.seen().len(), 1);
        assert!(store.list_jobs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_future_jobs_are_left_alone() {
        let handler = Recording::new(Ok(JobOutcome::Done));
        let (store, queue, scheduler) = setup(handler.clone());
        queue.schedule("end", 101, "sprint", Some(1)).await.unwrap();

        scheduler.run_due(100).await.unwrap();

        assert!(handler.seen().is_empty());
        assert_eq!(store.list_jobs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_subject_missing_counts_as_done() {
        let handler = Recording::new(Ok(JobOutcome::SubjectMissing));
        let (store, queue, scheduler) = setup(handler);
        queue.schedule("start", 0, "sprint", Some(1)).await.unwrap();

        let report = scheduler.run_due(10).await.unwrap();

        assert_eq!(report.completed, 1);
        assert!(store.list_jobs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_not_yet_releases_with_same_due_time() {
        let handler = Recording::new(Ok(JobOutcome::NotYet));
        let (store, queue, scheduler) = setup(handler);
        queue.schedule("end", 50, "sprint", Some(1)).await.unwrap();

        let report = scheduler.run_due(60).await.unwrap();

        assert_eq!(report.deferred, 1);
        let jobs = store.list_jobs().await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert!(!jobs[0].claimed);
        assert_eq!(jobs[0].due_at, 50);
    }

    #[tokio::test]
    async fn test_handler_error_releases_and_tick_continues() {
        let failing = Recording::new(Err("database is locked".to_string()));
        let ok = Recording::new(Ok(JobOutcome::Done));
        let store = Arc::new(MemoryJobStore::new());
        let queue = TaskQueue::new(store.clone());
        let mut registry = HandlerRegistry::new();
        registry
            .register("sprint", "start", failing.clone())
            .register("sprint", "end", ok.clone());
        let scheduler = Scheduler::new(store.clone(), registry, Arc::new(ManualClock::new(0)));

        queue.schedule("start", 0, "sprint", Some(1)).await.unwrap();
        queue.schedule("end", 0, "sprint", Some(2)).await.unwrap();

        let report = scheduler.run_due(0).await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.completed, 1);
        let jobs = store.list_jobs().await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].kind, "start");
        assert!(!jobs[0].claimed);
    }

    #[tokio::test]
    async fn test_unknown_handler_is_released() {
        let handler = Recording::new(Ok(JobOutcome::Done));
        let (store, queue, scheduler) = setup(handler.clone());
        queue.schedule("complete", 0, "sprint", Some(1)).await.unwrap();

        let report = scheduler.run_due(0).await.unwrap();

        assert_eq!(report.unhandled, 1);
        assert!(handler.seen().is_empty());
        let jobs = store.list_jobs().await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert!(!jobs[0].claimed);
    }

    #[tokio::test]
    async fn test_claimed_job_is_skipped() {
        let handler = Recording::new(Ok(JobOutcome::Done));
        let (store, queue, scheduler) = setup(handler.clone());
        let job = queue.schedule("end", 0, "sprint", Some(1)).await.unwrap();
        assert!(store.try_claim(job.id).await.unwrap());

        let report = scheduler.run_due(0).await.unwrap();

        assert_eq!(report.skipped, 1);
        assert!(handler.seen().is_empty());
        assert_eq!(store.list_jobs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_jobs_run_in_id_order() {
        let handler = Recording::new(Ok(JobOutcome::Done));
        let (_store, queue, scheduler) = setup(handler.clone());
        let a = queue.schedule("end", 30, "sprint", Some(1)).await.unwrap();
        let b = queue.schedule("end", 10, "sprint", Some(2)).await.unwrap();
        let c = queue.schedule("start", 20, "sprint", Some(3)).await.unwrap();

        scheduler.run_due(100).await.unwrap();

        assert_eq!(handler.seen(), vec![a.id, b.id, c.id]);
    }

    #[tokio::test]
    async fn test_recurring_job_advances_regardless_of_outcome() {
        for outcome in [Ok(JobOutcome::Done), Ok(JobOutcome::NotYet), Err("boom".to_string())] {
            let handler = Recording::new(outcome);
            let (store, queue, scheduler) = setup(handler);
            queue.ensure_recurring("goal", "reset", 1800, 0).await.unwrap();

            scheduler.run_due(1000).await.unwrap();

            let jobs = store.list_jobs().await.unwrap();
            assert_eq!(jobs.len(), 1);
            assert_eq!(jobs[0].due_at, 2800);
            assert!(!jobs[0].claimed);
        }
    }

    #[tokio::test]
    async fn test_recover_clears_stale_claims() {
        let handler = Recording::new(Ok(JobOutcome::Done));
        let (store, queue, scheduler) = setup(handler.clone());
        let job = queue.schedule("end", 0, "sprint", Some(1)).await.unwrap();
        store.try_claim(job.id).await.unwrap();

        assert_eq!(scheduler.recover().await.unwrap(), 1);
        scheduler.run_due(0).await.unwrap();

        assert_eq!(handler.seen(), vec![job.id]);
    }

    /// Cancels its own subject while running, like a sprint completion does.
    struct SelfCancelling {
        queue: TaskQueue,
    }

    #[async_trait]
    impl JobHandler for SelfCancelling {
        async fn run(&self, job: &Job, _now: i64) -> Result<JobOutcome, HandlerError> {
            self.queue.cancel(&job.subject, job.subject_id, None).await?;
            Ok(JobOutcome::Done)
        }
    }

    #[tokio::test]
    async fn test_handler_may_delete_its_own_job() {
        let store = Arc::new(MemoryJobStore::new());
        let queue = TaskQueue::new(store.clone());
        let mut registry = HandlerRegistry::new();
        registry.register(
            "sprint",
            "complete",
            Arc::new(SelfCancelling {
                queue: queue.clone(),
            }),
        );
        let scheduler = Scheduler::new(store.clone(), registry, Arc::new(ManualClock::new(0)));
        queue.schedule("complete", 0, "sprint", Some(4)).await.unwrap();

        let report = scheduler.run_due(0).await.unwrap();

        assert_eq!(report.completed, 1);
        assert!(queue.find(&JobKey::new("sprint", Some(4), "complete")).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_loop_polls_until_shutdown() {
        let handler = Recording::new(Ok(JobOutcome::Done));
        let store = Arc::new(MemoryJobStore::new());
        let queue = TaskQueue::new(store.clone());
        let mut registry = HandlerRegistry::new();
        registry.register("sprint", "end", handler.clone());
        let scheduler = Arc::new(
            Scheduler::new(store.clone(), registry, Arc::new(ManualClock::new(100)))
                .with_poll_interval(Duration::from_secs(15)),
        );
        queue.schedule("end", 100, "sprint", Some(1)).await.unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let runner = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.run(shutdown_rx).await })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(handler.seen().len(), 1);

        shutdown_tx.send(true).unwrap();
        runner.await.unwrap();
        assert!(store.list_jobs().await.unwrap().is_empty());
    }
}
