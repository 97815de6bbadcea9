//! Producer side of the job queue.

use std::sync::Arc;

use tracing::{debug, info};

use crate::{Job, JobKey, JobSchedule, JobStore, StoreError};

/// Schedules and cancels jobs. Cheap to clone; every clone shares the store.
#[derive(Clone)]
pub struct TaskQueue {
    store: Arc<dyn JobStore>,
}

impl TaskQueue {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Schedule a one-shot job. If a job already exists for the same
    /// (subject, subject id, kind), only its due time changes.
    #[tracing::instrument(skip(self))]
    pub async fn schedule(
        &self,
        kind: &str,
        due_at: i64,
        subject: &str,
        subject_id: Option<i64>,
    ) -> Result<Job, StoreError> {
        let key = JobKey::new(subject, subject_id, kind);
        let job = self.store.upsert_job(&key, due_at, JobSchedule::Once).await?;
        debug!(job_id = job.id, key = %key, due_at, "scheduled job");
        Ok(job)
    }

    /// Delete every job for a subject instance, or only the given kind.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(
        &self,
        subject: &str,
        subject_id: Option<i64>,
        kind: Option<&str>,
    ) -> Result<usize, StoreError> {
        let removed = self.store.delete_matching(subject, subject_id, kind).await?;
        if removed > 0 {
            debug!(subject, ?subject_id, ?kind, removed, "cancelled jobs");
        }
        Ok(removed)
    }

    /// Install a global recurring job, replacing whatever is stored under its key.
    /// The fresh job is due at `now`.
    pub async fn ensure_recurring(
        &self,
        subject: &str,
        kind: &str,
        interval_seconds: u64,
        now: i64,
    ) -> Result<Job, StoreError> {
        self.store.delete_matching(subject, None, Some(kind)).await?;
        let key = JobKey::new(subject, None, kind);
        let job = self
            .store
            .upsert_job(
                &key,
                now,
                JobSchedule::Interval {
                    seconds: interval_seconds,
                },
            )
            .await?;
        info!(job_id = job.id, key = %key, interval_seconds, "installed recurring job");
        Ok(job)
    }

    pub async fn find(&self, key: &JobKey) -> Result<Option<Job>, StoreError> {
        self.store.find_job(key).await
    }

    pub async fn list(&self) -> Result<Vec<Job>, StoreError> {
        self.store.list_jobs().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryJobStore;

    fn queue() -> TaskQueue {
        TaskQueue::new(Arc::new(MemoryJobStore::new()))
    }

    #[tokio::test]
    async fn test_schedule_twice_keeps_one_row() {
        let queue = queue();

        queue.schedule("end", 2200, "sprint", Some(1)).await.unwrap();
        queue.schedule("end", 1500, "sprint", Some(1)).await.unwrap();

        let jobs = queue.list().await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].due_at, 1500);
        assert_eq!(jobs[0].schedule, JobSchedule::Once);
    }

    #[tokio::test]
    async fn test_cancel_by_kind_leaves_others() {
        let queue = queue();
        queue.schedule("start", 100, "sprint", Some(1)).await.unwrap();
        queue.schedule("end", 200, "sprint", Some(1)).await.unwrap();

        assert_eq!(queue.cancel("sprint", Some(1), Some("start")).await.unwrap(), 1);

        let jobs = queue.list().await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].kind, "end");
    }

    #[tokio::test]
    async fn test_cancel_nothing_is_zero() {
        assert_eq!(queue().cancel("sprint", Some(9), None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ensure_recurring_replaces_existing() {
        let queue = queue();
        queue.schedule("reset", 99_999, "goal", None).await.unwrap();

        let job = queue.ensure_recurring("goal", "reset", 1800, 500).await.unwrap();

        assert_eq!(job.due_at, 500);
        assert_eq!(job.schedule, JobSchedule::Interval { seconds: 1800 });
        assert_eq!(queue.list().await.unwrap().len(), 1);
    }
}
