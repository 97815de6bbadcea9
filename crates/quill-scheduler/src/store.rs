//! Persistence port for jobs.

use async_trait::async_trait;

use crate::{Job, JobKey, JobSchedule, StoreError};

/// Durable storage for jobs.
///
/// Every method must be atomic on its own. Implementations are shared by
/// several worker processes, so [`JobStore::try_claim`] has to be a single
/// conditional update rather than a read followed by a write.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Look up the job for a key.
    async fn find_job(&self, key: &JobKey) -> Result<Option<Job>, StoreError>;

    /// Insert a job for `key`, or move the existing one to `due_at`.
    ///
    /// `schedule` only applies when a new row is inserted.
    async fn upsert_job(
        &self,
        key: &JobKey,
        due_at: i64,
        schedule: JobSchedule,
    ) -> Result<Job, StoreError>;

    /// Overwrite the due time of a job by id. Missing ids are ignored.
    async fn set_due(&self, id: i64, due_at: i64) -> Result<(), StoreError>;

    /// Delete every job for a subject instance, optionally narrowed to one kind.
    /// Returns how many rows were removed.
    async fn delete_matching(
        &self,
        subject: &str,
        subject_id: Option<i64>,
        kind: Option<&str>,
    ) -> Result<usize, StoreError>;

    /// Delete one job by id. Missing ids are ignored.
    async fn delete_job(&self, id: i64) -> Result<(), StoreError>;

    /// All jobs with `due_at <= now`, ascending by id.
    async fn due_jobs(&self, now: i64) -> Result<Vec<Job>, StoreError>;

    /// Flip `claimed` from false to true. Returns `false` if the job is gone
    /// or another worker already holds it.
    async fn try_claim(&self, id: i64) -> Result<bool, StoreError>;

    /// Clear the claim on one job.
    async fn release(&self, id: i64) -> Result<(), StoreError>;

    /// Clear every claim. Returns how many jobs were held.
    async fn release_all(&self) -> Result<usize, StoreError>;

    /// Every job, ascending by id.
    async fn list_jobs(&self) -> Result<Vec<Job>, StoreError>;
}
