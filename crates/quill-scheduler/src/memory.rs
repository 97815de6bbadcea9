//! In-process job store.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{Job, JobKey, JobSchedule, JobStore, StoreError};

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i64,
    jobs: Vec<Job>,
}

/// A [`JobStore`] held in memory. Jobs are kept in insertion order, which is id order.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    state: RwLock<MemoryState>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_key(job: &Job, key: &JobKey) -> bool {
    job.subject == key.subject && job.subject_id == key.subject_id && job.kind == key.kind
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn find_job(&self, key: &JobKey) -> Result<Option<Job>, StoreError> {
        let state = self.state.read().await;
        Ok(state.jobs.iter().find(|j| matches_key(j, key)).cloned())
    }

    async fn upsert_job(
        &self,
        key: &JobKey,
        due_at: i64,
        schedule: JobSchedule,
    ) -> Result<Job, StoreError> {
        let mut state = self.state.write().await;
        if let Some(job) = state.jobs.iter_mut().find(|j| matches_key(j, key)) {
            job.due_at = due_at;
            return Ok(job.clone());
        }

        state.next_id += 1;
        let job = Job {
            id: state.next_id,
            subject: key.subject.clone(),
            subject_id: key.subject_id,
            kind: key.kind.clone(),
            due_at,
            claimed: false,
            schedule,
        };
        state.jobs.push(job.clone());
        Ok(job)
    }

    async fn set_due(&self, id: i64, due_at: i64) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if let Some(job) = state.jobs.iter_mut().find(|j| j.id == id) {
            job.due_at = due_at;
        }
        Ok(())
    }

    async fn delete_matching(
        &self,
        subject: &str,
        subject_id: Option<i64>,
        kind: Option<&str>,
    ) -> Result<usize, StoreError> {
        let mut state = self.state.write().await;
        let before = state.jobs.len();
        state.jobs.retain(|j| {
            !(j.subject == subject
                && j.subject_id == subject_id
                && kind.is_none_or(|k| j.kind == k))
        });
        Ok(before - state.jobs.len())
    }

    async fn delete_job(&self, id: i64) -> Result<(), StoreError> {
        self.state.write().await.jobs.retain(|j| j.id != id);
        Ok(())
    }

    async fn due_jobs(&self, now: i64) -> Result<Vec<Job>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .jobs
            .iter()
            .filter(|j| j.due_at <= now)
            .cloned()
            .collect())
    }

    async fn try_claim(&self, id: i64) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        match state.jobs.iter_mut().find(|j| j.id == id && !j.claimed) {
            Some(job) => {
                job.claimed = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn release(&self, id: i64) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if let Some(job) = state.jobs.iter_mut().find(|j| j.id == id) {
            job.claimed = false;
        }
        Ok(())
    }

    async fn release_all(&self) -> Result<usize, StoreError> {
        let mut state = self.state.write().await;
        let mut count = 0;
        for job in state.jobs.iter_mut().filter(|j| j.claimed) {
            job.claimed = false;
            count += 1;
        }
        Ok(count)
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, StoreError> {
        Ok(self.state.read().await.jobs.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: i64, kind: &str) -> JobKey {
        JobKey::new("sprint", Some(id), kind)
    }

    #[tokio::test]
    async fn test_upsert_updates_existing_row() {
        let store = MemoryJobStore::new();

        let first = store.upsert_job(&key(1, "end"), 100, JobSchedule::Once).await.unwrap();
        let second = store.upsert_job(&key(1, "end"), 250, JobSchedule::Once).await.unwrap();

        assert_eq!(first.id, second.id);
        let jobs = store.list_jobs().await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].due_at, 250);
    }

    #[tokio::test]
    async fn test_upsert_keeps_original_schedule() {
        let store = MemoryJobStore::new();
        let goal = JobKey::new("goal", None, "reset");

        store
            .upsert_job(&goal, 0, JobSchedule::Interval { seconds: 1800 })
            .await
            .unwrap();
        let job = store.upsert_job(&goal, 50, JobSchedule::Once).await.unwrap();

        assert_eq!(job.schedule, JobSchedule::Interval { seconds: 1800 });
    }

    #[tokio::test]
    async fn test_claim_succeeds_once() {
        let store = MemoryJobStore::new();
        let job = store.upsert_job(&key(1, "start"), 0, JobSchedule::Once).await.unwrap();

        assert!(store.try_claim(job.id).await.unwrap());
        assert!(!store.try_claim(job.id).await.unwrap());

        store.release(job.id).await.unwrap();
        assert!(store.try_claim(job.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_claim_missing_job_fails() {
        let store = MemoryJobStore::new();
        assert!(!store.try_claim(42).await.unwrap());
    }

    #[tokio::test]
    async fn test_release_all_counts_held_jobs() {
        let store = MemoryJobStore::new();
        let a = store.upsert_job(&key(1, "start"), 0, JobSchedule::Once).await.unwrap();
        store.upsert_job(&key(1, "end"), 0, JobSchedule::Once).await.unwrap();
        store.try_claim(a.id).await.unwrap();

        assert_eq!(store.release_all().await.unwrap(), 1);
        assert!(store.list_jobs().await.unwrap().iter().all(|j| !j.claimed));
    }

    #[tokio::test]
    async fn test_delete_matching_with_and_without_kind() {
        let store = MemoryJobStore::new();
        store.upsert_job(&key(1, "start"), 0, JobSchedule::Once).await.unwrap();
        store.upsert_job(&key(1, "end"), 0, JobSchedule::Once).await.unwrap();
        store.upsert_job(&key(2, "end"), 0, JobSchedule::Once).await.unwrap();

        assert_eq!(store.delete_matching("sprint", Some(1), Some("end")).await.unwrap(), 1);
        assert_eq!(store.delete_matching("sprint", Some(1), None).await.unwrap(), 1);

        let remaining = store.list_jobs().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].subject_id, Some(2));
    }

    #[tokio::test]
    async fn test_due_jobs_in_id_order() {
        let store = MemoryJobStore::new();
        store.upsert_job(&key(1, "end"), 300, JobSchedule::Once).await.unwrap();
        store.upsert_job(&key(2, "end"), 100, JobSchedule::Once).await.unwrap();
        store.upsert_job(&key(3, "end"), 900, JobSchedule::Once).await.unwrap();

        let due: Vec<_> = store
            .due_jobs(300)
            .await
            .unwrap()
            .into_iter()
            .map(|j| j.subject_id)
            .collect();
        assert_eq!(due, vec![Some(1), Some(2)]);
    }
}
