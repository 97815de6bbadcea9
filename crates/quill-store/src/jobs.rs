//! Job queue storage.

use async_trait::async_trait;
use quill_scheduler::{Job, JobKey, JobSchedule, JobStore, StoreError};
use rusqlite::{OptionalExtension, Row, TransactionBehavior, params};

use crate::{SqliteStore, bad_value};

const JOB_COLUMNS: &str = "id, subject, subject_id, kind, due_at, claimed, interval_seconds";

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<Job> {
    let schedule = match row.get::<_, Option<i64>>(6)? {
        None => JobSchedule::Once,
        Some(seconds) => JobSchedule::Interval {
            seconds: u64::try_from(seconds)
                .map_err(|_| bad_value(6, format!("negative interval {seconds}")))?,
        },
    };

    Ok(Job {
        id: row.get(0)?,
        subject: row.get(1)?,
        subject_id: row.get(2)?,
        kind: row.get(3)?,
        due_at: row.get(4)?,
        claimed: row.get(5)?,
        schedule,
    })
}

fn interval_seconds(schedule: JobSchedule) -> Option<i64> {
    match schedule {
        JobSchedule::Once => None,
        JobSchedule::Interval { seconds } => Some(i64::try_from(seconds).unwrap_or(i64::MAX)),
    }
}

#[async_trait]
impl JobStore for SqliteStore {
    async fn find_job(&self, key: &JobKey) -> Result<Option<Job>, StoreError> {
        self.with_conn("jobs", |conn| {
            conn.query_row(
                &format!(
                    "SELECT {JOB_COLUMNS} FROM jobs WHERE subject = ?1 AND subject_id IS ?2 AND kind = ?3"
                ),
                params![key.subject, key.subject_id, key.kind],
                job_from_row,
            )
            .optional()
        })
    }

    async fn upsert_job(
        &self,
        key: &JobKey,
        due_at: i64,
        schedule: JobSchedule,
    ) -> Result<Job, StoreError> {
        self.with_conn("jobs", |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let inserted = tx.execute(
                "INSERT OR IGNORE INTO jobs (subject, subject_id, kind, due_at, claimed, interval_seconds)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5)",
                params![key.subject, key.subject_id, key.kind, due_at, interval_seconds(schedule)],
            )?;
            if inserted == 0 {
                tx.execute(
                    "UPDATE jobs SET due_at = ?4 WHERE subject = ?1 AND subject_id IS ?2 AND kind = ?3",
                    params![key.subject, key.subject_id, key.kind, due_at],
                )?;
            }

            let job = tx.query_row(
                &format!(
                    "SELECT {JOB_COLUMNS} FROM jobs WHERE subject = ?1 AND subject_id IS ?2 AND kind = ?3"
                ),
                params![key.subject, key.subject_id, key.kind],
                job_from_row,
            )?;
            tx.commit()?;
            Ok(job)
        })
    }

    async fn set_due(&self, id: i64, due_at: i64) -> Result<(), StoreError> {
        self.with_conn("jobs", |conn| {
            conn.execute("UPDATE jobs SET due_at = ?2 WHERE id = ?1", params![id, due_at])?;
            Ok(())
        })
    }

    async fn delete_matching(
        &self,
        subject: &str,
        subject_id: Option<i64>,
        kind: Option<&str>,
    ) -> Result<usize, StoreError> {
        self.with_conn("jobs", |conn| {
            conn.execute(
                "DELETE FROM jobs WHERE subject = ?1 AND subject_id IS ?2 AND (?3 IS NULL OR kind = ?3)",
                params![subject, subject_id, kind],
            )
        })
    }

    async fn delete_job(&self, id: i64) -> Result<(), StoreError> {
        self.with_conn("jobs", |conn| {
            conn.execute("DELETE FROM jobs WHERE id = ?1", params![id])?;
            Ok(())
        })
    }

    async fn due_jobs(&self, now: i64) -> Result<Vec<Job>, StoreError> {
        self.with_conn("jobs", |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {JOB_COLUMNS} FROM jobs WHERE due_at <= ?1 ORDER BY id"
            ))?;
            let jobs = stmt
                .query_map(params![now], job_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>();
            jobs
        })
    }

    async fn try_claim(&self, id: i64) -> Result<bool, StoreError> {
        self.with_conn("jobs", |conn| {
            let changed = conn.execute(
                "UPDATE jobs SET claimed = 1 WHERE id = ?1 AND claimed = 0",
                params![id],
            )?;
            Ok(changed == 1)
        })
    }

    async fn release(&self, id: i64) -> Result<(), StoreError> {
        self.with_conn("jobs", |conn| {
            conn.execute("UPDATE jobs SET claimed = 0 WHERE id = ?1", params![id])?;
            Ok(())
        })
    }

    async fn release_all(&self) -> Result<usize, StoreError> {
        self.with_conn("jobs", |conn| {
            conn.execute("UPDATE jobs SET claimed = 0 WHERE claimed = 1", [])
        })
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, StoreError> {
        self.with_conn("jobs", |conn| {
            let mut stmt = conn.prepare(&format!("SELECT {JOB_COLUMNS} FROM jobs ORDER BY id"))?;
            let jobs = stmt
                .query_map([], job_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>();
            jobs
        })
    }
}
