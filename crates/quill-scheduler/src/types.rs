//! Scheduler types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a job: at most one job exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobKey {
    /// What kind of thing the job acts on (`sprint`, `goal`, ...).
    pub subject: String,
    /// Which instance of the subject, if the job is scoped to one.
    pub subject_id: Option<i64>,
    /// What the job does to its subject (`start`, `end`, `reset`, ...).
    pub kind: String,
}

impl JobKey {
    pub fn new(subject: impl Into<String>, subject_id: Option<i64>, kind: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            subject_id,
            kind: kind.into(),
        }
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.subject_id {
            Some(id) => write!(f, "{}:{}/{}", self.subject, id, self.kind),
            None => write!(f, "{}/{}", self.subject, self.kind),
        }
    }
}

/// A scheduled job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Store-assigned id. Ascending ids give the execution order within a tick.
    pub id: i64,
    /// Subject the job acts on.
    pub subject: String,
    /// Subject instance, `None` for global scans.
    pub subject_id: Option<i64>,
    /// Job kind within the subject.
    pub kind: String,
    /// Epoch seconds at which the job becomes due.
    pub due_at: i64,
    /// Whether a worker currently holds the job.
    pub claimed: bool,
    /// One-shot or recurring.
    pub schedule: JobSchedule,
}

/// How a job is scheduled to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobSchedule {
    /// Run once, then delete.
    Once,
    /// Run every N seconds.
    Interval { seconds: u64 },
}

/// What a handler reports after running a job.
///
/// A handler that rescheduled its own key must return [`JobOutcome::NotYet`],
/// otherwise the engine deletes the row it just moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// The work is finished.
    Done,
    /// The work cannot finish yet; the job is released with its due time unchanged.
    NotYet,
    /// The subject no longer exists. Treated the same as [`JobOutcome::Done`].
    SubjectMissing,
}

impl Job {
    pub fn key(&self) -> JobKey {
        JobKey::new(self.subject.clone(), self.subject_id, self.kind.clone())
    }

    /// Check if this job is due to run at `now`.
    pub fn is_due(&self, now: i64) -> bool {
        !self.claimed && self.due_at <= now
    }

    pub fn is_recurring(&self) -> bool {
        matches!(self.schedule, JobSchedule::Interval { .. })
    }

    /// Next due time after a run at `now`, or `None` for one-shot jobs.
    pub fn next_due_after(&self, now: i64) -> Option<i64> {
        match self.schedule {
            JobSchedule::Once => None,
            JobSchedule::Interval { seconds } => {
                Some(now.saturating_add(i64::try_from(seconds).unwrap_or(i64::MAX)))
            }
        }
    }
}
