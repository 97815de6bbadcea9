//! Word-count goals for Quill.
//!
//! Users set daily, weekly, monthly or yearly targets. Words written in
//! sprints count towards every goal they have, and a recurring job archives
//! and zeroes goals once their period rolls over in the owner's timezone.

pub mod boundary;
mod error;
mod job;
mod model;
pub mod ports;
mod tracker;

pub use error::GoalError;
pub use job::{GoalResetJob, JOB_KINDS, RESET, RESET_INTERVAL_SECONDS, SUBJECT, install, register_jobs};
pub use model::{GoalHistoryEntry, GoalRecord, Period};
pub use ports::{GoalStore, Rewards, Timezones};
pub use tracker::{GoalTracker, ResetReport};
