//! Durable job queue for Quill.
//!
//! This crate provides a polled scheduler that:
//! - Persists jobs through a pluggable [`JobStore`]
//! - Keeps at most one job per (subject, subject id, kind) triple
//! - Claims jobs with an atomic conditional update so concurrent workers never run the same job twice at once
//! - Dispatches to handlers registered by (subject, kind)
//! - Supports one-shot and recurring interval jobs
//! - Clears stale claims on startup so interrupted work is retried

mod clock;
mod error;
mod handler;
mod memory;
mod queue;
mod scheduler;
mod store;
mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{SchedulerError, StoreError};
pub use handler::{HandlerError, HandlerRegistry, JobHandler};
pub use memory::MemoryJobStore;
pub use queue::TaskQueue;
pub use scheduler::{DEFAULT_POLL_INTERVAL, Scheduler, TickReport};
pub use store::JobStore;
pub use types::{Job, JobKey, JobOutcome, JobSchedule};
