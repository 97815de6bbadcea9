//! Writing sprints for Quill.
//!
//! A sprint is a timed group writing session owned by one guild. Its phase
//! is always derived from the stored times, and every phase change goes
//! through [`SprintService::advance`], whether a scheduled job or a user
//! command triggered it.
//!
//! Collaborators (storage, messaging, XP, goals, projects, settings) are
//! injected as trait objects; see [`ports`].

mod error;
mod jobs;
pub mod messages;
mod model;
pub mod ports;
pub mod ranking;
mod service;

pub use error::{MessagingError, SprintError};
pub use jobs::{COMPLETE, END, JOB_KINDS, START, SUBJECT, SprintJob, register_jobs};
pub use model::{
    ChannelId, GuildId, NewSprint, Participant, ParticipationKind, Phase, ProjectId, Sprint, UserId,
};
pub use ports::{Interaction, Target};
pub use service::{
    Advance, Caller, CancelReason, Collaborators, DeclareReceipt, JoinReceipt, LeaveReceipt,
    StartAt, StatusReport, Step, TimeLeft, SprintService,
};
