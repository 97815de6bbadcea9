//! Collaborator interfaces the sprint lifecycle depends on.

use async_trait::async_trait;
use quill_scheduler::StoreError;
use serde::{Deserialize, Serialize};

use crate::{ChannelId, GuildId, MessagingError, NewSprint, Participant, ProjectId, Sprint, UserId};

/// Stat counters kept per user.
pub mod stats {
    pub const SPRINTS_STARTED: &str = "sprints_started";
    pub const SPRINTS_COMPLETED: &str = "sprints_completed";
    pub const SPRINTS_WON: &str = "sprints_won";
    pub const SPRINTS_WORDS_WRITTEN: &str = "sprints_words_written";
    pub const TOTAL_WORDS_WRITTEN: &str = "total_words_written";
}

/// Persistence for sprints and their participants.
#[async_trait]
pub trait SprintStore: Send + Sync {
    /// The guild's sprint with `completed = 0`, if any.
    async fn active_sprint(&self, guild: GuildId) -> Result<Option<Sprint>, StoreError>;

    async fn sprint(&self, id: i64) -> Result<Option<Sprint>, StoreError>;

    /// Insert a sprint. Returns `None` if the guild already has an active sprint.
    async fn insert_sprint(&self, sprint: &NewSprint) -> Result<Option<Sprint>, StoreError>;

    /// Pull the end time forward to `at` if it is later.
    async fn mark_ended(&self, id: i64, at: i64) -> Result<(), StoreError>;

    async fn set_end_reference(&self, id: i64, at: i64) -> Result<(), StoreError>;

    /// Set `completed = at` if it is still 0. Returns whether this call did it.
    async fn mark_completed(&self, id: i64, at: i64) -> Result<bool, StoreError>;

    /// Delete a sprint and all of its participants.
    async fn delete_sprint(&self, id: i64) -> Result<(), StoreError>;

    /// Participants in join order.
    async fn participants(&self, sprint_id: i64) -> Result<Vec<Participant>, StoreError>;

    async fn participant(
        &self,
        sprint_id: i64,
        user: UserId,
    ) -> Result<Option<Participant>, StoreError>;

    /// Insert or fully overwrite the row for (sprint, user).
    async fn save_participant(&self, participant: &Participant) -> Result<(), StoreError>;

    /// Returns whether a row was removed.
    async fn remove_participant(&self, sprint_id: i64, user: UserId) -> Result<bool, StoreError>;

    /// The user's latest participation in any sprint other than `excluding`.
    async fn most_recent_participation(
        &self,
        user: UserId,
        excluding: i64,
    ) -> Result<Option<Participant>, StoreError>;
}

/// A pending interactive reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub application_id: u64,
    pub token: String,
}

/// Where a message goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Reply to a user's command.
    Interaction(Interaction),
    /// Post directly to a channel.
    Channel(ChannelId),
}

/// Sends chat messages.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, target: &Target, text: &str) -> Result<(), MessagingError>;
}

/// XP, stats and records.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn award_xp(&self, user: UserId, amount: i64) -> Result<(), StoreError>;

    async fn increment_stat(&self, user: UserId, stat: &str, amount: i64) -> Result<(), StoreError>;

    /// Best words-per-minute, if the user has one.
    async fn personal_best(&self, user: UserId) -> Result<Option<f64>, StoreError>;

    async fn set_personal_best(&self, user: UserId, wpm: f64) -> Result<(), StoreError>;
}

/// Word-count goals.
#[async_trait]
pub trait Goals: Send + Sync {
    /// Count words towards every goal the user has. Returns announcements for goals just met.
    async fn add_words(&self, user: UserId, words: i64) -> Result<Vec<String>, StoreError>;
}

/// A user's writing project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub owner: UserId,
    pub shortname: String,
    pub name: String,
    pub words: i64,
}

/// Writing projects.
#[async_trait]
pub trait Projects: Send + Sync {
    async fn find_by_shortname(
        &self,
        owner: UserId,
        shortname: &str,
    ) -> Result<Option<Project>, StoreError>;

    async fn project(&self, id: ProjectId) -> Result<Option<Project>, StoreError>;

    async fn credit_words(&self, id: ProjectId, words: i64) -> Result<(), StoreError>;
}

/// Per-user and per-guild settings.
#[async_trait]
pub trait Settings: Send + Sync {
    /// Minutes between "pens down" and results, if the guild overrides the default.
    async fn end_delay_minutes(&self, guild: GuildId) -> Result<Option<u32>, StoreError>;

    /// Words-per-minute above which a declaration needs confirming, if the user overrides the default.
    async fn max_wpm(&self, user: UserId) -> Result<Option<u32>, StoreError>;

    /// IANA timezone name, if set.
    async fn timezone(&self, user: UserId) -> Result<Option<String>, StoreError>;

    /// Users who asked to be pinged about new sprints in the guild.
    async fn sprint_subscribers(&self, guild: GuildId) -> Result<Vec<UserId>, StoreError>;

    async fn set_sprint_notify(
        &self,
        guild: GuildId,
        user: UserId,
        enabled: bool,
    ) -> Result<(), StoreError>;
}
