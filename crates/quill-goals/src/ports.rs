//! Collaborator interfaces for goals.

use async_trait::async_trait;
use quill_scheduler::StoreError;

use crate::{GoalHistoryEntry, GoalRecord, Period};

/// Persistence for goals and their history.
#[async_trait]
pub trait GoalStore: Send + Sync {
    /// Every goal whose reset time is at or before `now`.
    async fn due_goals(&self, now: i64) -> Result<Vec<GoalRecord>, StoreError>;

    async fn goal(&self, user: u64, period: Period) -> Result<Option<GoalRecord>, StoreError>;

    /// The user's goals, daily first.
    async fn goals_for(&self, user: u64) -> Result<Vec<GoalRecord>, StoreError>;

    /// Create the goal with no progress, or change the target and reset time of an existing one.
    async fn save_goal(
        &self,
        user: u64,
        period: Period,
        goal: i64,
        reset_at: i64,
    ) -> Result<GoalRecord, StoreError>;

    /// Returns whether a goal was removed.
    async fn delete_goal(&self, user: u64, period: Period) -> Result<bool, StoreError>;

    async fn update_progress(&self, id: i64, current: i64, completed: bool) -> Result<(), StoreError>;

    /// Append `entry` to history and zero the goal with a new reset time, in one transaction.
    async fn archive_and_reset(
        &self,
        id: i64,
        entry: &GoalHistoryEntry,
        next_reset: i64,
    ) -> Result<(), StoreError>;

    /// Newest first.
    async fn history(
        &self,
        user: u64,
        period: Period,
        limit: Option<usize>,
    ) -> Result<Vec<GoalHistoryEntry>, StoreError>;
}

/// XP and stat counters.
#[async_trait]
pub trait Rewards: Send + Sync {
    async fn award_xp(&self, user: u64, amount: i64) -> Result<(), StoreError>;

    async fn increment_stat(&self, user: u64, stat: &str, amount: i64) -> Result<(), StoreError>;
}

/// Users' timezone settings.
#[async_trait]
pub trait Timezones: Send + Sync {
    /// IANA timezone name, if set.
    async fn timezone(&self, user: u64) -> Result<Option<String>, StoreError>;
}
