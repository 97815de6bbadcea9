//! Goal accumulation, goal setting and the periodic reset.

use std::sync::Arc;

use chrono_tz::Tz;
use quill_scheduler::{Clock, StoreError};
use tracing::{debug, info, warn};

use crate::boundary::{next_boundary, previous_label, resolve_timezone};
use crate::{GoalError, GoalHistoryEntry, GoalRecord, GoalStore, Period, Rewards, Timezones};

/// Outcome of one reset pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetReport {
    pub due: usize,
    pub reset: usize,
}

pub struct GoalTracker {
    store: Arc<dyn GoalStore>,
    rewards: Arc<dyn Rewards>,
    timezones: Arc<dyn Timezones>,
    clock: Arc<dyn Clock>,
}

impl GoalTracker {
    pub fn new(
        store: Arc<dyn GoalStore>,
        rewards: Arc<dyn Rewards>,
        timezones: Arc<dyn Timezones>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            rewards,
            timezones,
            clock,
        }
    }

    /// Set or change a user's target. The first reset is the next boundary in their timezone.
    #[tracing::instrument(skip(self))]
    pub async fn set_goal(&self, user: u64, period: Period, words: i64) -> Result<GoalRecord, GoalError> {
        if words <= 0 {
            return Err(GoalError::InvalidTarget);
        }

        let tz = self.timezone(user).await?;
        let now = self.clock.now();
        let reset_at = next_boundary(tz, period, now).ok_or(GoalError::OutOfRange {
            period: period.as_str(),
            at: now,
        })?;

        let record = self.store.save_goal(user, period, words, reset_at).await?;
        info!(goal_id = record.id, reset_at, "goal set");
        Ok(record)
    }

    pub async fn delete_goal(&self, user: u64, period: Period) -> Result<bool, GoalError> {
        Ok(self.store.delete_goal(user, period).await?)
    }

    pub async fn goal(&self, user: u64, period: Period) -> Result<Option<GoalRecord>, GoalError> {
        Ok(self.store.goal(user, period).await?)
    }

    pub async fn history(&self, user: u64, period: Period) -> Result<Vec<GoalHistoryEntry>, GoalError> {
        Ok(self
            .store
            .history(user, period, period.history_limit())
            .await?)
    }

    /// Count words towards all of a user's goals.
    ///
    /// Progress never drops below zero. A goal is met at most once per
    /// period; meeting it awards XP and returns an announcement.
    #[tracing::instrument(skip(self))]
    pub async fn add_words(&self, user: u64, words: i64) -> Result<Vec<String>, StoreError> {
        let mut announcements = Vec::new();

        for record in self.store.goals_for(user).await? {
            let current = (record.current + words).max(0);
            let newly_met = !record.completed && current >= record.goal;

            self.store
                .update_progress(record.id, current, record.completed || newly_met)
                .await?;

            if newly_met {
                let xp = record.period.xp();
                self.rewards
                    .increment_stat(user, &record.period.completed_stat(), 1)
                    .await?;
                self.rewards.award_xp(user, xp).await?;
                announcements.push(format!(
                    "<@{user}> has met their {} goal of {} words!       +{xp}xp!",
                    record.period, record.goal
                ));
                debug!(goal_id = record.id, period = %record.period, "goal met");
            }
        }

        Ok(announcements)
    }

    /// Archive and zero every goal whose period has rolled over.
    ///
    /// A record that fails (e.g. its owner has an invalid timezone) is
    /// logged and left for the next pass; the rest still reset.
    #[tracing::instrument(skip(self))]
    pub async fn reset_due(&self, now: i64) -> Result<ResetReport, GoalError> {
        let due = self.store.due_goals(now).await?;
        let mut report = ResetReport {
            due: due.len(),
            reset: 0,
        };

        for record in &due {
            match self.reset_one(record, now).await {
                Ok(()) => report.reset += 1,
                Err(e) => warn!(goal_id = record.id, user = record.user, error = %e, "failed to reset goal"),
            }
        }

        info!(reset = report.reset, due = report.due, "goal reset pass finished");
        Ok(report)
    }

    async fn reset_one(&self, record: &GoalRecord, now: i64) -> Result<(), GoalError> {
        let tz = self.timezone(record.user).await?;
        let out_of_range = || GoalError::OutOfRange {
            period: record.period.as_str(),
            at: now,
        };

        let entry = GoalHistoryEntry {
            user: record.user,
            period: record.period,
            label: previous_label(tz, record.period, now).ok_or_else(out_of_range)?,
            goal: record.goal,
            result: record.current,
            completed: record.completed,
        };
        let next_reset = next_boundary(tz, record.period, now).ok_or_else(out_of_range)?;

        self.store
            .archive_and_reset(record.id, &entry, next_reset)
            .await?;
        debug!(goal_id = record.id, next_reset, "goal reset");
        Ok(())
    }

    async fn timezone(&self, user: u64) -> Result<Tz, GoalError> {
        let name = self.timezones.timezone(user).await?;
        resolve_timezone(name.as_deref()).ok_or_else(|| GoalError::InvalidTimezone {
            user,
            timezone: name.unwrap_or_default(),
        })
    }
}
