//! Goals and goal history.

use async_trait::async_trait;
use quill_goals::{GoalHistoryEntry, GoalRecord, GoalStore, Period};
use quill_scheduler::StoreError;
use rusqlite::{OptionalExtension, Row, params};

use crate::{SqliteStore, bad_value};

const GOAL_COLUMNS: &str = "id, user, type, goal, progress, completed, reset";

fn period_at(row: &Row<'_>, column: usize) -> rusqlite::Result<Period> {
    let name: String = row.get(column)?;
    Period::parse(&name).ok_or_else(|| bad_value(column, format!("unknown goal type {name:?}")))
}

fn goal_from_row(row: &Row<'_>) -> rusqlite::Result<GoalRecord> {
    Ok(GoalRecord {
        id: row.get(0)?,
        user: row.get::<_, i64>(1)? as u64,
        period: period_at(row, 2)?,
        goal: row.get(3)?,
        current: row.get(4)?,
        completed: row.get(5)?,
        reset_at: row.get(6)?,
    })
}

fn history_from_row(row: &Row<'_>) -> rusqlite::Result<GoalHistoryEntry> {
    Ok(GoalHistoryEntry {
        user: row.get::<_, i64>(0)? as u64,
        period: period_at(row, 1)?,
        label: row.get(2)?,
        goal: row.get(3)?,
        result: row.get(4)?,
        completed: row.get(5)?,
    })
}

// Daily, weekly, monthly, yearly
const PERIOD_ORDER: &str =
    "CASE type WHEN 'daily' THEN 0 WHEN 'weekly' THEN 1 WHEN 'monthly' THEN 2 ELSE 3 END";

#[async_trait]
impl GoalStore for SqliteStore {
    async fn due_goals(&self, now: i64) -> Result<Vec<GoalRecord>, StoreError> {
        self.with_conn("user_goals", |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {GOAL_COLUMNS} FROM user_goals WHERE reset <= ?1 ORDER BY id"
            ))?;
            let goals = stmt
                .query_map(params![now], goal_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>();
            goals
        })
    }

    async fn goal(&self, user: u64, period: Period) -> Result<Option<GoalRecord>, StoreError> {
        self.with_conn("user_goals", |conn| {
            conn.query_row(
                &format!("SELECT {GOAL_COLUMNS} FROM user_goals WHERE user = ?1 AND type = ?2"),
                params![user as i64, period.as_str()],
                goal_from_row,
            )
            .optional()
        })
    }

    async fn goals_for(&self, user: u64) -> Result<Vec<GoalRecord>, StoreError> {
        self.with_conn("user_goals", |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {GOAL_COLUMNS} FROM user_goals WHERE user = ?1 ORDER BY {PERIOD_ORDER}"
            ))?;
            let goals = stmt
                .query_map(params![user as i64], goal_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>();
            goals
        })
    }

    async fn save_goal(
        &self,
        user: u64,
        period: Period,
        goal: i64,
        reset_at: i64,
    ) -> Result<GoalRecord, StoreError> {
        self.with_conn("user_goals", |conn| {
            conn.execute(
                "INSERT INTO user_goals (user, type, goal, progress, completed, reset)
                 VALUES (?1, ?2, ?3, 0, 0, ?4)
                 ON CONFLICT (user, type) DO UPDATE SET goal = excluded.goal, reset = excluded.reset",
                params![user as i64, period.as_str(), goal, reset_at],
            )?;
            conn.query_row(
                &format!("SELECT {GOAL_COLUMNS} FROM user_goals WHERE user = ?1 AND type = ?2"),
                params![user as i64, period.as_str()],
                goal_from_row,
            )
        })
    }

    async fn delete_goal(&self, user: u64, period: Period) -> Result<bool, StoreError> {
        self.with_conn("user_goals", |conn| {
            let removed = conn.execute(
                "DELETE FROM user_goals WHERE user = ?1 AND type = ?2",
                params![user as i64, period.as_str()],
            )?;
            Ok(removed > 0)
        })
    }

    async fn update_progress(&self, id: i64, current: i64, completed: bool) -> Result<(), StoreError> {
        self.with_conn("user_goals", |conn| {
            conn.execute(
                "UPDATE user_goals SET progress = ?2, completed = ?3 WHERE id = ?1",
                params![id, current, completed],
            )?;
            Ok(())
        })
    }

    async fn archive_and_reset(
        &self,
        id: i64,
        entry: &GoalHistoryEntry,
        next_reset: i64,
    ) -> Result<(), StoreError> {
        self.with_conn("user_goals", |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO user_goals_history (user, type, date, goal, result, completed)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    entry.user as i64,
                    entry.period.as_str(),
                    entry.label,
                    entry.goal,
                    entry.result,
                    entry.completed,
                ],
            )?;
            tx.execute(
                "UPDATE user_goals SET progress = 0, completed = 0, reset = ?2 WHERE id = ?1",
                params![id, next_reset],
            )?;
            tx.commit()
        })
    }

    async fn history(
        &self,
        user: u64,
        period: Period,
        limit: Option<usize>,
    ) -> Result<Vec<GoalHistoryEntry>, StoreError> {
        // SQLite treats a negative LIMIT as no limit
        let limit = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
        self.with_conn("user_goals_history", |conn| {
            let mut stmt = conn.prepare(
                "SELECT user, type, date, goal, result, completed FROM user_goals_history
                 WHERE user = ?1 AND type = ?2 ORDER BY id DESC LIMIT ?3",
            )?;
            let entries = stmt
                .query_map(params![user as i64, period.as_str(), limit], history_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>();
            entries
        })
    }
}
