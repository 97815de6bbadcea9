//! XP, stats, records and settings.

use async_trait::async_trait;
use quill_goals::{Rewards, Timezones};
use quill_scheduler::StoreError;
use quill_sprint::ports::{Ledger, Settings};
use quill_sprint::{GuildId, UserId};
use rusqlite::{Connection, OptionalExtension, params};

use crate::SqliteStore;

/// Record name for the best sprint words-per-minute.
const WPM_RECORD: &str = "wpm";

/// User setting names.
pub mod setting {
    pub const TIMEZONE: &str = "timezone";
    pub const MAX_WPM: &str = "maxwpm";
}

/// Guild setting names.
pub mod guild_setting {
    pub const SPRINT_DELAY_END: &str = "sprint_delay_end";
}

fn add_xp(conn: &Connection, user: UserId, amount: i64) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO user_xp (user, xp) VALUES (?1, ?2)
         ON CONFLICT (user) DO UPDATE SET xp = xp + excluded.xp",
        params![user as i64, amount],
    )?;
    Ok(())
}

fn add_stat(conn: &Connection, user: UserId, name: &str, amount: i64) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO user_stats (user, name, value) VALUES (?1, ?2, ?3)
         ON CONFLICT (user, name) DO UPDATE SET value = value + excluded.value",
        params![user as i64, name, amount],
    )?;
    Ok(())
}

fn user_setting(conn: &Connection, user: UserId, name: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM user_settings WHERE user = ?1 AND setting = ?2",
        params![user as i64, name],
        |row| row.get(0),
    )
    .optional()
}

impl SqliteStore {
    pub fn set_user_setting(&self, user: UserId, name: &str, value: &str) -> Result<(), StoreError> {
        self.with_conn("user_settings", |conn| {
            conn.execute(
                "INSERT INTO user_settings (user, setting, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT (user, setting) DO UPDATE SET value = excluded.value",
                params![user as i64, name, value],
            )?;
            Ok(())
        })
    }

    pub fn set_guild_setting(&self, guild: GuildId, name: &str, value: &str) -> Result<(), StoreError> {
        self.with_conn("guild_settings", |conn| {
            conn.execute(
                "INSERT INTO guild_settings (guild, setting, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT (guild, setting) DO UPDATE SET value = excluded.value",
                params![guild as i64, name, value],
            )?;
            Ok(())
        })
    }

    pub fn xp(&self, user: UserId) -> Result<i64, StoreError> {
        self.with_conn("user_xp", |conn| {
            conn.query_row(
                "SELECT xp FROM user_xp WHERE user = ?1",
                params![user as i64],
                |row| row.get(0),
            )
            .optional()
            .map(Option::unwrap_or_default)
        })
    }

    pub fn stat(&self, user: UserId, name: &str) -> Result<i64, StoreError> {
        self.with_conn("user_stats", |conn| {
            conn.query_row(
                "SELECT value FROM user_stats WHERE user = ?1 AND name = ?2",
                params![user as i64, name],
                |row| row.get(0),
            )
            .optional()
            .map(Option::unwrap_or_default)
        })
    }

    /// Numeric setting; unparseable values count as unset.
    fn numeric_setting(&self, table: &'static str, sql: &str, id: u64, name: &str) -> Result<Option<u32>, StoreError> {
        let value: Option<String> = self.with_conn(table, |conn| {
            conn.query_row(sql, params![id as i64, name], |row| row.get(0))
                .optional()
        })?;
        Ok(value.and_then(|v| v.trim().parse().ok()))
    }
}

#[async_trait]
impl Ledger for SqliteStore {
    async fn award_xp(&self, user: UserId, amount: i64) -> Result<(), StoreError> {
        self.with_conn("user_xp", |conn| add_xp(conn, user, amount))
    }

    async fn increment_stat(&self, user: UserId, stat: &str, amount: i64) -> Result<(), StoreError> {
        self.with_conn("user_stats", |conn| add_stat(conn, user, stat, amount))
    }

    async fn personal_best(&self, user: UserId) -> Result<Option<f64>, StoreError> {
        self.with_conn("user_records", |conn| {
            conn.query_row(
                "SELECT value FROM user_records WHERE user = ?1 AND record = ?2",
                params![user as i64, WPM_RECORD],
                |row| row.get(0),
            )
            .optional()
        })
    }

    async fn set_personal_best(&self, user: UserId, wpm: f64) -> Result<(), StoreError> {
        self.with_conn("user_records", |conn| {
            conn.execute(
                "INSERT INTO user_records (user, record, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT (user, record) DO UPDATE SET value = excluded.value",
                params![user as i64, WPM_RECORD, wpm],
            )?;
            Ok(())
        })
    }
}

#[async_trait]
impl Rewards for SqliteStore {
    async fn award_xp(&self, user: u64, amount: i64) -> Result<(), StoreError> {
        self.with_conn("user_xp", |conn| add_xp(conn, user, amount))
    }

    async fn increment_stat(&self, user: u64, stat: &str, amount: i64) -> Result<(), StoreError> {
        self.with_conn("user_stats", |conn| add_stat(conn, user, stat, amount))
    }
}

#[async_trait]
impl Settings for SqliteStore {
    async fn end_delay_minutes(&self, guild: GuildId) -> Result<Option<u32>, StoreError> {
        self.numeric_setting(
            "guild_settings",
            "SELECT value FROM guild_settings WHERE guild = ?1 AND setting = ?2",
            guild,
            guild_setting::SPRINT_DELAY_END,
        )
    }

    async fn max_wpm(&self, user: UserId) -> Result<Option<u32>, StoreError> {
        self.numeric_setting(
            "user_settings",
            "SELECT value FROM user_settings WHERE user = ?1 AND setting = ?2",
            user,
            setting::MAX_WPM,
        )
    }

    async fn timezone(&self, user: UserId) -> Result<Option<String>, StoreError> {
        self.with_conn("user_settings", |conn| user_setting(conn, user, setting::TIMEZONE))
    }

    async fn sprint_subscribers(&self, guild: GuildId) -> Result<Vec<UserId>, StoreError> {
        self.with_conn("sprint_subscribers", |conn| {
            let mut stmt =
                conn.prepare("SELECT user FROM sprint_subscribers WHERE guild = ?1 ORDER BY user")?;
            let users = stmt
                .query_map(params![guild as i64], |row| row.get::<_, i64>(0).map(|u| u as u64))?
                .collect::<rusqlite::Result<Vec<_>>>();
            users
        })
    }

    async fn set_sprint_notify(&self, guild: GuildId, user: UserId, enabled: bool) -> Result<(), StoreError> {
        self.with_conn("sprint_subscribers", |conn| {
            if enabled {
                conn.execute(
                    "INSERT OR IGNORE INTO sprint_subscribers (guild, user) VALUES (?1, ?2)",
                    params![guild as i64, user as i64],
                )?;
            } else {
                conn.execute(
                    "DELETE FROM sprint_subscribers WHERE guild = ?1 AND user = ?2",
                    params![guild as i64, user as i64],
                )?;
            }
            Ok(())
        })
    }
}

#[async_trait]
impl Timezones for SqliteStore {
    async fn timezone(&self, user: u64) -> Result<Option<String>, StoreError> {
        self.with_conn("user_settings", |conn| user_setting(conn, user, setting::TIMEZONE))
    }
}
