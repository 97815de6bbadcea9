//! Sprint and participant storage.

use async_trait::async_trait;
use quill_scheduler::StoreError;
use quill_sprint::ports::SprintStore;
use quill_sprint::{NewSprint, Participant, ParticipationKind, Sprint, UserId};
use rusqlite::{OptionalExtension, Row, params};

use crate::{SqliteStore, bad_value};

const SPRINT_COLUMNS: &str =
    "id, guild, channel, start_at, end_at, end_reference, length, creator, created, completed";

const PARTICIPANT_COLUMNS: &str =
    "sprint, user, starting_wc, current_wc, ending_wc, timejoined, sprint_type, project";

fn sprint_from_row(row: &Row<'_>) -> rusqlite::Result<Sprint> {
    Ok(Sprint {
        id: row.get(0)?,
        guild: row.get::<_, i64>(1)? as u64,
        channel: row.get::<_, i64>(2)? as u64,
        start: row.get(3)?,
        end: row.get(4)?,
        end_reference: row.get(5)?,
        length: row.get(6)?,
        creator: row.get::<_, i64>(7)? as u64,
        created: row.get(8)?,
        completed: row.get(9)?,
    })
}

fn participant_from_row(row: &Row<'_>) -> rusqlite::Result<Participant> {
    let kind: String = row.get(6)?;
    Ok(Participant {
        sprint_id: row.get(0)?,
        user: row.get::<_, i64>(1)? as u64,
        starting: row.get(2)?,
        current: row.get(3)?,
        ending: row.get(4)?,
        joined_at: row.get(5)?,
        kind: ParticipationKind::parse(&kind)
            .ok_or_else(|| bad_value(6, format!("unknown sprint type {kind:?}")))?,
        project: row.get(7)?,
    })
}

#[async_trait]
impl SprintStore for SqliteStore {
    async fn active_sprint(&self, guild: u64) -> Result<Option<Sprint>, StoreError> {
        self.with_conn("sprints", |conn| {
            conn.query_row(
                &format!("SELECT {SPRINT_COLUMNS} FROM sprints WHERE guild = ?1 AND completed = 0"),
                params![guild as i64],
                sprint_from_row,
            )
            .optional()
        })
    }

    async fn sprint(&self, id: i64) -> Result<Option<Sprint>, StoreError> {
        self.with_conn("sprints", |conn| {
            conn.query_row(
                &format!("SELECT {SPRINT_COLUMNS} FROM sprints WHERE id = ?1"),
                params![id],
                sprint_from_row,
            )
            .optional()
        })
    }

    async fn insert_sprint(&self, sprint: &NewSprint) -> Result<Option<Sprint>, StoreError> {
        self.with_conn("sprints", |conn| {
            // The partial unique index turns a second active sprint into a no-op
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO sprints
                 (guild, channel, start_at, end_at, end_reference, length, creator, created, completed)
                 VALUES (?1, ?2, ?3, ?4, ?4, ?5, ?6, ?7, 0)",
                params![
                    sprint.guild as i64,
                    sprint.channel as i64,
                    sprint.start,
                    sprint.end,
                    sprint.length,
                    sprint.creator as i64,
                    sprint.created,
                ],
            )?;
            if inserted == 0 {
                return Ok(None);
            }

            conn.query_row(
                &format!("SELECT {SPRINT_COLUMNS} FROM sprints WHERE id = ?1"),
                params![conn.last_insert_rowid()],
                sprint_from_row,
            )
            .map(Some)
        })
    }

    async fn mark_ended(&self, id: i64, at: i64) -> Result<(), StoreError> {
        self.with_conn("sprints", |conn| {
            conn.execute(
                "UPDATE sprints SET end_at = MIN(end_at, ?2) WHERE id = ?1",
                params![id, at],
            )?;
            Ok(())
        })
    }

    async fn set_end_reference(&self, id: i64, at: i64) -> Result<(), StoreError> {
        self.with_conn("sprints", |conn| {
            conn.execute(
                "UPDATE sprints SET end_reference = ?2 WHERE id = ?1",
                params![id, at],
            )?;
            Ok(())
        })
    }

    async fn mark_completed(&self, id: i64, at: i64) -> Result<bool, StoreError> {
        self.with_conn("sprints", |conn| {
            let changed = conn.execute(
                "UPDATE sprints SET completed = ?2 WHERE id = ?1 AND completed = 0",
                params![id, at],
            )?;
            Ok(changed == 1)
        })
    }

    async fn delete_sprint(&self, id: i64) -> Result<(), StoreError> {
        self.with_conn("sprints", |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM sprint_users WHERE sprint = ?1", params![id])?;
            tx.execute("DELETE FROM sprints WHERE id = ?1", params![id])?;
            tx.commit()
        })
    }

    async fn participants(&self, sprint_id: i64) -> Result<Vec<Participant>, StoreError> {
        self.with_conn("sprint_users", |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PARTICIPANT_COLUMNS} FROM sprint_users WHERE sprint = ?1 ORDER BY id"
            ))?;
            let participants = stmt
                .query_map(params![sprint_id], participant_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>();
            participants
        })
    }

    async fn participant(
        &self,
        sprint_id: i64,
        user: UserId,
    ) -> Result<Option<Participant>, StoreError> {
        self.with_conn("sprint_users", |conn| {
            conn.query_row(
                &format!(
                    "SELECT {PARTICIPANT_COLUMNS} FROM sprint_users WHERE sprint = ?1 AND user = ?2"
                ),
                params![sprint_id, user as i64],
                participant_from_row,
            )
            .optional()
        })
    }

    async fn save_participant(&self, p: &Participant) -> Result<(), StoreError> {
        self.with_conn("sprint_users", |conn| {
            conn.execute(
                "INSERT INTO sprint_users
                 (sprint, user, starting_wc, current_wc, ending_wc, timejoined, sprint_type, project)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT (sprint, user) DO UPDATE SET
                     starting_wc = excluded.starting_wc,
                     current_wc = excluded.current_wc,
                     ending_wc = excluded.ending_wc,
                     timejoined = excluded.timejoined,
                     sprint_type = excluded.sprint_type,
                     project = excluded.project",
                params![
                    p.sprint_id,
                    p.user as i64,
                    p.starting,
                    p.current,
                    p.ending,
                    p.joined_at,
                    p.kind.as_str(),
                    p.project,
                ],
            )?;
            Ok(())
        })
    }

    async fn remove_participant(&self, sprint_id: i64, user: UserId) -> Result<bool, StoreError> {
        self.with_conn("sprint_users", |conn| {
            let removed = conn.execute(
                "DELETE FROM sprint_users WHERE sprint = ?1 AND user = ?2",
                params![sprint_id, user as i64],
            )?;
            Ok(removed > 0)
        })
    }

    async fn most_recent_participation(
        &self,
        user: UserId,
        excluding: i64,
    ) -> Result<Option<Participant>, StoreError> {
        self.with_conn("sprint_users", |conn| {
            conn.query_row(
                &format!(
                    "SELECT {PARTICIPANT_COLUMNS} FROM sprint_users
                     WHERE user = ?1 AND sprint != ?2 ORDER BY id DESC LIMIT 1"
                ),
                params![user as i64, excluding],
                participant_from_row,
            )
            .optional()
        })
    }
}
