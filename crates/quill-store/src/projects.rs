//! Writing projects.

use async_trait::async_trait;
use quill_scheduler::StoreError;
use quill_sprint::ports::{Project, Projects};
use quill_sprint::{ProjectId, UserId};
use rusqlite::{OptionalExtension, Row, params};

use crate::SqliteStore;

const PROJECT_COLUMNS: &str = "id, user, shortname, name, words";

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        owner: row.get::<_, i64>(1)? as u64,
        shortname: row.get(2)?,
        name: row.get(3)?,
        words: row.get(4)?,
    })
}

impl SqliteStore {
    /// Create a project. Shortnames are unique per owner and stored lowercase.
    pub fn create_project(&self, owner: UserId, shortname: &str, name: &str) -> Result<Project, StoreError> {
        self.with_conn("projects", |conn| {
            conn.execute(
                "INSERT INTO projects (user, shortname, name, words) VALUES (?1, ?2, ?3, 0)",
                params![owner as i64, shortname.to_lowercase(), name],
            )?;
            conn.query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
                params![conn.last_insert_rowid()],
                project_from_row,
            )
        })
    }
}

#[async_trait]
impl Projects for SqliteStore {
    async fn find_by_shortname(
        &self,
        owner: UserId,
        shortname: &str,
    ) -> Result<Option<Project>, StoreError> {
        self.with_conn("projects", |conn| {
            conn.query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE user = ?1 AND shortname = ?2"),
                params![owner as i64, shortname.to_lowercase()],
                project_from_row,
            )
            .optional()
        })
    }

    async fn project(&self, id: ProjectId) -> Result<Option<Project>, StoreError> {
        self.with_conn("projects", |conn| {
            conn.query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
                params![id],
                project_from_row,
            )
            .optional()
        })
    }

    async fn credit_words(&self, id: ProjectId, words: i64) -> Result<(), StoreError> {
        self.with_conn("projects", |conn| {
            conn.execute(
                "UPDATE projects SET words = MAX(0, words + ?2) WHERE id = ?1",
                params![id, words],
            )?;
            Ok(())
        })
    }
}
