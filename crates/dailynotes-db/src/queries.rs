use crate::models::{RegistrationRow, TaskRow};
use crate::Database;
use anyhow::Result;
use rusqlite::{Connection, Row};
use uuid::Uuid;

const TASK_COLUMNS: &str = "id, user_id, text, done, date, created_at";
const REGISTRATION_COLUMNS: &str = "user_id, token, platform, user_agent, registered_at";

impl Database {
    // -- Tasks --

    /// Insert a new, not yet done task and return the stored row.
    pub fn insert_task(&self, user_id: &str, date: &str, text: &str) -> Result<TaskRow> {
        let row = TaskRow {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            text: text.to_string(),
            done: false,
            date: date.to_string(),
            created_at: chrono::Utc::now().timestamp_millis(),
        };

        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO tasks (id, user_id, text, done, date, created_at) VALUES (?1, ?2, ?3, 0, ?4, ?5)",
                rusqlite::params![row.id, row.user_id, row.text, row.date, row.created_at],
            )?;
            Ok(())
        })?;

        Ok(row)
    }

    /// All tasks of a user for one date, in creation order.
    pub fn get_tasks(&self, user_id: &str, date: &str) -> Result<Vec<TaskRow>> {
        self.with_conn(|conn| query_tasks(conn, user_id, date, false))
    }

    /// Completed tasks of a user for one date, in creation order.
    pub fn get_completed_tasks(&self, user_id: &str, date: &str) -> Result<Vec<TaskRow>> {
        self.with_conn(|conn| query_tasks(conn, user_id, date, true))
    }

    /// Set the completion flag on a task owned by `user_id`.
    /// Returns `None` when no such task exists for that owner.
    pub fn set_task_done(&self, id: &str, user_id: &str, done: bool) -> Result<Option<TaskRow>> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE tasks SET done = ?1 WHERE id = ?2 AND user_id = ?3",
                rusqlite::params![done, id, user_id],
            )?;
            if changed == 0 {
                return Ok(None);
            }

            let row = conn.query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                [id],
                task_row,
            )?;
            Ok(Some(row))
        })
    }

    /// Delete a task owned by `user_id`. Returns whether a row was removed.
    pub fn delete_task(&self, id: &str, user_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
                [id, user_id],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Device registrations --

    /// Store the push token for a user, replacing any earlier registration.
    pub fn upsert_registration(
        &self,
        user_id: &str,
        token: &str,
        platform: &str,
        user_agent: Option<&str>,
    ) -> Result<RegistrationRow> {
        let registered_at = chrono::Utc::now().to_rfc3339();

        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO device_registrations (user_id, token, platform, user_agent, registered_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(user_id) DO UPDATE SET
                    token = excluded.token,
                    platform = excluded.platform,
                    user_agent = excluded.user_agent,
                    registered_at = excluded.registered_at",
                rusqlite::params![user_id, token, platform, user_agent, registered_at],
            )?;
            Ok(())
        })?;

        Ok(RegistrationRow {
            user_id: user_id.to_string(),
            token: token.to_string(),
            platform: platform.to_string(),
            user_agent: user_agent.map(str::to_string),
            registered_at,
        })
    }

    pub fn get_registration(&self, user_id: &str) -> Result<Option<RegistrationRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {REGISTRATION_COLUMNS} FROM device_registrations WHERE user_id = ?1"),
                [user_id],
                registration_row,
            )
            .optional()
        })
    }

    /// Full scan of the registry, ordered by user id.
    pub fn list_registrations(&self) -> Result<Vec<RegistrationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REGISTRATION_COLUMNS} FROM device_registrations ORDER BY user_id"
            ))?;
            let rows = stmt
                .query_map([], registration_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_tasks(conn: &Connection, user_id: &str, date: &str, done_only: bool) -> Result<Vec<TaskRow>> {
    let filter = if done_only { " AND done = 1" } else { "" };
    let mut stmt = conn.prepare(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks
         WHERE user_id = ?1 AND date = ?2{filter}
         ORDER BY created_at ASC, rowid ASC"
    ))?;

    let rows = stmt
        .query_map([user_id, date], task_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn task_row(row: &Row<'_>) -> rusqlite::Result<TaskRow> {
    Ok(TaskRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        text: row.get(2)?,
        done: row.get(3)?,
        date: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn registration_row(row: &Row<'_>) -> rusqlite::Result<RegistrationRow> {
    Ok(RegistrationRow {
        user_id: row.get(0)?,
        token: row.get(1)?,
        platform: row.get(2)?,
        user_agent: row.get(3)?,
        registered_at: row.get(4)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
