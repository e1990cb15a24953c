use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS tasks (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL,
            text        TEXT NOT NULL,
            done        INTEGER NOT NULL DEFAULT 0,
            date        TEXT NOT NULL,
            created_at  INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_user_date
            ON tasks(user_id, date, created_at);

        CREATE TABLE IF NOT EXISTS device_registrations (
            user_id         TEXT PRIMARY KEY,
            token           TEXT NOT NULL,
            platform        TEXT NOT NULL DEFAULT 'web',
            user_agent      TEXT,
            registered_at   TEXT NOT NULL
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
