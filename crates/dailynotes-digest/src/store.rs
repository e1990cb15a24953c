use std::sync::Arc;

use async_trait::async_trait;

use dailynotes_db::Database;
use dailynotes_db::models::TaskRow;
use dailynotes_types::models::Task;

use crate::ports::{DeviceRegistry, Registration, StoreError, TaskStore};

/// Task store and device registry backed by the SQLite database.
/// Queries run on the blocking pool.
#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Database>,
}

impl SqliteStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TaskStore for SqliteStore {
    async fn completed_tasks(&self, user_id: &str, date: &str) -> Result<Vec<Task>, StoreError> {
        let db = self.db.clone();
        let uid = user_id.to_string();
        let date = date.to_string();

        let tasks = tokio::task::spawn_blocking(move || {
            db.get_completed_tasks(&uid, &date)?
                .into_iter()
                .map(TaskRow::into_task)
                .collect::<anyhow::Result<Vec<_>>>()
        })
        .await??;

        Ok(tasks)
    }
}

#[async_trait]
impl DeviceRegistry for SqliteStore {
    async fn list_registrations(&self) -> Result<Vec<Registration>, StoreError> {
        let db = self.db.clone();

        let rows = tokio::task::spawn_blocking(move || db.list_registrations()).await??;

        Ok(rows
            .into_iter()
            .map(|row| Registration {
                user_id: row.user_id,
                token: row.token,
            })
            .collect())
    }
}
