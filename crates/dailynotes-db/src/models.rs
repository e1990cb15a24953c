//! Database row types — these map directly to SQLite rows.
//! Distinct from dailynotes-types models to keep the DB layer independent.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use dailynotes_types::models::{DeviceRegistration, Platform, Task};

pub struct TaskRow {
    pub id: String,
    pub user_id: String,
    pub text: String,
    pub done: bool,
    pub date: String,
    pub created_at: i64,
}

impl TaskRow {
    pub fn into_task(self) -> Result<Task> {
        let id = self
            .id
            .parse()
            .with_context(|| format!("corrupt task id '{}'", self.id))?;
        Ok(Task {
            id,
            user_id: self.user_id,
            text: self.text,
            done: self.done,
            date: self.date,
            created_at: self.created_at,
        })
    }
}

pub struct RegistrationRow {
    pub user_id: String,
    pub token: String,
    pub platform: String,
    pub user_agent: Option<String>,
    pub registered_at: String,
}

impl RegistrationRow {
    pub fn into_registration(self) -> Result<DeviceRegistration> {
        let registered_at = DateTime::parse_from_rfc3339(&self.registered_at)
            .with_context(|| {
                format!(
                    "corrupt registered_at '{}' for user '{}'",
                    self.registered_at, self.user_id
                )
            })?
            .with_timezone(&Utc);
        Ok(DeviceRegistration {
            platform: Platform::from_tag(&self.platform),
            user_id: self.user_id,
            token: self.token,
            user_agent: self.user_agent,
            registered_at,
        })
    }
}
