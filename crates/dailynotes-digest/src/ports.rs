use async_trait::async_trait;

use dailynotes_types::models::Task;

/// Failure reading from the task store or the device registry.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store query failed: {0:#}")]
    Query(anyhow::Error),

    #[error("store worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        Self::Query(err)
    }
}

/// A user and the push token currently registered for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub user_id: String,
    pub token: String,
}

impl Registration {
    pub fn new(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            token: token.into(),
        }
    }
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Completed tasks of `user_id` dated exactly `date`, oldest first.
    async fn completed_tasks(&self, user_id: &str, date: &str) -> Result<Vec<Task>, StoreError>;
}

#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Every registration, read in one pass.
    async fn list_registrations(&self) -> Result<Vec<Registration>, StoreError>;
}
