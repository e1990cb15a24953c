//! In-memory fakes of the digest's collaborators, with call counters so
//! tests can assert what was touched.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::anyhow;
use async_trait::async_trait;
use uuid::Uuid;

use dailynotes_push::{DispatchError, Notifier, PushMessage};
use dailynotes_types::models::Task;

use crate::ports::{DeviceRegistry, Registration, StoreError, TaskStore};

#[derive(Default)]
pub struct MemoryTaskStore {
    completed: HashMap<(String, String), Vec<Task>>,
    failing_users: HashSet<String>,
    calls: AtomicUsize,
}

impl MemoryTaskStore {
    pub fn with_completed(mut self, user_id: &str, date: &str, texts: &[&str]) -> Self {
        let tasks = self
            .completed
            .entry((user_id.to_string(), date.to_string()))
            .or_default();
        for text in texts {
            tasks.push(Task {
                id: Uuid::new_v4(),
                user_id: user_id.to_string(),
                text: text.to_string(),
                done: true,
                date: date.to_string(),
                created_at: tasks.len() as i64,
            });
        }
        self
    }

    pub fn failing_for(mut self, user_id: &str) -> Self {
        self.failing_users.insert(user_id.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn completed_tasks(&self, user_id: &str, date: &str) -> Result<Vec<Task>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_users.contains(user_id) {
            return Err(anyhow!("query failed for {user_id}").into());
        }
        Ok(self
            .completed
            .get(&(user_id.to_string(), date.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct MemoryRegistry {
    registrations: Vec<Registration>,
    fail: bool,
    calls: AtomicUsize,
}

impl MemoryRegistry {
    pub fn new(registrations: impl IntoIterator<Item = Registration>) -> Self {
        Self {
            registrations: registrations.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceRegistry for MemoryRegistry {
    async fn list_registrations(&self) -> Result<Vec<Registration>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("registry unavailable").into());
        }
        Ok(self.registrations.clone())
    }
}

/// Records every message it is asked to send. Tokens marked failing are
/// rejected as invalid.
#[derive(Default)]
pub struct RecordingNotifier {
    attempts: Mutex<Vec<PushMessage>>,
    failing_tokens: HashSet<String>,
    calls: AtomicUsize,
}

impl RecordingNotifier {
    pub fn failing_for(mut self, token: &str) -> Self {
        self.failing_tokens.insert(token.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn attempts(&self) -> Vec<PushMessage> {
        self.attempts.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &PushMessage) -> Result<(), DispatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.push(message.clone());
        }
        message.validate()?;
        if self.failing_tokens.contains(&message.token) {
            return Err(DispatchError::InvalidToken("token expired".into()));
        }
        Ok(())
    }
}
