use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single daily task. Tasks are partitioned by `(user_id, date)` and
/// ordered by `created_at` within a partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub user_id: String,
    pub text: String,
    pub done: bool,
    /// `YYYY-MM-DD`, local-midnight semantics.
    pub date: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Web,
    Ios,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Ios => "ios",
        }
    }

    /// Parse a stored platform tag. Unknown tags are treated as web.
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "ios" => Self::Ios,
            _ => Self::Web,
        }
    }
}

/// Push token registered for a user. One per user; a newer registration
/// replaces the old one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRegistration {
    pub user_id: String,
    pub token: String,
    pub platform: Platform,
    pub registered_at: DateTime<Utc>,
    pub user_agent: Option<String>,
}
