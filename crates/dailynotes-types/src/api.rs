use serde::{Deserialize, Serialize};

use crate::models::Platform;

// -- Auth --

/// Bearer token claims issued by the identity provider. Only the subject is
/// used; it is the owning user id for tasks and device registrations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

// -- Tasks --

#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    pub date: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTaskRequest {
    pub date: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateTaskRequest {
    pub done: bool,
}

// -- Devices --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterDeviceRequest {
    pub token: String,
    #[serde(default)]
    pub platform: Option<Platform>,
    #[serde(default)]
    pub user_agent: Option<String>,
}
