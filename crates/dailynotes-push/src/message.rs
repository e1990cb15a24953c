use std::collections::BTreeMap;

use serde::Serialize;

use crate::DispatchError;

/// One notification addressed to one device token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushMessage {
    pub token: String,
    pub title: String,
    pub body: String,
    /// Auxiliary string map delivered to the client, e.g. a `url` for routing.
    pub data: BTreeMap<String, String>,
}

impl PushMessage {
    pub fn new(token: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            title: title.into(),
            body: body.into(),
            data: BTreeMap::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Reject messages that can never be delivered, before any I/O.
    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.token.trim().is_empty() {
            return Err(DispatchError::InvalidToken("token is empty".into()));
        }
        Ok(())
    }
}
