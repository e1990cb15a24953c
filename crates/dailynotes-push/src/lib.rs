//! Push notification dispatch.
//!
//! [`Notifier`] is the single capability the digest job depends on. Two
//! implementations ship here: [`FcmNotifier`] talks to the Firebase Cloud
//! Messaging HTTP v1 API, [`LogNotifier`] only logs and is used when no
//! Firebase credentials are configured.

pub mod credentials;
pub mod fcm;
pub mod message;

use async_trait::async_trait;
use tracing::info;

pub use credentials::ServiceAccount;
pub use fcm::FcmNotifier;
pub use message::PushMessage;

/// Why a single send did not go through. Never retried by this crate.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("invalid device token: {0}")]
    InvalidToken(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider rejected message ({status}): {message}")]
    Provider { status: u16, message: String },

    #[error("provider authentication failed: {0}")]
    Auth(String),
}

/// Sends one push message to one device token.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &PushMessage) -> Result<(), DispatchError>;
}

/// Development notifier: validates the message and logs it.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &PushMessage) -> Result<(), DispatchError> {
        message.validate()?;
        info!(
            title = %message.title,
            body = %message.body,
            "Push delivery disabled, would send notification"
        );
        Ok(())
    }
}
