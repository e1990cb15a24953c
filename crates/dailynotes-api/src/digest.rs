use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::error;

use dailynotes_digest::{DigestError, DigestRun, TriggerContext};

use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Fallback for local development only.
pub const DEFAULT_NOTIFY_SECRET: &str = "changeme123";

/// Both sides are MACed under this key so the comparison is constant time
/// regardless of input length.
const COMPARE_KEY: &[u8] = b"dailynotes/notify-secret";

/// Shared secret guarding the on-demand digest trigger.
#[derive(Clone)]
pub struct NotifySecret {
    tag: Vec<u8>,
    is_default: bool,
}

impl NotifySecret {
    pub fn new(secret: &str) -> Self {
        Self {
            tag: mac(secret.as_bytes()),
            is_default: secret == DEFAULT_NOTIFY_SECRET,
        }
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// Accepts the secret as-is or as `Bearer <secret>`.
    pub fn matches(&self, presented: &str) -> bool {
        let exact = self.verifies(presented);
        let bearer = presented
            .strip_prefix("Bearer ")
            .is_some_and(|stripped| self.verifies(stripped));
        exact | bearer
    }

    fn verifies(&self, candidate: &str) -> bool {
        let Ok(mut mac) = HmacSha256::new_from_slice(COMPARE_KEY) else {
            return false;
        };
        mac.update(candidate.as_bytes());
        mac.verify_slice(&self.tag).is_ok()
    }
}

impl Default for NotifySecret {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFY_SECRET)
    }
}

fn mac(input: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length; an empty tag would never verify.
    let Ok(mut mac) = HmacSha256::new_from_slice(COMPARE_KEY) else {
        return Vec::new();
    };
    mac.update(input);
    mac.finalize().into_bytes().to_vec()
}

/// On-demand trigger: authenticates with the shared secret and answers in
/// plain text. Callers only ever see the success count.
pub struct HttpTrigger<'a> {
    presented: Option<&'a str>,
    secret: &'a NotifySecret,
}

impl TriggerContext for HttpTrigger<'_> {
    type Response = (StatusCode, String);

    fn authorize(&self) -> Result<(), DigestError> {
        match self.presented {
            Some(presented) if self.secret.matches(presented) => Ok(()),
            _ => Err(DigestError::Unauthorized),
        }
    }

    fn respond(&self, outcome: Result<DigestRun, DigestError>) -> Self::Response {
        match outcome {
            Ok(run) => (
                StatusCode::OK,
                format!("Notifications sent to {} users.", run.sent),
            ),
            Err(DigestError::Unauthorized) => {
                (StatusCode::FORBIDDEN, "Forbidden: Invalid secret".to_string())
            }
            Err(e) => {
                error!("On-demand digest failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to send notifications.".to_string(),
                )
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SecretQuery {
    pub secret: Option<String>,
}

/// GET|POST /sendDailyNotifications — run the daily digest now.
///
/// The secret comes from a non-empty `Authorization` header, otherwise from
/// the `secret` query parameter.
pub async fn send_daily_notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SecretQuery>,
) -> impl IntoResponse {
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .or(query.secret.as_deref());

    let trigger = HttpTrigger {
        presented,
        secret: &state.notify_secret,
    };
    state.digest.trigger(&trigger, chrono::Utc::now()).await
}
