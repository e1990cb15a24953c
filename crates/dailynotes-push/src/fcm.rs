//! Firebase Cloud Messaging HTTP v1 client.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::credentials::ServiceAccount;
use crate::message::PushMessage;
use crate::{DispatchError, Notifier};

pub const DEFAULT_BASE_URL: &str = "https://fcm.googleapis.com";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Upper bound on any single request to FCM or the token endpoint.
pub const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Access tokens are refreshed this long before they expire.
const REFRESH_MARGIN_SECS: i64 = 60;

/// FCM error codes that mean the token itself is unusable.
const TOKEN_ERROR_CODES: &[&str] = &["UNREGISTERED", "INVALID_ARGUMENT", "SENDER_ID_MISMATCH"];

enum TokenSource {
    ServiceAccount {
        account: ServiceAccount,
        token_url: String,
    },
    Static(String),
}

struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

pub struct FcmNotifier {
    http: reqwest::Client,
    project_id: String,
    base_url: String,
    source: TokenSource,
    cached: Mutex<Option<AccessToken>>,
}

impl FcmNotifier {
    pub fn new(account: ServiceAccount) -> Self {
        Self {
            http: http_client(REQUEST_TIMEOUT),
            project_id: account.project_id.clone(),
            base_url: DEFAULT_BASE_URL.to_string(),
            source: TokenSource::ServiceAccount {
                account,
                token_url: TOKEN_URL.to_string(),
            },
            cached: Mutex::new(None),
        }
    }

    /// Client with a fixed, pre-issued access token.
    pub fn with_static_token(project_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            http: http_client(REQUEST_TIMEOUT),
            project_id: project_id.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            source: TokenSource::Static(access_token.into()),
            cached: Mutex::new(None),
        }
    }

    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.http = http_client(timeout);
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn send_url(&self) -> String {
        format!("{}/v1/projects/{}/messages:send", self.base_url, self.project_id)
    }

    async fn access_token(&self) -> Result<String, DispatchError> {
        let (account, token_url) = match &self.source {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::ServiceAccount { account, token_url } => (account, token_url),
        };

        // Held across the exchange so concurrent sends share one refresh.
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > Utc::now() {
                return Ok(token.value.clone());
            }
        }

        let token = self.fetch_token(account, token_url).await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn fetch_token(
        &self,
        account: &ServiceAccount,
        token_url: &str,
    ) -> Result<AccessToken, DispatchError> {
        let now = Utc::now();
        let claims = AssertionClaims {
            iss: &account.client_email,
            scope: MESSAGING_SCOPE,
            aud: token_url,
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        };
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .map_err(|e| DispatchError::Auth(format!("invalid private key: {e}")))?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| DispatchError::Auth(format!("failed to sign assertion: {e}")))?;

        let resp = self
            .http
            .post(token_url)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DispatchError::Auth(format!("token exchange returned {status}: {body}")));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| DispatchError::Auth(format!("malformed token response: {e}")))?;

        debug!("Obtained FCM access token valid for {}s", token.expires_in);
        Ok(AccessToken {
            value: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }
}

#[async_trait]
impl Notifier for FcmNotifier {
    async fn send(&self, message: &PushMessage) -> Result<(), DispatchError> {
        message.validate()?;
        let access_token = self.access_token().await?;

        let payload = json!({
            "message": {
                "token": message.token,
                "notification": {
                    "title": message.title,
                    "body": message.body,
                },
                "data": message.data,
            }
        });

        let resp = self
            .http
            .post(self.send_url())
            .bearer_auth(access_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        let err = classify_failure(status.as_u16(), &body);
        if matches!(err, DispatchError::Auth(_)) {
            // Force a fresh token on the next send.
            self.cached.lock().await.take();
        }
        warn!("FCM send failed with {}: {}", status, err);
        Err(err)
    }
}

fn http_client(timeout: std::time::Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!("Failed to build FCM HTTP client ({}); using defaults", e);
            reqwest::Client::new()
        })
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(rename = "errorCode", default)]
    error_code: Option<String>,
}

/// Map a non-2xx FCM response onto a [`DispatchError`].
pub(crate) fn classify_failure(status: u16, body: &str) -> DispatchError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error);

    let message = parsed
        .as_ref()
        .map(|e| e.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.to_string());

    let token_problem = status == 404
        || parsed.as_ref().is_some_and(|e| {
            TOKEN_ERROR_CODES.contains(&e.status.as_str())
                || e.details
                    .iter()
                    .filter_map(|d| d.error_code.as_deref())
                    .any(|code| TOKEN_ERROR_CODES.contains(&code))
        });

    if token_problem {
        DispatchError::InvalidToken(message)
    } else if status == 401 {
        DispatchError::Auth(message)
    } else {
        DispatchError::Provider { status, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNREGISTERED: &str = r#"{
        "error": {
            "code": 404,
            "message": "Requested entity was not found.",
            "status": "NOT_FOUND",
            "details": [{
                "@type": "type.googleapis.com/google.firebase.fcm.v1.FcmError",
                "errorCode": "UNREGISTERED"
            }]
        }
    }"#;

    #[test]
    fn unregistered_token_is_invalid_token() {
        let err = classify_failure(404, UNREGISTERED);
        match err {
            DispatchError::InvalidToken(msg) => assert_eq!(msg, "Requested entity was not found."),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn invalid_argument_is_invalid_token() {
        let body = r#"{"error":{"code":400,"message":"The registration token is not a valid FCM registration token","status":"INVALID_ARGUMENT"}}"#;
        assert!(matches!(classify_failure(400, body), DispatchError::InvalidToken(_)));
    }

    #[test]
    fn server_error_is_provider_error() {
        let err = classify_failure(503, "upstream unavailable");
        match err {
            DispatchError::Provider { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "upstream unavailable");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn unresponsive_server_times_out_as_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _hold = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        });

        let client = FcmNotifier::with_static_token("demo", "test-token")
            .with_base_url(format!("http://{addr}"))
            .with_timeout(std::time::Duration::from_millis(200));

        let started = std::time::Instant::now();
        let err = client
            .send(&PushMessage::new("device-1", "t", "b"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Transport(_)));
        assert!(started.elapsed() < std::time::Duration::from_secs(10));
    }

    #[test]
    fn unauthenticated_is_auth_error() {
        let body = r#"{"error":{"code":401,"message":"Request had invalid authentication credentials.","status":"UNAUTHENTICATED"}}"#;
        assert!(matches!(classify_failure(401, body), DispatchError::Auth(_)));
    }

    #[tokio::test]
    async fn sends_message_to_v1_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/projects/demo/messages:send")
            .match_header("authorization", "Bearer test-token")
            .match_body(mockito::Matcher::PartialJson(json!({
                "message": {
                    "token": "device-1",
                    "notification": { "title": "Good Morning!", "body": "Hello" },
                    "data": { "url": "/" }
                }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"name":"projects/demo/messages/1"}"#)
            .create_async()
            .await;

        let client = FcmNotifier::with_static_token("demo", "test-token").with_base_url(server.url());
        let msg = PushMessage::new("device-1", "Good Morning!", "Hello").with_data("url", "/");

        client.send(&msg).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_token_surfaces_as_invalid_token() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/projects/demo/messages:send")
            .with_status(404)
            .with_body(UNREGISTERED)
            .create_async()
            .await;

        let client = FcmNotifier::with_static_token("demo", "test-token").with_base_url(server.url());
        let err = client
            .send(&PushMessage::new("stale-token", "t", "b"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn empty_token_never_hits_the_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/projects/demo/messages:send")
            .expect(0)
            .create_async()
            .await;

        let client = FcmNotifier::with_static_token("demo", "test-token").with_base_url(server.url());
        let err = client.send(&PushMessage::new("", "t", "b")).await.unwrap_err();
        assert!(matches!(err, DispatchError::InvalidToken(_)));
        mock.assert_async().await;
    }
}
