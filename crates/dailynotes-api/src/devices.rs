use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use tracing::{info, warn};

use dailynotes_db::models::RegistrationRow;
use dailynotes_types::api::{Claims, RegisterDeviceRequest};
use dailynotes_types::models::DeviceRegistration;

use crate::state::{AppState, with_db};

const MAX_TOKEN_LEN: usize = 4096;

fn to_registration(row: RegistrationRow) -> Result<DeviceRegistration, StatusCode> {
    row.into_registration().map_err(|e| {
        warn!("{:#}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// PUT /devices — register the caller's push token, replacing any earlier one.
pub async fn register_device(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    Json(req): Json<RegisterDeviceRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let token = req.token.trim().to_string();
    if token.is_empty() || token.len() > MAX_TOKEN_LEN {
        return Err(StatusCode::BAD_REQUEST);
    }

    let platform = req.platform.unwrap_or_default();
    let user_agent = req.user_agent.or_else(|| {
        headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    });

    let user_id = claims.sub.clone();
    let row = with_db(&state, move |db| {
        db.upsert_registration(&user_id, &token, platform.as_str(), user_agent.as_deref())
    })
    .await?;

    info!("Device registered for {} ({})", claims.sub, platform.as_str());
    Ok(Json(to_registration(row)?))
}

/// GET /devices/me — the caller's current registration.
pub async fn get_my_device(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let row = with_db(&state, move |db| db.get_registration(&claims.sub))
        .await?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(to_registration(row)?))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;

    use dailynotes_types::models::{DeviceRegistration, Platform};

    use crate::test_support::{app, bearer, empty_request, json_request, send};

    #[tokio::test]
    async fn register_then_fetch() {
        let app = app();
        let alice = bearer("alice");

        let req = empty_request("GET", "/devices/me", Some(&alice));
        assert_eq!(send(&app.router, req).await.0, StatusCode::NOT_FOUND);

        let req = json_request(
            "PUT",
            "/devices",
            Some(&alice),
            json!({ "token": "fcm-1", "platform": "ios", "user_agent": "Safari" }),
        );
        let (status, body) = send(&app.router, req).await;
        assert_eq!(status, StatusCode::OK);
        let reg: DeviceRegistration = serde_json::from_str(&body).unwrap();
        assert_eq!(reg.platform, Platform::Ios);
        assert_eq!(reg.user_agent.as_deref(), Some("Safari"));

        let req = empty_request("GET", "/devices/me", Some(&alice));
        let (status, body) = send(&app.router, req).await;
        assert_eq!(status, StatusCode::OK);
        let fetched: DeviceRegistration = serde_json::from_str(&body).unwrap();
        assert_eq!(fetched.token, "fcm-1");
    }

    #[tokio::test]
    async fn newer_registration_replaces_older() {
        let app = app();
        let alice = bearer("alice");

        for token in ["fcm-old", "fcm-new"] {
            let req = json_request("PUT", "/devices", Some(&alice), json!({ "token": token }));
            assert_eq!(send(&app.router, req).await.0, StatusCode::OK);
        }

        let rows = app.db.list_registrations().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].token, "fcm-new");
        assert_eq!(rows[0].platform, "web");
    }

    #[tokio::test]
    async fn user_agent_header_is_the_fallback() {
        let app = app();
        let req = Request::builder()
            .method("PUT")
            .uri("/devices")
            .header("authorization", bearer("alice"))
            .header("content-type", "application/json")
            .header("user-agent", "Mozilla/5.0")
            .body(Body::from(json!({ "token": "fcm-1" }).to_string()))
            .unwrap();

        let (status, body) = send(&app.router, req).await;
        assert_eq!(status, StatusCode::OK);
        let reg: DeviceRegistration = serde_json::from_str(&body).unwrap();
        assert_eq!(reg.user_agent.as_deref(), Some("Mozilla/5.0"));
    }

    #[tokio::test]
    async fn empty_token_is_rejected() {
        let app = app();
        let req = json_request("PUT", "/devices", Some(&bearer("alice")), json!({ "token": " " }));
        assert_eq!(send(&app.router, req).await.0, StatusCode::BAD_REQUEST);
    }
}
