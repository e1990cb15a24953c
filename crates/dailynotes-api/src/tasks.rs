use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::NaiveDate;
use tracing::{info, warn};
use uuid::Uuid;

use dailynotes_db::models::TaskRow;
use dailynotes_types::DATE_FORMAT;
use dailynotes_types::api::{Claims, CreateTaskRequest, TaskQuery, UpdateTaskRequest};
use dailynotes_types::models::Task;

use crate::state::{AppState, with_db};

const MAX_TASK_TEXT: usize = 500;

/// Dates must be canonical `YYYY-MM-DD`; the digest matches them verbatim.
fn validate_date(date: &str) -> Result<(), StatusCode> {
    let parsed = NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|_| StatusCode::BAD_REQUEST)?;
    if parsed.format(DATE_FORMAT).to_string() != date {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(())
}

fn to_task(row: TaskRow) -> Result<Task, StatusCode> {
    row.into_task().map_err(|e| {
        warn!("{:#}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// GET /tasks?date=YYYY-MM-DD — the caller's tasks for one day, oldest first.
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<TaskQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    validate_date(&query.date)?;

    let rows = with_db(&state, move |db| db.get_tasks(&claims.sub, &query.date)).await?;
    let tasks = rows.into_iter().map(to_task).collect::<Result<Vec<_>, _>>()?;

    Ok(Json(tasks))
}

/// POST /tasks — add a not yet done task.
pub async fn create_task(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    validate_date(&req.date)?;

    let text = req.text.trim().to_string();
    if text.is_empty() || text.chars().count() > MAX_TASK_TEXT {
        return Err(StatusCode::BAD_REQUEST);
    }

    let user_id = claims.sub.clone();
    let row = with_db(&state, move |db| db.insert_task(&user_id, &req.date, &text)).await?;
    let task = to_task(row)?;

    info!("Task {} created by {} for {}", task.id, claims.sub, task.date);
    Ok((StatusCode::CREATED, Json(task)))
}

/// PATCH /tasks/{task_id} — set the completion flag.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let row = with_db(&state, move |db| {
        db.set_task_done(&task_id.to_string(), &claims.sub, req.done)
    })
    .await?
    .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(to_task(row)?))
}

/// DELETE /tasks/{task_id}
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(task_id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    let removed = with_db(&state, move |db| db.delete_task(&task_id.to_string(), &claims.sub)).await?;

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use dailynotes_types::models::Task;

    use super::validate_date;
    use crate::test_support::{app, bearer, empty_request, json_request, send};

    #[test]
    fn dates_must_be_canonical() {
        assert!(validate_date("2024-03-14").is_ok());
        assert!(validate_date("2024-3-14").is_err());
        assert!(validate_date("2024-02-30").is_err());
        assert!(validate_date("14/03/2024").is_err());
        assert!(validate_date("").is_err());
    }

    #[tokio::test]
    async fn requires_bearer_token() {
        let app = app();

        let req = empty_request("GET", "/tasks?date=2024-03-14", None);
        assert_eq!(send(&app.router, req).await.0, StatusCode::UNAUTHORIZED);

        let req = empty_request("GET", "/tasks?date=2024-03-14", Some("Bearer not-a-jwt"));
        assert_eq!(send(&app.router, req).await.0, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_then_list_in_creation_order() {
        let app = app();
        let alice = bearer("alice");

        for text in ["Buy milk", "  Call mom  ", "Walk dog"] {
            let req = json_request(
                "POST",
                "/tasks",
                Some(&alice),
                json!({ "date": "2024-03-14", "text": text }),
            );
            let (status, body) = send(&app.router, req).await;
            assert_eq!(status, StatusCode::CREATED);
            let task: Task = serde_json::from_str(&body).unwrap();
            assert!(!task.done);
            assert_eq!(task.user_id, "alice");
        }

        let req = empty_request("GET", "/tasks?date=2024-03-14", Some(&alice));
        let (status, body) = send(&app.router, req).await;
        assert_eq!(status, StatusCode::OK);
        let tasks: Vec<Task> = serde_json::from_str(&body).unwrap();
        let texts: Vec<&str> = tasks.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["Buy milk", "Call mom", "Walk dog"]);

        // Other users and other days see nothing.
        let req = empty_request("GET", "/tasks?date=2024-03-14", Some(&bearer("bob")));
        assert_eq!(send(&app.router, req).await.1, "[]");
        let req = empty_request("GET", "/tasks?date=2024-03-15", Some(&alice));
        assert_eq!(send(&app.router, req).await.1, "[]");
    }

    #[tokio::test]
    async fn rejects_bad_input() {
        let app = app();
        let alice = bearer("alice");

        let cases = [
            json!({ "date": "2024-3-14", "text": "x" }),
            json!({ "date": "2024-03-14", "text": "   " }),
            json!({ "date": "2024-03-14", "text": "x".repeat(501) }),
        ];
        for body in cases {
            let req = json_request("POST", "/tasks", Some(&alice), body);
            assert_eq!(send(&app.router, req).await.0, StatusCode::BAD_REQUEST);
        }

        let req = empty_request("GET", "/tasks?date=yesterday", Some(&alice));
        assert_eq!(send(&app.router, req).await.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn toggle_and_delete_only_own_tasks() {
        let app = app();
        let alice = bearer("alice");
        let mallory = bearer("mallory");

        let req = json_request(
            "POST",
            "/tasks",
            Some(&alice),
            json!({ "date": "2024-03-14", "text": "Buy milk" }),
        );
        let task: Task = serde_json::from_str(&send(&app.router, req).await.1).unwrap();
        let uri = format!("/tasks/{}", task.id);

        let req = json_request("PATCH", &uri, Some(&mallory), json!({ "done": true }));
        assert_eq!(send(&app.router, req).await.0, StatusCode::NOT_FOUND);
        let req = empty_request("DELETE", &uri, Some(&mallory));
        assert_eq!(send(&app.router, req).await.0, StatusCode::NOT_FOUND);

        let req = json_request("PATCH", &uri, Some(&alice), json!({ "done": true }));
        let (status, body) = send(&app.router, req).await;
        assert_eq!(status, StatusCode::OK);
        let updated: Task = serde_json::from_str(&body).unwrap();
        assert!(updated.done);
        assert_eq!(updated.id, task.id);

        let req = empty_request("DELETE", &uri, Some(&alice));
        assert_eq!(send(&app.router, req).await.0, StatusCode::NO_CONTENT);
        let req = empty_request("DELETE", &uri, Some(&alice));
        assert_eq!(send(&app.router, req).await.0, StatusCode::NOT_FOUND);
    }
}
