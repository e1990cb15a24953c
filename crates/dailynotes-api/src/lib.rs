pub mod devices;
pub mod digest;
pub mod middleware;
pub mod state;
pub mod tasks;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, patch, put},
};

pub use state::{AppState, AppStateInner};

/// All routes. Cross-cutting layers (CORS, tracing) are added by the server.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route(
            "/sendDailyNotifications",
            get(digest::send_daily_notifications).post(digest::send_daily_notifications),
        )
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route("/tasks/{task_id}", patch(tasks::update_task).delete(tasks::delete_task))
        .route("/devices", put(devices::register_device))
        .route("/devices/me", get(devices::get_my_device))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}

/// GET /health — liveness check (no auth).
pub async fn health() -> &'static str {
    "ok"
}
