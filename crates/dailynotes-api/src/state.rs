use std::sync::Arc;

use axum::http::StatusCode;
use tracing::error;

use dailynotes_db::Database;
use dailynotes_digest::DigestJob;

use crate::digest::NotifySecret;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub jwt_secret: String,
    pub notify_secret: NotifySecret,
    pub digest: Arc<DigestJob>,
}

/// Run a blocking DB call off the async runtime, mapping any failure to 500.
pub(crate) async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, StatusCode>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = state.db.clone();
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("DB error: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}
