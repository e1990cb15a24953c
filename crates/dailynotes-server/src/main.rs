mod backend;
mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use dailynotes_api::digest::NotifySecret;
use dailynotes_api::{AppState, AppStateInner};
use dailynotes_digest::schedule::run_daily;
use dailynotes_digest::{DailySchedule, DigestJob, DigestSettings, SqliteStore};

use crate::backend::Backend;
use crate::config::{Config, DEFAULT_JWT_SECRET};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "dailynotes=debug,dailynotes_api=debug,dailynotes_digest=debug,dailynotes_push=info,tower_http=debug"
                    .into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    let notify_secret = NotifySecret::new(&config.notify_secret);
    if notify_secret.is_default() {
        warn!("DAILY_NOTIFY_SECRET is unset; using the insecure development default");
    }
    if config.jwt_secret == DEFAULT_JWT_SECRET {
        warn!("DAILYNOTES_JWT_SECRET is unset; using the insecure development default");
    }

    let backend = Backend::get_or_init(&config).await?;

    // One job, shared by both trigger surfaces
    let store = Arc::new(SqliteStore::new(backend.db.clone()));
    let settings = DigestSettings {
        timezone: config.timezone,
        url: config.notification_url.clone(),
        concurrency: config.digest_concurrency,
        ..DigestSettings::default()
    };
    let digest = Arc::new(DigestJob::new(
        store.clone(),
        store,
        backend.notifier.clone(),
        settings,
    ));

    if config.scheduler_enabled {
        let schedule = DailySchedule::new(config.digest_time, config.timezone);
        info!(
            "Daily digest scheduled at {} {}",
            config.digest_time.format("%H:%M"),
            config.timezone.name()
        );
        tokio::spawn(run_daily(digest.clone(), schedule));
    } else {
        info!("Daily digest scheduler disabled");
    }

    let state: AppState = Arc::new(AppStateInner {
        db: backend.db.clone(),
        jwt_secret: config.jwt_secret.clone(),
        notify_secret,
        digest,
    });

    let app = dailynotes_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Dailynotes server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
