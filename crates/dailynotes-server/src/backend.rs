use std::sync::Arc;

use anyhow::Result;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use dailynotes_db::Database;
use dailynotes_push::{FcmNotifier, LogNotifier, Notifier, ServiceAccount};

use crate::config::Config;

static BACKEND: OnceCell<Backend> = OnceCell::const_new();

/// Process-wide backend clients. Built once on first use and shared by the
/// scheduler and the HTTP routes until the process exits.
pub struct Backend {
    pub db: Arc<Database>,
    pub notifier: Arc<dyn Notifier>,
}

impl Backend {
    /// Concurrent callers wait for the one initialization in flight.
    pub async fn get_or_init(config: &Config) -> Result<&'static Backend> {
        BACKEND
            .get_or_try_init(|| async { Self::connect(config) })
            .await
    }

    fn connect(config: &Config) -> Result<Self> {
        let db = Arc::new(Database::open(&config.db_path)?);

        let notifier: Arc<dyn Notifier> = match ServiceAccount::from_env() {
            Some(account) => {
                info!(
                    "Push delivery via FCM for project {} as {}",
                    account.project_id, account.client_email
                );
                let mut fcm = FcmNotifier::new(account);
                if let Some(base_url) = &config.fcm_base_url {
                    fcm = fcm.with_base_url(base_url);
                }
                Arc::new(fcm)
            }
            None => {
                warn!("FIREBASE_* credentials not set; notifications will only be logged");
                Arc::new(LogNotifier)
            }
        };

        Ok(Self { db, notifier })
    }
}
