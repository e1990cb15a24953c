use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures_util::future;
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use dailynotes_push::{Notifier, PushMessage};

use crate::calendar::target_date;
use crate::message::{DEFAULT_TITLE, DEFAULT_URL, URL_KEY, compose_body};
use crate::ports::{DeviceRegistry, Registration, StoreError, TaskStore};
use crate::trigger::TriggerContext;

pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("unauthorized digest trigger")]
    Unauthorized,

    #[error("failed to list device registrations: {0}")]
    Registry(StoreError),
}

/// Outcome of one run. `sent` never exceeds `total`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigestRun {
    pub target_date: String,
    pub total: usize,
    pub sent: usize,
}

impl DigestRun {
    pub fn failed(&self) -> usize {
        self.total - self.sent
    }
}

#[derive(Debug, Clone)]
pub struct DigestSettings {
    /// Zone in which "yesterday" is computed.
    pub timezone: Tz,
    pub title: String,
    /// Deep-link target delivered in the `url` data field.
    pub url: String,
    /// Registrations processed at once; values below 1 are treated as 1.
    pub concurrency: usize,
}

impl Default for DigestSettings {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::America::New_York,
            title: DEFAULT_TITLE.to_string(),
            url: DEFAULT_URL.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

pub struct DigestJob {
    tasks: Arc<dyn TaskStore>,
    registry: Arc<dyn DeviceRegistry>,
    notifier: Arc<dyn Notifier>,
    settings: DigestSettings,
}

impl DigestJob {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        registry: Arc<dyn DeviceRegistry>,
        notifier: Arc<dyn Notifier>,
        settings: DigestSettings,
    ) -> Self {
        Self {
            tasks,
            registry,
            notifier,
            settings,
        }
    }

    /// Authorize through `ctx`, run, and let `ctx` shape the response.
    /// Nothing is read or sent when authorization fails.
    pub async fn trigger<T>(&self, ctx: &T, now: DateTime<Utc>) -> T::Response
    where
        T: TriggerContext + Sync,
    {
        if let Err(e) = ctx.authorize() {
            warn!("Digest trigger rejected: {}", e);
            return ctx.respond(Err(e));
        }
        ctx.respond(self.run(now).await)
    }

    /// Send one digest to every registered device.
    ///
    /// Only a failure to list registrations fails the run. Per-user query
    /// and send failures are logged and counted as misses.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<DigestRun, DigestError> {
        let target_date = target_date(now, self.settings.timezone);

        let registrations = self
            .registry
            .list_registrations()
            .await
            .map_err(DigestError::Registry)?;
        let total = registrations.len();
        info!("Daily digest for {}: {} registrations", target_date, total);

        let sent = stream::iter(registrations)
            .map(|registration| self.deliver(registration, &target_date))
            .buffer_unordered(self.settings.concurrency.max(1))
            .filter(|delivered| future::ready(*delivered))
            .count()
            .await;

        info!("Daily digest for {}: sent {} of {}", target_date, sent, total);
        Ok(DigestRun {
            target_date,
            total,
            sent,
        })
    }

    async fn deliver(&self, registration: Registration, target_date: &str) -> bool {
        let Registration { user_id, token } = registration;

        let completed = match self.tasks.completed_tasks(&user_id, target_date).await {
            Ok(tasks) => tasks,
            Err(e) => {
                warn!("Skipping {}: task query failed: {}", user_id, e);
                return false;
            }
        };

        let message = PushMessage::new(token, &self.settings.title, compose_body(&completed))
            .with_data(URL_KEY, &self.settings.url);

        match self.notifier.send(&message).await {
            Ok(()) => {
                debug!("Digest sent to {} ({} completed tasks)", user_id, completed.len());
                true
            }
            Err(e) => {
                warn!("Error sending to {}: {}", user_id, e);
                false
            }
        }
    }
}
