use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveTime;
use chrono_tz::Tz;

use dailynotes_api::digest::DEFAULT_NOTIFY_SECRET;
use dailynotes_digest::job::DEFAULT_CONCURRENCY;
use dailynotes_digest::message::DEFAULT_URL;

pub const DEFAULT_JWT_SECRET: &str = "dev-secret-change-me";

/// Server configuration, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub notify_secret: String,
    pub timezone: Tz,
    pub digest_time: NaiveTime,
    pub digest_concurrency: usize,
    pub notification_url: String,
    pub scheduler_enabled: bool,
    pub fcm_base_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let port = get("DAILYNOTES_PORT", "3000")
            .parse()
            .context("DAILYNOTES_PORT must be a port number")?;

        let tz_name = get("DAILYNOTES_TIMEZONE", "America/New_York");
        let timezone: Tz = tz_name
            .parse()
            .map_err(|e| anyhow!("invalid DAILYNOTES_TIMEZONE '{}': {}", tz_name, e))?;

        let time = get("DAILYNOTES_DIGEST_TIME", "08:00");
        let digest_time = NaiveTime::parse_from_str(&time, "%H:%M")
            .with_context(|| format!("DAILYNOTES_DIGEST_TIME must be HH:MM, got '{}'", time))?;

        let digest_concurrency = get("DAILYNOTES_DIGEST_CONCURRENCY", &DEFAULT_CONCURRENCY.to_string())
            .parse::<usize>()
            .context("DAILYNOTES_DIGEST_CONCURRENCY must be a positive integer")?
            .max(1);

        let scheduler_enabled = !matches!(
            get("DAILYNOTES_SCHEDULER", "on").to_ascii_lowercase().as_str(),
            "off" | "false" | "0" | "no"
        );

        Ok(Self {
            host: get("DAILYNOTES_HOST", "0.0.0.0"),
            port,
            db_path: get("DAILYNOTES_DB_PATH", "dailynotes.db").into(),
            jwt_secret: get("DAILYNOTES_JWT_SECRET", DEFAULT_JWT_SECRET),
            notify_secret: var("DAILY_NOTIFY_SECRET")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_NOTIFY_SECRET.to_string()),
            timezone,
            digest_time,
            digest_concurrency,
            notification_url: get("DAILYNOTES_NOTIFICATION_URL", DEFAULT_URL),
            scheduler_enabled,
            fcm_base_url: var("FCM_BASE_URL").filter(|s| !s.is_empty()),
        })
    }
}
