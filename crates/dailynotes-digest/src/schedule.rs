use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::calendar::DailySchedule;
use crate::job::DigestJob;
use crate::trigger::ScheduledTrigger;

/// Background task that fires the digest once per day.
///
/// Sleeps until the next scheduled time, runs the job through
/// [`ScheduledTrigger`], and repeats. Runs until the task is dropped or no
/// later firing exists.
pub async fn run_daily(job: Arc<DigestJob>, schedule: DailySchedule) {
    loop {
        let now = Utc::now();
        let Some(next) = schedule.next_after(now) else {
            warn!("No further daily digest can be scheduled after {}", now);
            return;
        };
        let wait = (next - now).to_std().unwrap_or_default();

        info!(
            "Next daily digest at {} ({} from now)",
            next.with_timezone(&schedule.timezone),
            humanize(wait)
        );
        tokio::time::sleep(wait).await;

        job.trigger(&ScheduledTrigger, Utc::now()).await;
    }
}

fn humanize(wait: std::time::Duration) -> String {
    let secs = wait.as_secs();
    format!("{}h{:02}m", secs / 3600, (secs % 3600) / 60)
}
