use tracing::{error, info};

use crate::job::{DigestError, DigestRun};

/// How a trigger surface authenticates a run and reports its outcome.
/// The job itself is the same for every surface.
pub trait TriggerContext {
    type Response;

    fn authorize(&self) -> Result<(), DigestError>;

    fn respond(&self, outcome: Result<DigestRun, DigestError>) -> Self::Response;
}

/// The internal daily schedule. Always authorized; the outcome only goes
/// to the logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScheduledTrigger;

impl TriggerContext for ScheduledTrigger {
    type Response = ();

    fn authorize(&self) -> Result<(), DigestError> {
        Ok(())
    }

    fn respond(&self, outcome: Result<DigestRun, DigestError>) {
        match outcome {
            Ok(run) => info!(
                "Scheduled digest for {} finished: {} sent, {} failed",
                run.target_date,
                run.sent,
                run.failed()
            ),
            Err(e) => error!("Scheduled digest failed: {}", e),
        }
    }
}
