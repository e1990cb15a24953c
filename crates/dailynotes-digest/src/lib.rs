//! Daily digest: once per trigger, tell every registered device what its
//! owner finished yesterday.

pub mod calendar;
pub mod job;
pub mod message;
pub mod ports;
pub mod schedule;
pub mod store;
pub mod trigger;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use calendar::{DailySchedule, target_date};
pub use job::{DigestError, DigestJob, DigestRun, DigestSettings};
pub use ports::{DeviceRegistry, Registration, StoreError, TaskStore};
pub use store::SqliteStore;
pub use trigger::{ScheduledTrigger, TriggerContext};
