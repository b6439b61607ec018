//! Scheduling infrastructure for the ETA alert batch
//!
//! The scheduler follows the runtime rules used across the crate:
//! - Explicit lifecycle management (start/stop)
//! - Join handles for spawned tasks
//! - Cancellation token support
//! - Timeout wrapping on every async operation

pub mod alert_scheduler;
pub mod error;

pub use alert_scheduler::{AlertJob, AlertScheduler, AlertSchedulerConfig};
pub use error::{SchedulerError, SchedulerResult};
