//! ETA alerts: evaluation, transition notices and the daily digest.

pub mod digest;
pub mod engine;
pub mod notifier;
pub mod ports;
pub mod reporter;
pub mod transition;

pub use engine::evaluate;
pub use notifier::{AlertTransitionNotifier, TransitionOutcome};
pub use reporter::{AlertBatchReporter, BatchReport, ReportSettings};
pub use transition::{AlertTransition, FollowUp};
