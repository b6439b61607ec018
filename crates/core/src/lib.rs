//! # TransitDesk Core
//!
//! Business logic for transit folders - no infrastructure dependencies.
//!
//! This crate contains:
//! - ETA alert evaluation, transition notices and the batch digest
//! - Analytic distribution aggregation
//! - The folder lifecycle controller
//! - Port interfaces (traits) for every collaborator
//!
//! ## Architecture Principles
//! - Only depends on `transitdesk-domain`
//! - No database, mail or scheduling code
//! - All external dependencies via traits

pub mod alerts;
pub mod analytic;
pub mod clock;
pub mod folder;

pub use alerts::ports::{MessagingPort, UserDirectory};
pub use alerts::{
    evaluate, AlertBatchReporter, AlertTransition, AlertTransitionNotifier, BatchReport,
    ReportSettings, TransitionOutcome,
};
pub use analytic::ports::AnalyticRepository;
pub use analytic::{AnalyticDistributionAggregator, AnalyticSummary, Balance, InvoiceCounts};
pub use clock::{Clock, FixedClock, SystemClock};
pub use folder::ports::{
    ActivityPort, ChecklistRepository, FolderRepository, SequencePort, StageRepository,
};
pub use folder::{FolderLifecycleController, FolderPorts, ValidationOutcome};
