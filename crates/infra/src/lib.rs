//! # TransitDesk Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - Configuration loading (environment and TOML/JSON files)
//! - Database implementations (SQLite/SQLCipher)
//! - Folder notes and SMTP mail delivery
//! - The cron-driven ETA alert batch
//!
//! ## Architecture
//! - Implements traits defined in `transitdesk-core`
//! - Contains all "impure" code (I/O, network, timers)

pub mod config;
pub mod database;
pub mod errors;
pub mod messaging;
pub mod scheduling;

// Re-export commonly used items
pub use database::*;
pub use errors::InfraError;
pub use messaging::{DeskMessenger, SmtpMailer};
pub use scheduling::{AlertJob, AlertScheduler, AlertSchedulerConfig, SchedulerError};
