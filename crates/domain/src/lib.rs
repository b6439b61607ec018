//! # TransitDesk Domain
//!
//! Business domain types for freight transit and customs clearance folders.
//!
//! This crate contains:
//! - Folder, stage, activity and analytic accounting types
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other TransitDesk crates
//! - No I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
