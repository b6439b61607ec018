//! # TransitDesk App
//!
//! Daemon layer - dependency wiring and process lifecycle.
//!
//! This crate contains:
//! - Application context (dependency injection)
//! - Logging setup and health reporting
//! - Main entry point
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - Wires up the hexagonal architecture

pub mod context;
pub mod utils;

// Re-export for convenience
pub use context::*;
