//! Database implementations

pub mod activity_repository;
pub mod analytic_repository;
pub mod checklist_repository;
pub mod folder_repository;
pub mod manager;
pub mod message_repository;
pub mod pool;
mod rows;
pub mod sequence_repository;
pub mod stage_repository;
pub mod user_repository;

pub use activity_repository::*;
pub use analytic_repository::*;
pub use checklist_repository::*;
pub use folder_repository::*;
pub use manager::*;
pub use message_repository::*;
pub use pool::*;
pub use sequence_repository::*;
pub use stage_repository::*;
pub use user_repository::*;
