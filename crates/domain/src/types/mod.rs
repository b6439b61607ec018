//! Domain types for folders, stages, analytic accounting and activities.

pub mod activity;
pub mod analytic;
pub mod folder;
pub mod messaging;
pub mod stage;
pub mod user;

pub use activity::*;
pub use analytic::*;
pub use folder::*;
pub use messaging::*;
pub use stage::*;
pub use user::*;

/// Identifier of a persisted folder.
pub type FolderId = i64;
/// Identifier of a stage definition.
pub type StageId = i64;
/// Identifier of an analytic (ledger) account.
pub type AccountId = i64;
/// Identifier of an analytic plan.
pub type PlanId = i64;
/// Identifier of a user.
pub type UserId = i64;
/// Identifier of a scheduled activity.
pub type ActivityId = i64;
/// Identifier of an activity type.
pub type ActivityTypeId = i64;
