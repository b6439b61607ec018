//! Folder persistence and workflow collaborator ports

use async_trait::async_trait;
use chrono::NaiveDate;
use transitdesk_domain::{
    Activity, ActivityId, ActivityType, ActivityTypeId, AlertState, ChecklistTask, Folder,
    FolderId, FolderLine, FolderLineKind, FolderQuery, NewActivity, NewFolderLine,
    NewPackageLine, PackageLine, Result, Stage, StageId, StageKind,
};

/// Folder storage.
#[async_trait]
pub trait FolderRepository: Send + Sync {
    /// Persist a new folder and return its id. `folder.id` is ignored.
    async fn create(&self, folder: &Folder) -> Result<FolderId>;

    /// Fetch a folder by id, archived or not.
    async fn get(&self, id: FolderId) -> Result<Option<Folder>>;

    /// Overwrite every column of an existing folder.
    async fn update(&self, folder: &Folder) -> Result<()>;

    /// Write only the cached alert state.
    async fn set_alert_state(&self, id: FolderId, state: AlertState) -> Result<()>;

    /// List folders ordered by case number.
    async fn list(&self, query: FolderQuery) -> Result<Vec<Folder>>;

    /// Archive (`false`) or restore (`true`) a folder.
    async fn set_active(&self, id: FolderId, active: bool) -> Result<()>;

    /// Remove a folder and everything it owns.
    async fn delete(&self, id: FolderId) -> Result<()>;

    async fn add_line(&self, line: NewFolderLine) -> Result<FolderLine>;

    async fn lines(&self, folder_id: FolderId, kind: Option<FolderLineKind>)
        -> Result<Vec<FolderLine>>;

    async fn add_package(&self, package: NewPackageLine) -> Result<PackageLine>;

    async fn packages(&self, folder_id: FolderId) -> Result<Vec<PackageLine>>;
}

/// Stage definitions.
#[async_trait]
pub trait StageRepository: Send + Sync {
    async fn get(&self, id: StageId) -> Result<Option<Stage>>;

    /// Stages of a kind ordered by number, unnumbered stages last.
    async fn list_for_kind(&self, kind: StageKind) -> Result<Vec<Stage>>;

    /// Store `number` on the stage unless it already has one, and return the
    /// number the stage ends up with.
    async fn claim_number(&self, id: StageId, number: i32) -> Result<i32>;
}

/// Completed-activity checklist of each folder.
#[async_trait]
pub trait ChecklistRepository: Send + Sync {
    async fn list_for_folder(&self, folder_id: FolderId) -> Result<Vec<ChecklistTask>>;

    async fn count_for_folder(&self, folder_id: FolderId) -> Result<i64>;
}

/// Activity scheduling.
#[async_trait]
pub trait ActivityPort: Send + Sync {
    /// Look an activity template up by key.
    async fn find_type(&self, key: &str) -> Result<Option<ActivityType>>;

    async fn get_type(&self, id: ActivityTypeId) -> Result<Option<ActivityType>>;

    /// Activity types of a kind in sequence order.
    async fn list_types(&self, kind: StageKind) -> Result<Vec<ActivityType>>;

    async fn count_types(&self, kind: StageKind) -> Result<i64>;

    async fn schedule(&self, activity: NewActivity) -> Result<Activity>;

    async fn get_activity(&self, id: ActivityId) -> Result<Option<Activity>>;

    async fn open_activities(&self, folder_id: FolderId) -> Result<Vec<Activity>>;

    /// Close an open activity and append the matching checklist task in one
    /// step.
    async fn mark_done(
        &self,
        id: ActivityId,
        completed_on: NaiveDate,
        responsible: Option<String>,
    ) -> Result<ChecklistTask>;
}

/// Named monotonically increasing counters.
#[async_trait]
pub trait SequencePort: Send + Sync {
    /// Next value of `counter`, starting at 1. Never returns the same value
    /// twice for one counter.
    async fn next_value(&self, counter: &str) -> Result<i64>;
}
