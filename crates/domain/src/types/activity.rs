//! Activities scheduled on folders and the checklist they leave behind.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{ActivityId, ActivityTypeId, FolderId, StageId, StageKind, UserId};

/// Template for an activity (e.g. "order received").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityType {
    pub id: ActivityTypeId,
    /// Stable key used to look the template up.
    pub key: String,
    pub name: String,
    pub stage_kind: Option<StageKind>,
    /// Position among the kind's activity types.
    pub sequence: i32,
    pub responsible_user_id: Option<UserId>,
    /// Stage a shipping folder moves to once this activity is done.
    pub stage_id: Option<StageId>,
}

/// A to-do attached to a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub folder_id: FolderId,
    pub activity_type_id: ActivityTypeId,
    pub summary: String,
    pub note: Option<String>,
    pub user_id: Option<UserId>,
    pub due_date: NaiveDate,
    pub done: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewActivity {
    pub folder_id: FolderId,
    pub activity_type_id: ActivityTypeId,
    pub summary: String,
    pub note: Option<String>,
    pub user_id: Option<UserId>,
    pub due_date: NaiveDate,
}

/// Record of a completed activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistTask {
    pub id: i64,
    pub folder_id: FolderId,
    pub name: String,
    pub responsible: Option<String>,
    /// Due date of the completed activity.
    pub date_start: Option<NaiveDate>,
    /// Day the activity was marked done.
    pub date_validated: Option<NaiveDate>,
}

impl ChecklistTask {
    /// Whole days between start and validation, zero when either is missing.
    pub fn time_spent_days(&self) -> i64 {
        self.elapsed().map_or(0, |delta| delta.num_days())
    }

    /// Seconds left over after the whole days, zero when either date is
    /// missing.
    #[allow(clippy::cast_precision_loss)]
    pub fn time_spent_float(&self) -> f64 {
        self.elapsed().map_or(0.0, |delta| {
            let remainder = delta - chrono::Duration::days(delta.num_days());
            remainder.num_seconds() as f64
        })
    }

    fn elapsed(&self) -> Option<chrono::Duration> {
        match (self.date_start, self.date_validated) {
            (Some(start), Some(end)) => Some(end.signed_duration_since(start)),
            _ => None,
        }
    }
}
