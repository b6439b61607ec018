//! SQLCipher-backed implementation of the `ActivityPort`.
//!
//! Completing an activity flips its `done` flag and appends the checklist
//! row in one transaction.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::task;
use tracing::{debug, instrument};
use transitdesk_core::ActivityPort;
use transitdesk_domain::{
    Activity, ActivityId, ActivityType, ActivityTypeId, ChecklistTask, FolderId, NewActivity,
    Result as DomainResult, StageId, StageKind, TransitDeskError, UserId,
};

use super::manager::{map_join_error, map_sql_error, DbManager};
use super::rows::{int_to_bool, optional_enum_column};

/// SQLCipher-backed activity and activity-type repository.
pub struct SqlCipherActivityRepository {
    db: Arc<DbManager>,
}

/// Activity template to register.
#[derive(Debug, Clone)]
pub struct NewActivityType {
    pub key: String,
    pub name: String,
    pub stage_kind: Option<StageKind>,
    pub sequence: i32,
    pub responsible_user_id: Option<UserId>,
    pub stage_id: Option<StageId>,
}

impl SqlCipherActivityRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Register an activity template.
    pub async fn insert_type(&self, new_type: NewActivityType) -> DomainResult<ActivityType> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<ActivityType> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO activity_types
                    (key, name, stage_kind, sequence, responsible_user_id, stage_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    new_type.key,
                    new_type.name,
                    new_type.stage_kind.map(|kind| kind.as_str()),
                    new_type.sequence,
                    new_type.responsible_user_id,
                    new_type.stage_id,
                ],
            )
            .map_err(map_sql_error)?;
            Ok(ActivityType {
                id: conn.last_insert_rowid(),
                key: new_type.key,
                name: new_type.name,
                stage_kind: new_type.stage_kind,
                sequence: new_type.sequence,
                responsible_user_id: new_type.responsible_user_id,
                stage_id: new_type.stage_id,
            })
        })
        .await
        .map_err(map_join_error)?
    }

    fn complete(
        conn: &mut Connection,
        id: ActivityId,
        completed_on: NaiveDate,
        responsible: Option<String>,
    ) -> DomainResult<ChecklistTask> {
        let tx = conn.transaction().map_err(map_sql_error)?;

        let activity = fetch_activity(&tx, id)?
            .ok_or_else(|| TransitDeskError::NotFound(format!("activity {id}")))?;
        let flipped = tx
            .execute("UPDATE activities SET done = 1 WHERE id = ?1 AND done = 0", params![id])
            .map_err(map_sql_error)?;
        if flipped == 0 {
            return Err(TransitDeskError::Validation(
                "No activity in progress to validate".into(),
            ));
        }

        let type_name: Option<String> = tx
            .query_row(
                "SELECT name FROM activity_types WHERE id = ?1",
                params![activity.activity_type_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(map_sql_error)?;
        let name = type_name.unwrap_or_else(|| activity.summary.clone());

        tx.execute(
            "INSERT INTO checklist_tasks (folder_id, name, responsible, date_start, date_validated)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![activity.folder_id, name, responsible, activity.due_date, completed_on],
        )
        .map_err(map_sql_error)?;
        let task_id = tx.last_insert_rowid();
        tx.commit().map_err(map_sql_error)?;

        Ok(ChecklistTask {
            id: task_id,
            folder_id: activity.folder_id,
            name,
            responsible,
            date_start: Some(activity.due_date),
            date_validated: Some(completed_on),
        })
    }
}

#[async_trait]
impl ActivityPort for SqlCipherActivityRepository {
    async fn find_type(&self, key: &str) -> DomainResult<Option<ActivityType>> {
        let db = Arc::clone(&self.db);
        let key = key.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<ActivityType>> {
            let conn = db.get_connection()?;
            conn.query_row(
                &format!("SELECT {TYPE_COLUMNS} FROM activity_types WHERE key = ?1"),
                params![key],
                map_type_row,
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get_type(&self, id: ActivityTypeId) -> DomainResult<Option<ActivityType>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Option<ActivityType>> {
            let conn = db.get_connection()?;
            conn.query_row(
                &format!("SELECT {TYPE_COLUMNS} FROM activity_types WHERE id = ?1"),
                params![id],
                map_type_row,
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_types(&self, kind: StageKind) -> DomainResult<Vec<ActivityType>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<ActivityType>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {TYPE_COLUMNS} FROM activity_types
                     WHERE stage_kind = ?1 ORDER BY sequence, id"
                ))
                .map_err(map_sql_error)?;
            let rows =
                stmt.query_map(params![kind.as_str()], map_type_row).map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn count_types(&self, kind: StageKind) -> DomainResult<i64> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<i64> {
            let conn = db.get_connection()?;
            conn.query_row(
                "SELECT count(*) FROM activity_types WHERE stage_kind = ?1",
                params![kind.as_str()],
                |row| row.get(0),
            )
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn schedule(&self, activity: NewActivity) -> DomainResult<Activity> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Activity> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO activities
                    (folder_id, activity_type_id, summary, note, user_id, due_date, done)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)",
                params![
                    activity.folder_id,
                    activity.activity_type_id,
                    activity.summary,
                    activity.note,
                    activity.user_id,
                    activity.due_date,
                ],
            )
            .map_err(map_sql_error)?;
            let id = conn.last_insert_rowid();
            debug!(activity_id = id, folder_id = activity.folder_id, "activity scheduled");
            Ok(Activity {
                id,
                folder_id: activity.folder_id,
                activity_type_id: activity.activity_type_id,
                summary: activity.summary,
                note: activity.note,
                user_id: activity.user_id,
                due_date: activity.due_date,
                done: false,
            })
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get_activity(&self, id: ActivityId) -> DomainResult<Option<Activity>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Option<Activity>> {
            let conn = db.get_connection()?;
            fetch_activity(&conn, id)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn open_activities(&self, folder_id: FolderId) -> DomainResult<Vec<Activity>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<Activity>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {ACTIVITY_COLUMNS} FROM activities
                     WHERE folder_id = ?1 AND done = 0 ORDER BY due_date, id"
                ))
                .map_err(map_sql_error)?;
            let rows =
                stmt.query_map(params![folder_id], map_activity_row).map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self, responsible))]
    async fn mark_done(
        &self,
        id: ActivityId,
        completed_on: NaiveDate,
        responsible: Option<String>,
    ) -> DomainResult<ChecklistTask> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<ChecklistTask> {
            let mut conn = db.get_connection()?;
            Self::complete(&mut conn, id, completed_on, responsible)
        })
        .await
        .map_err(map_join_error)?
    }
}

const TYPE_COLUMNS: &str = "id, key, name, stage_kind, sequence, responsible_user_id, stage_id";

const ACTIVITY_COLUMNS: &str =
    "id, folder_id, activity_type_id, summary, note, user_id, due_date, done";

fn fetch_activity(conn: &Connection, id: ActivityId) -> DomainResult<Option<Activity>> {
    conn.query_row(
        &format!("SELECT {ACTIVITY_COLUMNS} FROM activities WHERE id = ?1"),
        params![id],
        map_activity_row,
    )
    .optional()
    .map_err(map_sql_error)
}

fn map_type_row(row: &Row<'_>) -> rusqlite::Result<ActivityType> {
    Ok(ActivityType {
        id: row.get(0)?,
        key: row.get(1)?,
        name: row.get(2)?,
        stage_kind: optional_enum_column(row, 3)?,
        sequence: row.get(4)?,
        responsible_user_id: row.get(5)?,
        stage_id: row.get(6)?,
    })
}

fn map_activity_row(row: &Row<'_>) -> rusqlite::Result<Activity> {
    Ok(Activity {
        id: row.get(0)?,
        folder_id: row.get(1)?,
        activity_type_id: row.get(2)?,
        summary: row.get(3)?,
        note: row.get(4)?,
        user_id: row.get(5)?,
        due_date: row.get(6)?,
        done: int_to_bool(row.get(7)?),
    })
}
