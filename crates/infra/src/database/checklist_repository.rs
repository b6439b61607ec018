//! SQLCipher-backed implementation of the `ChecklistRepository` port.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, Row};
use tokio::task;
use transitdesk_core::ChecklistRepository as ChecklistRepositoryPort;
use transitdesk_domain::{ChecklistTask, FolderId, Result as DomainResult};

use super::manager::{map_join_error, map_sql_error, DbManager};

/// Completed checklist entries, written by the activity repository.
pub struct SqlCipherChecklistRepository {
    db: Arc<DbManager>,
}

impl SqlCipherChecklistRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ChecklistRepositoryPort for SqlCipherChecklistRepository {
    async fn list_for_folder(&self, folder_id: FolderId) -> DomainResult<Vec<ChecklistTask>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<ChecklistTask>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, folder_id, name, responsible, date_start, date_validated
                     FROM checklist_tasks WHERE folder_id = ?1 ORDER BY id",
                )
                .map_err(map_sql_error)?;
            let rows =
                stmt.query_map(params![folder_id], map_checklist_row).map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn count_for_folder(&self, folder_id: FolderId) -> DomainResult<i64> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<i64> {
            let conn = db.get_connection()?;
            conn.query_row(
                "SELECT count(*) FROM checklist_tasks WHERE folder_id = ?1",
                params![folder_id],
                |row| row.get(0),
            )
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

pub(crate) fn map_checklist_row(row: &Row<'_>) -> rusqlite::Result<ChecklistTask> {
    Ok(ChecklistTask {
        id: row.get(0)?,
        folder_id: row.get(1)?,
        name: row.get(2)?,
        responsible: row.get(3)?,
        date_start: row.get(4)?,
        date_validated: row.get(5)?,
    })
}
