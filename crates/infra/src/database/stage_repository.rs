//! SQLCipher-backed implementation of the `StageRepository` port.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};
use tokio::task;
use tracing::debug;
use transitdesk_core::StageRepository as StageRepositoryPort;
use transitdesk_domain::{Result as DomainResult, Stage, StageId, StageKind, TransitDeskError};

use super::manager::{map_join_error, map_sql_error, DbManager};
use super::rows::enum_column;

/// SQLCipher-backed stage repository.
pub struct SqlCipherStageRepository {
    db: Arc<DbManager>,
}

impl SqlCipherStageRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Register a stage. `number` 0 leaves the stage unnumbered.
    pub async fn insert(&self, name: &str, number: i32, kind: StageKind) -> DomainResult<Stage> {
        let db = Arc::clone(&self.db);
        let name = name.to_string();

        task::spawn_blocking(move || -> DomainResult<Stage> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO stages (name, number, stage_kind) VALUES (?1, ?2, ?3)",
                params![name, number, kind.as_str()],
            )
            .map_err(map_sql_error)?;
            Ok(Stage { id: conn.last_insert_rowid(), name, number, stage_kind: kind })
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl StageRepositoryPort for SqlCipherStageRepository {
    async fn get(&self, id: StageId) -> DomainResult<Option<Stage>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Option<Stage>> {
            let conn = db.get_connection()?;
            conn.query_row(
                "SELECT id, name, number, stage_kind FROM stages WHERE id = ?1",
                params![id],
                map_stage_row,
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_for_kind(&self, kind: StageKind) -> DomainResult<Vec<Stage>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<Stage>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, name, number, stage_kind FROM stages
                     WHERE stage_kind = ?1
                     ORDER BY number = 0, number, id",
                )
                .map_err(map_sql_error)?;
            let rows =
                stmt.query_map(params![kind.as_str()], map_stage_row).map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    /// Writes `number` only while the stage is still unnumbered, so a racing
    /// caller reads back the winner's number.
    async fn claim_number(&self, id: StageId, number: i32) -> DomainResult<i32> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<i32> {
            let conn = db.get_connection()?;
            let claimed = conn
                .execute(
                    "UPDATE stages SET number = ?1 WHERE id = ?2 AND number = 0",
                    params![number, id],
                )
                .map_err(map_sql_error)?;
            let current: Option<i32> = conn
                .query_row("SELECT number FROM stages WHERE id = ?1", params![id], |row| {
                    row.get(0)
                })
                .optional()
                .map_err(map_sql_error)?;
            let current =
                current.ok_or_else(|| TransitDeskError::NotFound(format!("stage {id}")))?;
            if claimed > 0 {
                debug!(stage_id = id, number = current, "stage position assigned");
            }
            Ok(current)
        })
        .await
        .map_err(map_join_error)?
    }
}

fn map_stage_row(row: &Row<'_>) -> rusqlite::Result<Stage> {
    Ok(Stage {
        id: row.get(0)?,
        name: row.get(1)?,
        number: row.get(2)?,
        stage_kind: enum_column(row, 3)?,
    })
}
