//! SQLCipher-backed implementation of the `FolderRepository` port.
//!
//! Lines and packages belong to their folder and are removed with it through
//! `ON DELETE CASCADE`.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use tokio::task;
use tracing::{debug, instrument};
use transitdesk_core::FolderRepository as FolderRepositoryPort;
use transitdesk_domain::{
    AlertState, Folder, FolderId, FolderLine, FolderLineKind, FolderMilestones, FolderQuery,
    NewFolderLine, NewPackageLine, PackageLine, Result as DomainResult, TransitDeskError,
};

use super::manager::{map_join_error, map_sql_error, DbManager};
use super::rows::{bool_to_int, distribution_column, enum_column, int_to_bool};

/// SQLCipher-backed folder repository.
pub struct SqlCipherFolderRepository {
    db: Arc<DbManager>,
}

impl SqlCipherFolderRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FolderRepositoryPort for SqlCipherFolderRepository {
    #[instrument(skip(self, folder), fields(folder = %folder.name))]
    async fn create(&self, folder: &Folder) -> DomainResult<FolderId> {
        let db = Arc::clone(&self.db);
        let folder = folder.clone();

        task::spawn_blocking(move || -> DomainResult<FolderId> {
            let conn = db.get_connection()?;
            execute_folder(&conn, FOLDER_INSERT_SQL, &folder, false)?;
            let id = conn.last_insert_rowid();
            debug!(folder_id = id, "folder inserted");
            Ok(id)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get(&self, id: FolderId) -> DomainResult<Option<Folder>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Option<Folder>> {
            let conn = db.get_connection()?;
            fetch_folder(&conn, id)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn update(&self, folder: &Folder) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let folder = folder.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let changed = execute_folder(&conn, FOLDER_UPDATE_SQL, &folder, true)?;
            ensure_changed(changed, folder.id)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn set_alert_state(&self, id: FolderId, state: AlertState) -> DomainResult<()> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(
                    "UPDATE folders SET alert_state = ?1 WHERE id = ?2",
                    params![state.as_str(), id],
                )
                .map_err(map_sql_error)?;
            ensure_changed(changed, id)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list(&self, query: FolderQuery) -> DomainResult<Vec<Folder>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<Folder>> {
            let conn = db.get_connection()?;
            let sql = format!(
                "SELECT {FOLDER_COLUMNS} FROM folders
                 WHERE (?1 = 1 OR active = 1)
                   AND (?2 = 0 OR eta IS NOT NULL)
                   AND (?3 IS NULL OR stage_kind = ?3)
                 ORDER BY name"
            );
            let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
            let rows = stmt
                .query_map(
                    params![
                        bool_to_int(query.include_archived),
                        bool_to_int(query.with_eta_only),
                        query.stage_kind.map(|kind| kind.as_str()),
                    ],
                    map_folder_row,
                )
                .map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn set_active(&self, id: FolderId, active: bool) -> DomainResult<()> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(
                    "UPDATE folders SET active = ?1 WHERE id = ?2",
                    params![bool_to_int(active), id],
                )
                .map_err(map_sql_error)?;
            ensure_changed(changed, id)
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: FolderId) -> DomainResult<()> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute("DELETE FROM folders WHERE id = ?1", params![id])
                .map_err(map_sql_error)?;
            ensure_changed(changed, id)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn add_line(&self, line: NewFolderLine) -> DomainResult<FolderLine> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<FolderLine> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO folder_lines (folder_id, kind, description, quantity, amount)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    line.folder_id,
                    line.kind.as_str(),
                    line.description,
                    line.quantity,
                    line.amount
                ],
            )
            .map_err(map_sql_error)?;
            Ok(FolderLine {
                id: conn.last_insert_rowid(),
                folder_id: line.folder_id,
                kind: line.kind,
                description: line.description,
                quantity: line.quantity,
                amount: line.amount,
            })
        })
        .await
        .map_err(map_join_error)?
    }

    async fn lines(
        &self,
        folder_id: FolderId,
        kind: Option<FolderLineKind>,
    ) -> DomainResult<Vec<FolderLine>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<FolderLine>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, folder_id, kind, description, quantity, amount
                     FROM folder_lines
                     WHERE folder_id = ?1 AND (?2 IS NULL OR kind = ?2)
                     ORDER BY id",
                )
                .map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![folder_id, kind.map(|kind| kind.as_str())], |row| {
                    Ok(FolderLine {
                        id: row.get(0)?,
                        folder_id: row.get(1)?,
                        kind: enum_column(row, 2)?,
                        description: row.get(3)?,
                        quantity: row.get(4)?,
                        amount: row.get(5)?,
                    })
                })
                .map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn add_package(&self, package: NewPackageLine) -> DomainResult<PackageLine> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<PackageLine> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO folder_packages (
                    folder_id, container_number, container_type, received_on, output_on,
                    delivered_on, removed_on, returned_on
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    package.folder_id,
                    package.container_number,
                    package.container_type,
                    package.received_on,
                    package.output_on,
                    package.delivered_on,
                    package.removed_on,
                    package.returned_on,
                ],
            )
            .map_err(map_sql_error)?;
            Ok(PackageLine {
                id: conn.last_insert_rowid(),
                folder_id: package.folder_id,
                container_number: package.container_number,
                container_type: package.container_type,
                received_on: package.received_on,
                output_on: package.output_on,
                delivered_on: package.delivered_on,
                removed_on: package.removed_on,
                returned_on: package.returned_on,
            })
        })
        .await
        .map_err(map_join_error)?
    }

    async fn packages(&self, folder_id: FolderId) -> DomainResult<Vec<PackageLine>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<PackageLine>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, folder_id, container_number, container_type, received_on,
                            output_on, delivered_on, removed_on, returned_on
                     FROM folder_packages WHERE folder_id = ?1 ORDER BY id",
                )
                .map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![folder_id], |row| {
                    Ok(PackageLine {
                        id: row.get(0)?,
                        folder_id: row.get(1)?,
                        container_number: row.get(2)?,
                        container_type: row.get(3)?,
                        received_on: row.get(4)?,
                        output_on: row.get(5)?,
                        delivered_on: row.get(6)?,
                        removed_on: row.get(7)?,
                        returned_on: row.get(8)?,
                    })
                })
                .map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

const FOLDER_COLUMNS: &str = "id, name, stage_kind, stage_id, stage_number, alert_state, eta,
    date_open, date_close, deadline, declaration_on, guce_on, validation_on, avi_rvc_on,
    provisional_on, liquidation_on, pad_deposit_on, receipt_on, bad_on, bill_of_lading_on,
    exit_on, customer, user_id, bill_of_lading, order_reference, besc, rvc, goods,
    analytic_account_id, analytic_distribution, task_total, active";

const FOLDER_INSERT_SQL: &str = "INSERT INTO folders (
        name, stage_kind, stage_id, stage_number, alert_state, eta, date_open, date_close,
        deadline, declaration_on, guce_on, validation_on, avi_rvc_on, provisional_on,
        liquidation_on, pad_deposit_on, receipt_on, bad_on, bill_of_lading_on, exit_on,
        customer, user_id, bill_of_lading, order_reference, besc, rvc, goods,
        analytic_account_id, analytic_distribution, task_total, active
    ) VALUES (
        ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
        ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30, ?31
    )";

const FOLDER_UPDATE_SQL: &str = "UPDATE folders SET
        name = ?1, stage_kind = ?2, stage_id = ?3, stage_number = ?4, alert_state = ?5,
        eta = ?6, date_open = ?7, date_close = ?8, deadline = ?9, declaration_on = ?10,
        guce_on = ?11, validation_on = ?12, avi_rvc_on = ?13, provisional_on = ?14,
        liquidation_on = ?15, pad_deposit_on = ?16, receipt_on = ?17, bad_on = ?18,
        bill_of_lading_on = ?19, exit_on = ?20, customer = ?21, user_id = ?22,
        bill_of_lading = ?23, order_reference = ?24, besc = ?25, rvc = ?26, goods = ?27,
        analytic_account_id = ?28, analytic_distribution = ?29, task_total = ?30, active = ?31
    WHERE id = ?32";

/// Bind every folder column in table order, plus the id for updates.
fn execute_folder(
    conn: &Connection,
    sql: &str,
    folder: &Folder,
    bind_id: bool,
) -> DomainResult<usize> {
    let distribution = folder.analytic_distribution.to_json()?;
    let stage_kind = folder.stage_kind.as_str();
    let alert_state = folder.alert_state.as_str();
    let active = bool_to_int(folder.active);
    let m = &folder.milestones;

    let mut values: Vec<&dyn ToSql> = vec![
        &folder.name,
        &stage_kind,
        &folder.stage_id,
        &folder.stage_number,
        &alert_state,
        &folder.eta,
        &folder.date_open,
        &folder.date_close,
        &folder.deadline,
        &m.declaration,
        &m.guce,
        &m.validation,
        &m.avi_rvc,
        &m.provisional,
        &m.liquidation,
        &m.pad_deposit,
        &m.receipt,
        &m.bad,
        &m.bill_of_lading,
        &m.exit,
        &folder.customer,
        &folder.user_id,
        &folder.bill_of_lading,
        &folder.order_reference,
        &folder.besc,
        &folder.rvc,
        &folder.goods,
        &folder.analytic_account_id,
        &distribution,
        &folder.task_total,
        &active,
    ];
    if bind_id {
        values.push(&folder.id);
    }
    conn.execute(sql, values.as_slice()).map_err(map_sql_error)
}

pub(crate) fn fetch_folder(conn: &Connection, id: FolderId) -> DomainResult<Option<Folder>> {
    conn.query_row(
        &format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE id = ?1"),
        params![id],
        map_folder_row,
    )
    .optional()
    .map_err(map_sql_error)
}

fn map_folder_row(row: &Row<'_>) -> rusqlite::Result<Folder> {
    Ok(Folder {
        id: row.get(0)?,
        name: row.get(1)?,
        stage_kind: enum_column(row, 2)?,
        stage_id: row.get(3)?,
        stage_number: row.get(4)?,
        alert_state: enum_column(row, 5)?,
        eta: row.get(6)?,
        date_open: row.get(7)?,
        date_close: row.get(8)?,
        deadline: row.get(9)?,
        milestones: FolderMilestones {
            declaration: row.get(10)?,
            guce: row.get(11)?,
            validation: row.get(12)?,
            avi_rvc: row.get(13)?,
            provisional: row.get(14)?,
            liquidation: row.get(15)?,
            pad_deposit: row.get(16)?,
            receipt: row.get(17)?,
            bad: row.get(18)?,
            bill_of_lading: row.get(19)?,
            exit: row.get(20)?,
        },
        customer: row.get(21)?,
        user_id: row.get(22)?,
        bill_of_lading: row.get(23)?,
        order_reference: row.get(24)?,
        besc: row.get(25)?,
        rvc: row.get(26)?,
        goods: row.get(27)?,
        analytic_account_id: row.get(28)?,
        analytic_distribution: distribution_column(row, 29)?,
        task_total: row.get(30)?,
        active: int_to_bool(row.get(31)?),
    })
}

fn ensure_changed(changed: usize, id: FolderId) -> DomainResult<()> {
    if changed == 0 {
        Err(TransitDeskError::NotFound(format!("folder {id}")))
    } else {
        Ok(())
    }
}
