//! SQLCipher-backed implementation of the `AnalyticRepository` port.
//!
//! Lines and documents reference accounts through join tables, so a line
//! tagged with several accounts matches a folder sharing any one of them.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tokio::task;
use tracing::debug;
use transitdesk_core::AnalyticRepository;
use transitdesk_domain::{
    AccountId, AnalyticLine, AnalyticPlan, LedgerAccount, MoveType, PlanId,
    Result as DomainResult, StageKind, TransitDeskError,
};

use super::manager::{map_join_error, map_sql_error, DbManager};
use super::rows::optional_enum_column;

/// Analytic plans, accounts, posted lines and document counts.
pub struct SqlCipherAnalyticRepository {
    db: Arc<DbManager>,
}

impl SqlCipherAnalyticRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Register the analytic plan of a business line.
    pub async fn insert_plan(
        &self,
        name: &str,
        stage_kind: Option<StageKind>,
    ) -> DomainResult<AnalyticPlan> {
        let db = Arc::clone(&self.db);
        let name = name.to_string();

        task::spawn_blocking(move || -> DomainResult<AnalyticPlan> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO analytic_plans (name, stage_kind) VALUES (?1, ?2)",
                params![name, stage_kind.map(|kind| kind.as_str())],
            )
            .map_err(map_sql_error)?;
            Ok(AnalyticPlan { id: conn.last_insert_rowid(), name, stage_kind })
        })
        .await
        .map_err(map_join_error)?
    }

    /// Post an analytic line on one or more accounts.
    pub async fn post_line(
        &self,
        name: &str,
        amount: f64,
        account_ids: &[AccountId],
    ) -> DomainResult<AnalyticLine> {
        let db = Arc::clone(&self.db);
        let name = name.to_string();
        let account_ids = account_ids.to_vec();

        task::spawn_blocking(move || -> DomainResult<AnalyticLine> {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(map_sql_error)?;
            tx.execute(
                "INSERT INTO analytic_lines (name, amount) VALUES (?1, ?2)",
                params![name, amount],
            )
            .map_err(map_sql_error)?;
            let id = tx.last_insert_rowid();
            for account_id in &account_ids {
                tx.execute(
                    "INSERT OR IGNORE INTO analytic_line_accounts (line_id, account_id)
                     VALUES (?1, ?2)",
                    params![id, account_id],
                )
                .map_err(map_sql_error)?;
            }
            tx.commit().map_err(map_sql_error)?;
            Ok(AnalyticLine { id, name, amount, account_ids })
        })
        .await
        .map_err(map_join_error)?
    }

    /// Record an accounting document whose lines touch `account_ids`.
    pub async fn post_document(
        &self,
        name: &str,
        move_type: MoveType,
        account_ids: &[AccountId],
    ) -> DomainResult<i64> {
        let db = Arc::clone(&self.db);
        let name = name.to_string();
        let account_ids = account_ids.to_vec();

        task::spawn_blocking(move || -> DomainResult<i64> {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(map_sql_error)?;
            tx.execute(
                "INSERT INTO ledger_documents (name, move_type) VALUES (?1, ?2)",
                params![name, move_type.as_str()],
            )
            .map_err(map_sql_error)?;
            let id = tx.last_insert_rowid();
            for account_id in &account_ids {
                tx.execute(
                    "INSERT INTO document_line_accounts (document_id, account_id) VALUES (?1, ?2)",
                    params![id, account_id],
                )
                .map_err(map_sql_error)?;
            }
            tx.commit().map_err(map_sql_error)?;
            Ok(id)
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl AnalyticRepository for SqlCipherAnalyticRepository {
    async fn plan_for_kind(&self, kind: StageKind) -> DomainResult<Option<AnalyticPlan>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Option<AnalyticPlan>> {
            let conn = db.get_connection()?;
            conn.query_row(
                "SELECT id, name, stage_kind FROM analytic_plans WHERE stage_kind = ?1",
                params![kind.as_str()],
                |row| {
                    Ok(AnalyticPlan {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        stage_kind: optional_enum_column(row, 2)?,
                    })
                },
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn create_account(&self, name: &str, plan_id: PlanId) -> DomainResult<LedgerAccount> {
        let db = Arc::clone(&self.db);
        let name = name.to_string();

        task::spawn_blocking(move || -> DomainResult<LedgerAccount> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO analytic_accounts (name, plan_id) VALUES (?1, ?2)",
                params![name, plan_id],
            )
            .map_err(map_sql_error)?;
            let id = conn.last_insert_rowid();
            debug!(account_id = id, plan_id, "analytic account created");
            Ok(LedgerAccount { id, name, plan_id })
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get_account(&self, id: AccountId) -> DomainResult<Option<LedgerAccount>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Option<LedgerAccount>> {
            let conn = db.get_connection()?;
            conn.query_row(
                "SELECT id, name, plan_id FROM analytic_accounts WHERE id = ?1",
                params![id],
                |row| {
                    Ok(LedgerAccount { id: row.get(0)?, name: row.get(1)?, plan_id: row.get(2)? })
                },
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn rename_account(&self, id: AccountId, name: &str) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let name = name.to_string();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(
                    "UPDATE analytic_accounts SET name = ?1 WHERE id = ?2",
                    params![name, id],
                )
                .map_err(map_sql_error)?;
            if changed == 0 {
                return Err(TransitDeskError::NotFound(format!("analytic account {id}")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn lines_for_accounts(
        &self,
        account_ids: &BTreeSet<AccountId>,
    ) -> DomainResult<Vec<AnalyticLine>> {
        if account_ids.is_empty() {
            return Ok(Vec::new());
        }
        let db = Arc::clone(&self.db);
        let account_ids: Vec<AccountId> = account_ids.iter().copied().collect();

        task::spawn_blocking(move || -> DomainResult<Vec<AnalyticLine>> {
            let conn = db.get_connection()?;
            fetch_lines(&conn, &account_ids)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn count_documents(
        &self,
        account_ids: &BTreeSet<AccountId>,
        move_types: &[MoveType],
    ) -> DomainResult<i64> {
        if account_ids.is_empty() || move_types.is_empty() {
            return Ok(0);
        }
        let db = Arc::clone(&self.db);
        let mut bindings: Vec<Value> = move_types
            .iter()
            .map(|move_type| Value::Text(move_type.as_str().to_string()))
            .collect();
        let type_placeholders = placeholders(1, bindings.len());
        let account_placeholders = placeholders(bindings.len() + 1, account_ids.len());
        bindings.extend(account_ids.iter().copied().map(Value::Integer));

        task::spawn_blocking(move || -> DomainResult<i64> {
            let conn = db.get_connection()?;
            let sql = format!(
                "SELECT count(DISTINCT d.id)
                 FROM ledger_documents d
                 JOIN document_line_accounts dla ON dla.document_id = d.id
                 WHERE d.move_type IN ({type_placeholders})
                   AND dla.account_id IN ({account_placeholders})"
            );
            conn.query_row(&sql, params_from_iter(bindings.iter()), |row| row.get(0))
                .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

fn fetch_lines(conn: &Connection, account_ids: &[AccountId]) -> DomainResult<Vec<AnalyticLine>> {
    let sql = format!(
        "SELECT l.id, l.name, l.amount, group_concat(a.account_id)
         FROM analytic_lines l
         JOIN analytic_line_accounts a ON a.line_id = l.id
         WHERE l.id IN (
             SELECT line_id FROM analytic_line_accounts WHERE account_id IN ({})
         )
         GROUP BY l.id
         ORDER BY l.id",
        placeholders(1, account_ids.len())
    );
    let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
    let rows = stmt
        .query_map(params_from_iter(account_ids.iter()), |row| {
            let joined: Option<String> = row.get(3)?;
            Ok(AnalyticLine {
                id: row.get(0)?,
                name: row.get(1)?,
                amount: row.get(2)?,
                account_ids: split_account_ids(joined.as_deref().unwrap_or_default()),
            })
        })
        .map_err(map_sql_error)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
}

/// `group_concat` output in ascending id order.
fn split_account_ids(joined: &str) -> Vec<AccountId> {
    let ids: BTreeSet<AccountId> =
        joined.split(',').filter_map(|id| id.trim().parse().ok()).collect();
    ids.into_iter().collect()
}

/// `?n, ?n+1, …` for `count` parameters starting at index `start`.
fn placeholders(start: usize, count: usize) -> String {
    (start..start + count).map(|idx| format!("?{idx}")).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::{placeholders, split_account_ids};

    #[test]
    fn placeholders_are_numbered_from_start() {
        assert_eq!(placeholders(1, 3), "?1, ?2, ?3");
        assert_eq!(placeholders(4, 1), "?4");
        assert_eq!(placeholders(1, 0), "");
    }

    #[test]
    fn account_ids_are_sorted_and_deduplicated() {
        assert_eq!(split_account_ids("11,4,11, 7"), vec![4, 7, 11]);
        assert!(split_account_ids("").is_empty());
    }
}
