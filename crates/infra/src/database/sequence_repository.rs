//! Named counters backing case numbers and stage positions.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::params;
use tokio::task;
use transitdesk_core::SequencePort;
use transitdesk_domain::Result as DomainResult;

use super::manager::{map_join_error, map_sql_error, DbManager};

/// Counters stored in the `sequences` table.
///
/// Each call increments and reads in one statement, so concurrent callers
/// never observe the same value.
pub struct SqlCipherSequenceRepository {
    db: Arc<DbManager>,
}

impl SqlCipherSequenceRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SequencePort for SqlCipherSequenceRepository {
    async fn next_value(&self, counter: &str) -> DomainResult<i64> {
        let db = Arc::clone(&self.db);
        let counter = counter.to_string();

        task::spawn_blocking(move || -> DomainResult<i64> {
            let conn = db.get_connection()?;
            conn.query_row(
                "INSERT INTO sequences (name, value) VALUES (?1, 1)
                 ON CONFLICT(name) DO UPDATE SET value = value + 1
                 RETURNING value",
                params![counter],
                |row| row.get(0),
            )
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}
