//! Database connection manager backed by the SQLCipher pool.

use std::path::{Path, PathBuf};

use rusqlite::params;
use tokio::task;
use tracing::info;
use transitdesk_domain::{DatabaseConfig, Result, TransitDeskError};

use super::pool::{create_sqlcipher_pool, SqlCipherConnection, SqlCipherPool, SqlCipherPoolConfig};
use crate::errors::InfraError;

const SCHEMA_VERSION: i32 = 1;
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Owns the pool and the schema of the TransitDesk database.
pub struct DbManager {
    pool: SqlCipherPool,
    path: PathBuf,
}

impl DbManager {
    /// Create a new manager with the given pool size and SQLCipher key.
    pub fn new<P: AsRef<Path>>(
        db_path: P,
        pool_size: u32,
        encryption_key: Option<&str>,
    ) -> Result<Self> {
        let key = encryption_key
            .filter(|key| !key.is_empty())
            .map(std::borrow::ToOwned::to_owned)
            .ok_or_else(|| {
                TransitDeskError::Config("database encryption key not provided".into())
            })?;

        let path = db_path.as_ref().to_path_buf();
        let config =
            SqlCipherPoolConfig { max_size: pool_size.max(1), ..SqlCipherPoolConfig::default() };
        let pool = create_sqlcipher_pool(&path, key, &config)?;

        info!(
            db_path = %path.display(),
            max_connections = config.max_size,
            "sqlcipher pool initialised"
        );

        Ok(Self { pool, path })
    }

    /// Build a manager from the `database` configuration section.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        Self::new(&config.path, config.pool_size, config.encryption_key.as_deref())
    }

    /// Acquire a connection from the pool.
    pub fn get_connection(&self) -> Result<SqlCipherConnection> {
        self.pool.get().map_err(map_pool_error)
    }

    /// Ensure the full schema exists on the current database.
    pub fn run_migrations(&self) -> Result<()> {
        let conn = self.get_connection()?;
        conn.execute_batch(SCHEMA_SQL).map_err(map_sql_error)?;
        conn.execute(
            "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?, CAST(strftime('%s','now') AS INTEGER))",
            params![SCHEMA_VERSION],
        )
        .map_err(map_sql_error)?;
        Ok(())
    }

    /// Return the configured database path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Verify the database answers a trivial query.
    pub fn health_check(&self) -> Result<()> {
        let conn = self.get_connection()?;
        conn.query_row("SELECT 1", params![], |row| row.get::<_, i32>(0)).map_err(map_sql_error)?;
        Ok(())
    }
}

pub(crate) fn map_sql_error(err: rusqlite::Error) -> TransitDeskError {
    TransitDeskError::from(InfraError::from(err))
}

pub(crate) fn map_join_error(err: task::JoinError) -> TransitDeskError {
    if err.is_cancelled() {
        TransitDeskError::Internal("blocking database task cancelled".into())
    } else {
        TransitDeskError::Internal(format!("blocking database task failed: {err}"))
    }
}

fn map_pool_error(err: r2d2::Error) -> TransitDeskError {
    TransitDeskError::from(InfraError::from(err))
}
