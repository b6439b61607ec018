//! SQLCipher connection pool
//!
//! r2d2 pool over `rusqlite` connections. Every connection receives the
//! SQLCipher key first, then the per-connection pragmas.

use std::path::Path;
use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tracing::{debug, info, instrument, warn};
use transitdesk_domain::{Result, TransitDeskError};

use crate::errors::InfraError;

/// Pool of encrypted connections.
pub type SqlCipherPool = Pool<SqliteConnectionManager>;

/// Connection checked out of a [`SqlCipherPool`].
pub type SqlCipherConnection = PooledConnection<SqliteConnectionManager>;

/// Pool sizing and per-connection settings.
#[derive(Debug, Clone)]
pub struct SqlCipherPoolConfig {
    pub max_size: u32,
    pub connection_timeout: Duration,
    pub busy_timeout: Duration,
    pub enable_wal: bool,
}

impl Default for SqlCipherPoolConfig {
    fn default() -> Self {
        Self {
            max_size: 8,
            connection_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_millis(5000),
            enable_wal: true,
        }
    }
}

/// Build a pool and verify that the key opens the database.
///
/// # Errors
/// Returns `TransitDeskError::Database` when the pool cannot be built or the
/// key is rejected.
#[instrument(skip(encryption_key), fields(db_path = %path.display(), pool_size = config.max_size))]
pub fn create_sqlcipher_pool(
    path: &Path,
    encryption_key: String,
    config: &SqlCipherPoolConfig,
) -> Result<SqlCipherPool> {
    let pragma_config = config.clone();
    let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
        conn.pragma_update(None, "key", &encryption_key)?;
        conn.pragma_update(None, "cipher_compatibility", 4)?;
        apply_connection_pragmas(conn, &pragma_config)
    });

    let pool = Pool::builder()
        .max_size(config.max_size.max(1))
        .connection_timeout(config.connection_timeout)
        .build(manager)
        .map_err(|err| {
            warn!(error = %err, "failed to create connection pool");
            TransitDeskError::from(InfraError::from(err))
        })?;

    {
        let conn = pool.get().map_err(|err| TransitDeskError::from(InfraError::from(err)))?;
        verify_encryption(&conn)?;
        debug!("encryption key accepted");
    }

    info!("SQLCipher pool created");
    Ok(pool)
}

/// Apply the pragmas every pooled connection shares.
///
/// - WAL journal with automatic checkpoints
/// - NORMAL synchronous mode
/// - foreign keys enforced
/// - busy timeout for lock contention
fn apply_connection_pragmas(conn: &Connection, config: &SqlCipherPoolConfig) -> rusqlite::Result<()> {
    let mut pragma_sql = String::new();
    if config.enable_wal {
        pragma_sql.push_str("PRAGMA journal_mode=WAL;\n");
        pragma_sql.push_str("PRAGMA wal_autocheckpoint=1000;\n");
    }
    pragma_sql.push_str("PRAGMA synchronous=NORMAL;\n");
    pragma_sql.push_str("PRAGMA foreign_keys=ON;\n");

    conn.execute_batch(&pragma_sql)?;
    conn.busy_timeout(config.busy_timeout)
}

/// Reading the schema fails with "file is not a database" under a wrong key.
fn verify_encryption(conn: &Connection) -> Result<()> {
    conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))
        .map(|_| ())
        .map_err(|err| TransitDeskError::from(InfraError::from(err)))
}
