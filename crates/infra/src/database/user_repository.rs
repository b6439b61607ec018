//! SQLCipher-backed implementation of the `UserDirectory` port.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::task;
use transitdesk_core::UserDirectory;
use transitdesk_domain::{Result as DomainResult, User, UserId};

use super::manager::{map_join_error, map_sql_error, DbManager};

/// Users and their role memberships.
pub struct SqlCipherUserDirectory {
    db: Arc<DbManager>,
}

impl SqlCipherUserDirectory {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Register a user with the given roles.
    pub async fn insert(
        &self,
        name: &str,
        email: Option<&str>,
        roles: &[&str],
    ) -> DomainResult<User> {
        let db = Arc::clone(&self.db);
        let name = name.to_string();
        let email = email.map(ToOwned::to_owned);
        let roles: Vec<String> = roles.iter().map(|role| (*role).to_string()).collect();

        task::spawn_blocking(move || -> DomainResult<User> {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(map_sql_error)?;
            tx.execute("INSERT INTO users (name, email) VALUES (?1, ?2)", params![name, email])
                .map_err(map_sql_error)?;
            let id = tx.last_insert_rowid();
            for role in &roles {
                tx.execute(
                    "INSERT OR IGNORE INTO user_roles (user_id, role) VALUES (?1, ?2)",
                    params![id, role],
                )
                .map_err(map_sql_error)?;
            }
            tx.commit().map_err(map_sql_error)?;
            Ok(User { id, name, email, roles })
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl UserDirectory for SqlCipherUserDirectory {
    async fn get(&self, id: UserId) -> DomainResult<Option<User>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Option<User>> {
            let conn = db.get_connection()?;
            fetch_user(&conn, id)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn members_of_role(&self, role: &str) -> DomainResult<Vec<User>> {
        let db = Arc::clone(&self.db);
        let role = role.to_string();

        task::spawn_blocking(move || -> DomainResult<Vec<User>> {
            let conn = db.get_connection()?;
            let ids = {
                let mut stmt = conn
                    .prepare("SELECT user_id FROM user_roles WHERE role = ?1 ORDER BY user_id")
                    .map_err(map_sql_error)?;
                let rows = stmt
                    .query_map(params![role], |row| row.get::<_, UserId>(0))
                    .map_err(map_sql_error)?;
                rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)?
            };

            let mut users = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(user) = fetch_user(&conn, id)? {
                    users.push(user);
                }
            }
            Ok(users)
        })
        .await
        .map_err(map_join_error)?
    }
}

fn fetch_user(conn: &Connection, id: UserId) -> DomainResult<Option<User>> {
    let base = conn
        .query_row("SELECT id, name, email FROM users WHERE id = ?1", params![id], |row| {
            Ok((
                row.get::<_, UserId>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })
        .optional()
        .map_err(map_sql_error)?;
    let Some((id, name, email)) = base else {
        return Ok(None);
    };

    let mut stmt = conn
        .prepare("SELECT role FROM user_roles WHERE user_id = ?1 ORDER BY role")
        .map_err(map_sql_error)?;
    let roles = stmt
        .query_map(params![id], |row| row.get::<_, String>(0))
        .map_err(map_sql_error)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(map_sql_error)?;

    Ok(Some(User { id, name, email, roles }))
}
