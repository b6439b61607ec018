//! Folder notes and the outgoing mail log.

use std::sync::Arc;

use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Row};
use tokio::task;
use transitdesk_domain::{
    FolderId, FolderNote, MailMessage, MailState, Result as DomainResult, TransitDeskError,
};

use super::manager::{map_join_error, map_sql_error, DbManager};
use super::rows::enum_column;

/// Persists notes posted on folders and every mail handed to the transport.
pub struct SqlCipherMessageRepository {
    db: Arc<DbManager>,
}

impl SqlCipherMessageRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    pub async fn insert_note(&self, folder_id: FolderId, body: &str) -> DomainResult<FolderNote> {
        let db = Arc::clone(&self.db);
        let body = body.to_string();

        task::spawn_blocking(move || -> DomainResult<FolderNote> {
            let conn = db.get_connection()?;
            let posted_at = Utc::now();
            conn.execute(
                "INSERT INTO folder_notes (folder_id, body, posted_at) VALUES (?1, ?2, ?3)",
                params![folder_id, body, posted_at],
            )
            .map_err(map_sql_error)?;
            Ok(FolderNote { id: conn.last_insert_rowid(), folder_id, body, posted_at })
        })
        .await
        .map_err(map_join_error)?
    }

    /// Notes of a folder, oldest first.
    pub async fn notes_for(&self, folder_id: FolderId) -> DomainResult<Vec<FolderNote>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<FolderNote>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, folder_id, body, posted_at FROM folder_notes
                     WHERE folder_id = ?1 ORDER BY id",
                )
                .map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![folder_id], |row| {
                    Ok(FolderNote {
                        id: row.get(0)?,
                        folder_id: row.get(1)?,
                        body: row.get(2)?,
                        posted_at: row.get(3)?,
                    })
                })
                .map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    /// Record a mail in the `queued` state.
    pub async fn record_mail(
        &self,
        recipients: &[String],
        subject: &str,
        body_html: &str,
    ) -> DomainResult<MailMessage> {
        let db = Arc::clone(&self.db);
        let recipients = recipients.to_vec();
        let subject = subject.to_string();
        let body_html = body_html.to_string();

        task::spawn_blocking(move || -> DomainResult<MailMessage> {
            let conn = db.get_connection()?;
            let encoded = serde_json::to_string(&recipients).map_err(|err| {
                TransitDeskError::Internal(format!("failed to encode recipients: {err}"))
            })?;
            let created_at = Utc::now();
            conn.execute(
                "INSERT INTO mail_messages
                    (recipients, subject, body_html, state, failure_reason, created_at)
                 VALUES (?1, ?2, ?3, ?4, NULL, ?5)",
                params![encoded, subject, body_html, MailState::Queued.as_str(), created_at],
            )
            .map_err(map_sql_error)?;
            Ok(MailMessage {
                id: conn.last_insert_rowid(),
                recipients,
                subject,
                body_html,
                state: MailState::Queued,
                failure_reason: None,
                created_at,
            })
        })
        .await
        .map_err(map_join_error)?
    }

    pub async fn set_mail_state(
        &self,
        id: i64,
        state: MailState,
        failure_reason: Option<String>,
    ) -> DomainResult<()> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(
                    "UPDATE mail_messages SET state = ?1, failure_reason = ?2 WHERE id = ?3",
                    params![state.as_str(), failure_reason, id],
                )
                .map_err(map_sql_error)?;
            if changed == 0 {
                return Err(TransitDeskError::NotFound(format!("mail message {id}")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    /// Logged mails, newest last, optionally restricted to one state.
    pub async fn mails(&self, state: Option<MailState>) -> DomainResult<Vec<MailMessage>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<MailMessage>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, recipients, subject, body_html, state, failure_reason, created_at
                     FROM mail_messages
                     WHERE ?1 IS NULL OR state = ?1
                     ORDER BY id",
                )
                .map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![state.as_ref().map(MailState::as_str)], map_mail_row)
                .map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

fn map_mail_row(row: &Row<'_>) -> rusqlite::Result<MailMessage> {
    let raw: String = row.get(1)?;
    let recipients = serde_json::from_str::<Vec<String>>(&raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(err)))?;
    Ok(MailMessage {
        id: row.get(0)?,
        recipients,
        subject: row.get(2)?,
        body_html: row.get(3)?,
        state: enum_column(row, 4)?,
        failure_reason: row.get(5)?,
        created_at: row.get(6)?,
    })
}
