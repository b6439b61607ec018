//! Messaging and user lookup ports used by alert notifications

use async_trait::async_trait;
use transitdesk_domain::{FolderId, MailState, Result, User, UserId};

/// Folder notes and outgoing mail.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    /// Append a note to the folder's log.
    async fn post_note(&self, folder_id: FolderId, body: &str) -> Result<()>;

    /// Send one HTML mail to all recipients.
    ///
    /// Returns `Sent` once a relay accepted the mail, `Queued` when it was
    /// only recorded for later delivery. Callers treat errors as non-fatal.
    async fn send_mail(
        &self,
        recipients: &[String],
        subject: &str,
        body_html: &str,
    ) -> Result<MailState>;
}

/// Read access to users and roles.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get(&self, id: UserId) -> Result<Option<User>>;

    async fn members_of_role(&self, role: &str) -> Result<Vec<User>>;
}
