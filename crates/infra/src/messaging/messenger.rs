//! [`MessagingPort`] backed by the folder note table and the mail log.

use async_trait::async_trait;
use tracing::{info, warn};
use transitdesk_core::MessagingPort;
use transitdesk_domain::{FolderId, MailState, Result as DomainResult, TransitDeskError};

use super::mailer::SmtpMailer;
use crate::database::SqlCipherMessageRepository;

/// Notes go straight to the database. Mails are logged as `queued`, then
/// marked `sent` or `failed` once the relay answers. Without a mailer they
/// stay `queued`.
pub struct DeskMessenger {
    messages: SqlCipherMessageRepository,
    mailer: Option<SmtpMailer>,
}

impl DeskMessenger {
    pub fn new(messages: SqlCipherMessageRepository, mailer: Option<SmtpMailer>) -> Self {
        Self { messages, mailer }
    }

    pub fn delivers_mail(&self) -> bool {
        self.mailer.is_some()
    }
}

#[async_trait]
impl MessagingPort for DeskMessenger {
    async fn post_note(&self, folder_id: FolderId, body: &str) -> DomainResult<()> {
        self.messages.insert_note(folder_id, body).await?;
        Ok(())
    }

    async fn send_mail(
        &self,
        recipients: &[String],
        subject: &str,
        body_html: &str,
    ) -> DomainResult<MailState> {
        let logged = self.messages.record_mail(recipients, subject, body_html).await?;

        let Some(mailer) = &self.mailer else {
            info!(mail_id = logged.id, "No SMTP relay configured; mail left queued");
            return Ok(MailState::Queued);
        };

        match mailer.send(recipients, subject, body_html).await {
            Ok(()) => {
                self.messages.set_mail_state(logged.id, MailState::Sent, None).await?;
                Ok(MailState::Sent)
            }
            Err(err) => {
                let reason = err.0.to_string();
                warn!(mail_id = logged.id, error = %reason, "Mail delivery failed");
                self.messages
                    .set_mail_state(logged.id, MailState::Failed, Some(reason.clone()))
                    .await?;
                Err(TransitDeskError::Messaging(reason))
            }
        }
    }
}
