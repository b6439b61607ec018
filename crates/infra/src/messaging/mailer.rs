//! SMTP delivery via `lettre`.
//!
//! [`SmtpMailer::from_config`] returns `None` when no SMTP host is
//! configured; callers then keep mails in the log without sending them.

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, instrument};
use transitdesk_domain::{MailConfig, TransitDeskError};

use crate::errors::InfraError;

/// Sends HTML mails through one STARTTLS relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    host: String,
}

impl SmtpMailer {
    /// Build a mailer, or `None` when `smtp_host` is unset.
    pub fn from_config(config: &MailConfig) -> Result<Option<Self>, InfraError> {
        let Some(host) = config.smtp_host.as_deref().filter(|h| !h.trim().is_empty()) else {
            return Ok(None);
        };

        let from: Mailbox = config.from_address.parse()?;
        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?.port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Some(Self { transport: builder.build(), from, host: host.to_string() }))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Send one HTML mail addressed to every recipient.
    #[instrument(skip(self, body_html), fields(recipients = recipients.len()))]
    pub async fn send(
        &self,
        recipients: &[String],
        subject: &str,
        body_html: &str,
    ) -> Result<(), InfraError> {
        let message = build_message(&self.from, recipients, subject, body_html)?;
        self.transport.send(message).await?;
        debug!(host = %self.host, "Mail handed to SMTP relay");
        Ok(())
    }
}

fn build_message(
    from: &Mailbox,
    recipients: &[String],
    subject: &str,
    body_html: &str,
) -> Result<Message, InfraError> {
    if recipients.is_empty() {
        return Err(InfraError(TransitDeskError::Messaging("mail has no recipients".into())));
    }

    let mut builder = Message::builder().from(from.clone()).subject(subject);
    for recipient in recipients {
        builder = builder.to(recipient.parse::<Mailbox>()?);
    }

    Ok(builder.header(ContentType::TEXT_HTML).body(body_html.to_string())?)
}
