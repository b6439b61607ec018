//! Outgoing folder notes and mail

pub mod mailer;
pub mod messenger;

pub use mailer::SmtpMailer;
pub use messenger::DeskMessenger;
