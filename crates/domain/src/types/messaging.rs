//! Folder notes and outgoing mail records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::FolderId;
use crate::impl_domain_status_conversions;

/// Entry in a folder's note log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderNote {
    pub id: i64,
    pub folder_id: FolderId,
    pub body: String,
    pub posted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailState {
    Queued,
    Sent,
    Failed,
}

impl_domain_status_conversions!(MailState {
    Queued => "queued",
    Sent => "sent",
    Failed => "failed",
});

/// Outgoing mail and its delivery outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailMessage {
    pub id: i64,
    pub recipients: Vec<String>,
    pub subject: String,
    pub body_html: String,
    pub state: MailState,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}
