//! Batch recompute of ETA alerts with a mailed digest.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, instrument, warn};
use transitdesk_domain::constants::{REPORT_MISSING_VALUE, REPORT_UNASSIGNED_OWNER};
use transitdesk_domain::{
    AlertState, AlertsConfig, Folder, FolderQuery, MailState, Result, User, UserId,
};

use super::digest::{digest_subject, render_digest, DigestRow, DigestSummary};
use super::engine::{days_late, days_remaining, evaluate};
use super::notifier::AlertTransitionNotifier;
use super::ports::{MessagingPort, UserDirectory};
use crate::clock::Clock;
use crate::folder::ports::FolderRepository;

/// Digest delivery settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSettings {
    /// Every member of this role receives the digest.
    pub manager_role: String,
    /// Skip the digest on runs that changed nothing.
    pub report_only_on_change: bool,
}

impl From<&AlertsConfig> for ReportSettings {
    fn from(config: &AlertsConfig) -> Self {
        Self {
            manager_role: config.manager_role.clone(),
            report_only_on_change: config.report_only_on_change,
        }
    }
}

/// Result of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Folders whose alert state changed.
    pub updated_count: usize,
    pub overdue: Vec<String>,
    pub danger: Vec<String>,
    pub newly_overdue: Vec<String>,
    pub newly_danger: Vec<String>,
    /// The digest was accepted by the messaging port. Check `report_state`
    /// to tell a relayed mail from one that is only queued.
    pub report_sent: bool,
    /// Delivery state of the digest, `None` when no digest went out.
    pub report_state: Option<MailState>,
}

/// Recomputes the alert state of every active folder with an ETA and mails
/// one digest of everything overdue or in danger.
pub struct AlertBatchReporter {
    folders: Arc<dyn FolderRepository>,
    users: Arc<dyn UserDirectory>,
    messaging: Arc<dyn MessagingPort>,
    notifier: Arc<AlertTransitionNotifier>,
    clock: Arc<dyn Clock>,
    settings: ReportSettings,
}

impl AlertBatchReporter {
    pub fn new(
        folders: Arc<dyn FolderRepository>,
        users: Arc<dyn UserDirectory>,
        messaging: Arc<dyn MessagingPort>,
        notifier: Arc<AlertTransitionNotifier>,
        clock: Arc<dyn Clock>,
        settings: ReportSettings,
    ) -> Self {
        Self { folders, users, messaging, notifier, clock, settings }
    }

    /// Run one batch.
    ///
    /// Only the initial folder listing can fail the run. Per-folder errors
    /// and mail delivery errors are logged and skipped.
    #[instrument(skip(self))]
    pub async fn run_batch(&self) -> Result<BatchReport> {
        let today = self.clock.today();
        let folders = self.folders.list(FolderQuery::with_eta()).await?;

        let mut report = BatchReport::default();
        let mut overdue: Vec<Folder> = Vec::new();
        let mut danger: Vec<Folder> = Vec::new();

        for mut folder in folders {
            let old = folder.alert_state;
            let new = evaluate(today, folder.eta);

            if new != old {
                if let Err(err) = self.folders.set_alert_state(folder.id, new).await {
                    warn!(folder = %folder.name, error = %err, "failed to store alert state");
                    continue;
                }
                folder.alert_state = new;
                self.notifier.notify(&folder, old, new, None).await;
                report.updated_count += 1;
                match new {
                    AlertState::Overdue => report.newly_overdue.push(folder.name.clone()),
                    AlertState::Danger => report.newly_danger.push(folder.name.clone()),
                    AlertState::Open => {}
                }
            }

            match new {
                AlertState::Overdue => overdue.push(folder),
                AlertState::Danger => danger.push(folder),
                AlertState::Open => {}
            }
        }

        overdue.sort_by(|a, b| a.name.cmp(&b.name));
        danger.sort_by(|a, b| a.name.cmp(&b.name));
        report.newly_overdue.sort();
        report.newly_danger.sort();
        report.overdue = overdue.iter().map(|folder| folder.name.clone()).collect();
        report.danger = danger.iter().map(|folder| folder.name.clone()).collect();

        info!(
            updated = report.updated_count,
            overdue = overdue.len(),
            danger = danger.len(),
            "alert recompute finished"
        );

        if overdue.is_empty() && danger.is_empty() {
            return Ok(report);
        }
        if self.settings.report_only_on_change && report.updated_count == 0 {
            info!("no alert changes; digest skipped");
            return Ok(report);
        }

        report.report_state = self.send_digest(today, &overdue, &danger, &report).await;
        report.report_sent = report.report_state.is_some();
        Ok(report)
    }

    async fn send_digest(
        &self,
        today: NaiveDate,
        overdue: &[Folder],
        danger: &[Folder],
        report: &BatchReport,
    ) -> Option<MailState> {
        let owners = self.load_owners(overdue.iter().chain(danger)).await;

        let mut recipients: BTreeSet<String> = owners
            .values()
            .filter_map(|user| user.mail_address().map(str::to_string))
            .collect();
        match self.users.members_of_role(&self.settings.manager_role).await {
            Ok(managers) => recipients
                .extend(managers.iter().filter_map(|user| user.mail_address().map(str::to_string))),
            Err(err) => {
                warn!(role = %self.settings.manager_role, error = %err, "failed to load managers");
            }
        }

        if recipients.is_empty() {
            warn!("no recipients with an email address; digest not sent");
            return None;
        }

        let summary = DigestSummary {
            overdue: overdue.len(),
            danger: danger.len(),
            newly_overdue: report.newly_overdue.len(),
            newly_danger: report.newly_danger.len(),
        };
        let overdue_rows: Vec<_> = overdue
            .iter()
            .filter_map(|folder| digest_row(folder, &owners, |eta| days_late(today, eta)))
            .collect();
        let danger_rows: Vec<_> = danger
            .iter()
            .filter_map(|folder| digest_row(folder, &owners, |eta| days_remaining(today, eta)))
            .collect();

        let subject = digest_subject(today, &summary);
        let body = render_digest(today, &summary, &overdue_rows, &danger_rows);
        let recipients: Vec<String> = recipients.into_iter().collect();

        match self.messaging.send_mail(&recipients, &subject, &body).await {
            Ok(state) => {
                info!(recipients = recipients.len(), %subject, %state, "alert digest sent");
                Some(state)
            }
            Err(err) => {
                warn!(error = %err, "failed to send alert digest");
                None
            }
        }
    }

    async fn load_owners<'a>(
        &self,
        folders: impl Iterator<Item = &'a Folder>,
    ) -> HashMap<UserId, User> {
        let ids: BTreeSet<UserId> = folders.filter_map(|folder| folder.user_id).collect();
        let mut owners = HashMap::with_capacity(ids.len());
        for id in ids {
            match self.users.get(id).await {
                Ok(Some(user)) => {
                    owners.insert(id, user);
                }
                Ok(None) => {}
                Err(err) => warn!(user_id = id, error = %err, "failed to load folder owner"),
            }
        }
        owners
    }
}

fn digest_row(
    folder: &Folder,
    owners: &HashMap<UserId, User>,
    days: impl Fn(NaiveDate) -> i64,
) -> Option<DigestRow> {
    let eta = folder.eta?;
    let owner = folder
        .user_id
        .and_then(|id| owners.get(&id))
        .map_or_else(|| REPORT_UNASSIGNED_OWNER.to_string(), |user| user.name.clone());
    Some(DigestRow {
        case_number: folder.name.clone(),
        customer: folder.customer.clone().unwrap_or_else(|| REPORT_MISSING_VALUE.to_string()),
        eta,
        days: days(eta),
        owner,
        bill_of_lading: folder
            .bill_of_lading
            .clone()
            .unwrap_or_else(|| REPORT_MISSING_VALUE.to_string()),
    })
}
