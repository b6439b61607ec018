//! Folder (dossier) entity and its owned collections.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{AccountId, AnalyticDistribution, FolderId, StageId, UserId};
use crate::constants::{
    ACCONAGE_CASE_COUNTER, CASE_NUMBER_WIDTH, SHIPPING_CASE_COUNTER, TRANSIT_CASE_COUNTER,
};
use crate::impl_domain_status_conversions;

/// Business line a folder belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    /// Customs declaration.
    Transit,
    /// Acconage (stevedoring).
    Accone,
    /// Shipping.
    Ship,
}

impl_domain_status_conversions!(StageKind {
    Transit => "transit",
    Accone => "accone",
    Ship => "ship",
});

impl StageKind {
    /// Name of the counter case numbers are drawn from.
    pub const fn case_counter(self) -> &'static str {
        match self {
            Self::Transit => TRANSIT_CASE_COUNTER,
            Self::Accone => ACCONAGE_CASE_COUNTER,
            Self::Ship => SHIPPING_CASE_COUNTER,
        }
    }

    const fn case_prefix(self) -> &'static str {
        match self {
            Self::Transit => "TR",
            Self::Accone => "AC",
            Self::Ship => "SH",
        }
    }

    /// Formats a counter value as a case number, e.g. `TR00042`.
    pub fn format_case_number(self, value: i64) -> String {
        format!("{}{:0width$}", self.case_prefix(), value, width = CASE_NUMBER_WIDTH)
    }
}

/// ETA alert state cached on each folder.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    #[default]
    Open,
    Danger,
    Overdue,
}

impl_domain_status_conversions!(AlertState {
    Open => "open",
    Danger => "danger",
    Overdue => "overdue",
});

/// Optional customs and logistics milestones of a folder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolderMilestones {
    pub declaration: Option<NaiveDate>,
    pub guce: Option<NaiveDate>,
    pub validation: Option<NaiveDate>,
    pub avi_rvc: Option<NaiveDate>,
    pub provisional: Option<NaiveDate>,
    pub liquidation: Option<NaiveDate>,
    pub pad_deposit: Option<NaiveDate>,
    pub receipt: Option<NaiveDate>,
    pub bad: Option<NaiveDate>,
    pub bill_of_lading: Option<NaiveDate>,
    pub exit: Option<NaiveDate>,
}

/// A freight transit case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    /// Zero until persisted.
    pub id: FolderId,
    pub name: String,
    pub stage_kind: StageKind,
    pub stage_id: Option<StageId>,
    pub stage_number: i32,
    pub alert_state: AlertState,
    pub eta: Option<NaiveDate>,
    pub date_open: NaiveDate,
    pub date_close: Option<NaiveDate>,
    pub deadline: Option<NaiveDate>,
    pub milestones: FolderMilestones,
    pub customer: Option<String>,
    pub user_id: Option<UserId>,
    pub bill_of_lading: Option<String>,
    pub order_reference: Option<String>,
    pub besc: Option<String>,
    pub rvc: Option<String>,
    pub goods: Option<String>,
    pub analytic_account_id: Option<AccountId>,
    pub analytic_distribution: AnalyticDistribution,
    /// Activity types configured for the kind when the folder was created.
    pub task_total: i64,
    pub active: bool,
}

impl Folder {
    /// Build an unsaved folder with default state.
    pub fn draft(name: impl Into<String>, stage_kind: StageKind, date_open: NaiveDate) -> Self {
        Self {
            id: 0,
            name: name.into(),
            stage_kind,
            stage_id: None,
            stage_number: 0,
            alert_state: AlertState::Open,
            eta: None,
            date_open,
            date_close: None,
            deadline: None,
            milestones: FolderMilestones::default(),
            customer: None,
            user_id: None,
            bill_of_lading: None,
            order_reference: None,
            besc: None,
            rvc: None,
            goods: None,
            analytic_account_id: None,
            analytic_distribution: AnalyticDistribution::default(),
            task_total: 0,
            active: true,
        }
    }

    pub const fn is_persisted(&self) -> bool {
        self.id > 0
    }
}

/// Input for folder creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFolder {
    /// Explicit case number; `None` or the placeholder draws one from the
    /// kind's counter.
    pub name: Option<String>,
    pub stage_kind: Option<StageKind>,
    pub eta: Option<NaiveDate>,
    pub date_open: Option<NaiveDate>,
    pub deadline: Option<NaiveDate>,
    pub customer: Option<String>,
    pub user_id: Option<UserId>,
    pub bill_of_lading: Option<String>,
    pub order_reference: Option<String>,
    pub besc: Option<String>,
    pub rvc: Option<String>,
    pub goods: Option<String>,
}

impl NewFolder {
    pub fn new(stage_kind: StageKind) -> Self {
        Self { stage_kind: Some(stage_kind), ..Self::default() }
    }

    pub fn with_eta(mut self, eta: NaiveDate) -> Self {
        self.eta = Some(eta);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_owner(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_customer(mut self, customer: impl Into<String>) -> Self {
        self.customer = Some(customer.into());
        self
    }
}

/// Folder listing filter.
///
/// Archived folders are excluded unless `include_archived` is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FolderQuery {
    pub include_archived: bool,
    pub with_eta_only: bool,
    pub stage_kind: Option<StageKind>,
}

impl FolderQuery {
    /// Active folders that carry an ETA.
    pub const fn with_eta() -> Self {
        Self { include_archived: false, with_eta_only: true, stage_kind: None }
    }
}

/// Kind of a folder line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderLineKind {
    /// Services rendered and disbursements (debours).
    Service,
    /// Merchandise and invoiced goods.
    Merchandise,
}

impl_domain_status_conversions!(FolderLineKind {
    Service => "service",
    Merchandise => "merchandise",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderLine {
    pub id: i64,
    pub folder_id: FolderId,
    pub kind: FolderLineKind,
    pub description: String,
    pub quantity: f64,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFolderLine {
    pub folder_id: FolderId,
    pub kind: FolderLineKind,
    pub description: String,
    pub quantity: f64,
    pub amount: f64,
}

/// Container tracked for a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageLine {
    pub id: i64,
    pub folder_id: FolderId,
    pub container_number: String,
    pub container_type: Option<String>,
    pub received_on: Option<NaiveDate>,
    pub output_on: Option<NaiveDate>,
    pub delivered_on: Option<NaiveDate>,
    pub removed_on: Option<NaiveDate>,
    pub returned_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPackageLine {
    pub folder_id: FolderId,
    pub container_number: String,
    pub container_type: Option<String>,
    pub received_on: Option<NaiveDate>,
    pub output_on: Option<NaiveDate>,
    pub delivered_on: Option<NaiveDate>,
    pub removed_on: Option<NaiveDate>,
    pub returned_on: Option<NaiveDate>,
}
