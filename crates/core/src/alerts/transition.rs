//! Alert state transitions and the messages they produce.

use chrono::NaiveDate;
use transitdesk_domain::constants::{ACTIVITY_ALERT_DANGER, ACTIVITY_ALERT_OVERDUE};
use transitdesk_domain::AlertState;

/// A change of alert state worth telling someone about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertTransition {
    /// open -> danger
    EnteredDanger,
    /// open -> overdue
    BecameOverdue,
    /// danger -> overdue
    EscalatedToOverdue,
    /// danger -> open
    DangerCleared,
    /// overdue -> open
    OverdueCleared,
    /// overdue -> danger
    OverdueEased,
}

/// Follow-up activity requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowUp {
    pub activity_type_key: &'static str,
    pub summary: String,
    pub note: String,
}

impl AlertTransition {
    /// `None` when the states are equal.
    pub const fn between(from: AlertState, to: AlertState) -> Option<Self> {
        match (from, to) {
            (AlertState::Open, AlertState::Danger) => Some(Self::EnteredDanger),
            (AlertState::Open, AlertState::Overdue) => Some(Self::BecameOverdue),
            (AlertState::Danger, AlertState::Overdue) => Some(Self::EscalatedToOverdue),
            (AlertState::Danger, AlertState::Open) => Some(Self::DangerCleared),
            (AlertState::Overdue, AlertState::Open) => Some(Self::OverdueCleared),
            (AlertState::Overdue, AlertState::Danger) => Some(Self::OverdueEased),
            (AlertState::Open, AlertState::Open)
            | (AlertState::Danger, AlertState::Danger)
            | (AlertState::Overdue, AlertState::Overdue) => None,
        }
    }

    /// Note posted on the folder.
    pub fn message(self, case_number: &str) -> String {
        match self {
            Self::EnteredDanger => format!(
                "⚠️ Warning: folder {case_number} has entered the alert window (ETA in 3 days or less)"
            ),
            Self::BecameOverdue => {
                format!("🚨 Urgent: folder {case_number} is overdue (ETA has passed)")
            }
            Self::EscalatedToOverdue => format!("🚨 Critical: folder {case_number} is now overdue"),
            Self::DangerCleared => format!("✅ Folder {case_number} is no longer on alert"),
            Self::OverdueCleared => format!("✅ Folder {case_number} is no longer overdue"),
            Self::OverdueEased => {
                format!("⚠️ Folder {case_number} is no longer overdue but remains on alert")
            }
        }
    }

    /// Only transitions out of `Open` ask for a follow-up activity.
    pub fn follow_up(self, case_number: &str, eta: Option<NaiveDate>) -> Option<FollowUp> {
        let eta = eta
            .map_or_else(|| "unknown".to_string(), |eta| eta.format("%d/%m/%Y").to_string());
        match self {
            Self::BecameOverdue => Some(FollowUp {
                activity_type_key: ACTIVITY_ALERT_OVERDUE,
                summary: format!("URGENT - Folder {case_number} overdue"),
                note: format!(
                    "Folder {case_number} is overdue. The ETA was {eta}. Immediate action required."
                ),
            }),
            Self::EnteredDanger => Some(FollowUp {
                activity_type_key: ACTIVITY_ALERT_DANGER,
                summary: format!("Alert - Folder {case_number} due soon"),
                note: format!(
                    "Folder {case_number} is approaching its ETA ({eta}). Check that everything is ready."
                ),
            }),
            Self::EscalatedToOverdue
            | Self::DangerCleared
            | Self::OverdueCleared
            | Self::OverdueEased => None,
        }
    }
}
