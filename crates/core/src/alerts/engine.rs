//! ETA alert evaluation.

use chrono::{Duration, NaiveDate};
use transitdesk_domain::constants::DANGER_WINDOW_DAYS;
use transitdesk_domain::AlertState;

/// Classify a folder's ETA relative to `today`.
///
/// - no ETA: `Open`
/// - ETA in the past: `Overdue`
/// - ETA within the next [`DANGER_WINDOW_DAYS`] days, today included: `Danger`
/// - later: `Open`
pub fn evaluate(today: NaiveDate, eta: Option<NaiveDate>) -> AlertState {
    match eta {
        None => AlertState::Open,
        Some(eta) if eta < today => AlertState::Overdue,
        Some(eta) if eta <= today + Duration::days(DANGER_WINDOW_DAYS) => AlertState::Danger,
        Some(_) => AlertState::Open,
    }
}

/// Days the ETA lies in the past.
pub fn days_late(today: NaiveDate, eta: NaiveDate) -> i64 {
    today.signed_duration_since(eta).num_days()
}

/// Days until the ETA.
pub fn days_remaining(today: NaiveDate, eta: NaiveDate) -> i64 {
    eta.signed_duration_since(today).num_days()
}
