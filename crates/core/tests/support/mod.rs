//! Shared test helpers for `transitdesk-core` integration tests.
//!
//! A single in-memory store implements every port so scenarios can seed
//! data, run a service and inspect the side effects in one place.

#![allow(dead_code)]

pub mod repositories;

use std::sync::Arc;

use chrono::NaiveDate;
use transitdesk_core::{
    AlertBatchReporter, AlertTransitionNotifier, AnalyticDistributionAggregator, FixedClock,
    FolderLifecycleController, FolderPorts, ReportSettings,
};
use transitdesk_domain::AlertsConfig;

pub use repositories::InMemoryStore;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Services wired against one store and a fixed clock.
pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub clock: Arc<FixedClock>,
    pub notifier: Arc<AlertTransitionNotifier>,
    pub reporter: AlertBatchReporter,
    pub lifecycle: FolderLifecycleController,
    pub aggregator: AnalyticDistributionAggregator,
}

impl Harness {
    /// Harness with the shipped alert settings.
    pub fn new(today: NaiveDate) -> Self {
        Self::with_settings(today, ReportSettings::from(&AlertsConfig::default()))
    }

    pub fn with_settings(today: NaiveDate, settings: ReportSettings) -> Self {
        let store = Arc::new(InMemoryStore::default());
        let clock = Arc::new(FixedClock::new(today));
        let notifier = Arc::new(AlertTransitionNotifier::new(
            store.clone(),
            store.clone(),
            clock.clone(),
        ));
        let reporter = AlertBatchReporter::new(
            store.clone(),
            store.clone(),
            store.clone(),
            notifier.clone(),
            clock.clone(),
            settings,
        );
        let ports = FolderPorts {
            folders: store.clone(),
            stages: store.clone(),
            checklist: store.clone(),
            activities: store.clone(),
            analytic: store.clone(),
            sequence: store.clone(),
            users: store.clone(),
        };
        let lifecycle = FolderLifecycleController::new(ports, notifier.clone(), clock.clone());
        let aggregator = AnalyticDistributionAggregator::new(store.clone());
        Self { store, clock, notifier, reporter, lifecycle, aggregator }
    }
}
