//! Application context - dependency injection container

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{info, warn};
use transitdesk_core::{
    AlertBatchReporter, AlertTransitionNotifier, AnalyticDistributionAggregator, BatchReport,
    Clock, FolderLifecycleController, FolderPorts, ReportSettings, SystemClock,
};
use transitdesk_domain::{Config, Result, TransitDeskError};
use transitdesk_infra::{
    AlertJob, AlertScheduler, AlertSchedulerConfig, DbManager, DeskMessenger, SmtpMailer,
    SqlCipherActivityRepository, SqlCipherAnalyticRepository, SqlCipherChecklistRepository,
    SqlCipherFolderRepository, SqlCipherMessageRepository, SqlCipherSequenceRepository,
    SqlCipherStageRepository, SqlCipherUserDirectory,
};

use crate::utils::health::{ComponentHealth, HealthStatus};

const SCHEDULER_START_TIMEOUT: Duration = Duration::from_secs(10);

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub folders: Arc<FolderLifecycleController>,
    pub analytics: Arc<AnalyticDistributionAggregator>,
    pub alert_reporter: Arc<AlertBatchReporter>,
    pub notifier: Arc<AlertTransitionNotifier>,
    pub messenger: Arc<DeskMessenger>,

    /// `None` when the alert batch is disabled or after shutdown.
    alert_scheduler: Mutex<Option<AlertScheduler>>,
}

impl AppContext {
    /// Build the context on the wall clock.
    pub async fn new_with_config(config: Config) -> Result<Self> {
        Self::new_with_clock(config, Arc::new(SystemClock)).await
    }

    /// Build the context, run migrations and start the alert scheduler
    /// (fail-fast).
    pub async fn new_with_clock(config: Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let db = Arc::new(DbManager::from_config(&config.database)?);
        db.run_migrations()?;

        let mailer = SmtpMailer::from_config(&config.mail).map_err(TransitDeskError::from)?;
        match &mailer {
            Some(mailer) => info!(smtp_host = mailer.host(), "mail delivery enabled"),
            None => warn!("no SMTP host configured; mails will only be recorded"),
        }
        let messenger = Arc::new(DeskMessenger::new(
            SqlCipherMessageRepository::new(Arc::clone(&db)),
            mailer,
        ));

        let folder_repository = Arc::new(SqlCipherFolderRepository::new(Arc::clone(&db)));
        let activities = Arc::new(SqlCipherActivityRepository::new(Arc::clone(&db)));
        let analytic = Arc::new(SqlCipherAnalyticRepository::new(Arc::clone(&db)));
        let users = Arc::new(SqlCipherUserDirectory::new(Arc::clone(&db)));

        let notifier = Arc::new(AlertTransitionNotifier::new(
            messenger.clone(),
            activities.clone(),
            Arc::clone(&clock),
        ));

        let ports = FolderPorts {
            folders: folder_repository.clone(),
            stages: Arc::new(SqlCipherStageRepository::new(Arc::clone(&db))),
            checklist: Arc::new(SqlCipherChecklistRepository::new(Arc::clone(&db))),
            activities,
            analytic: analytic.clone(),
            sequence: Arc::new(SqlCipherSequenceRepository::new(Arc::clone(&db))),
            users: users.clone(),
        };
        let folders =
            Arc::new(FolderLifecycleController::new(ports, notifier.clone(), Arc::clone(&clock)));
        let analytics = Arc::new(AnalyticDistributionAggregator::new(analytic));

        let alert_reporter = Arc::new(AlertBatchReporter::new(
            folder_repository,
            users,
            messenger.clone(),
            notifier.clone(),
            clock,
            ReportSettings::from(&config.alerts),
        ));

        let alert_scheduler = if config.alerts.enabled {
            Some(create_alert_scheduler(&config, alert_reporter.clone()).await?)
        } else {
            info!("alert batch disabled by configuration");
            None
        };

        Ok(Self {
            config,
            db,
            folders,
            analytics,
            alert_reporter,
            notifier,
            messenger,
            alert_scheduler: Mutex::new(alert_scheduler),
        })
    }

    /// Run one alert batch now, outside the cron schedule.
    pub async fn run_alert_batch(&self) -> Result<BatchReport> {
        self.alert_reporter.run_batch().await
    }

    pub async fn alert_scheduler_running(&self) -> bool {
        self.alert_scheduler.lock().await.as_ref().is_some_and(AlertScheduler::is_running)
    }

    /// Check health of all application components
    ///
    /// The daemon counts as healthy when at least 80% of the components are.
    pub async fn health_check(&self) -> HealthStatus {
        let mut status = HealthStatus::new()
            .add_component(self.check_database_health().await)
            .add_component(self.check_scheduler_health().await)
            .add_component(if self.messenger.delivers_mail() {
                ComponentHealth::healthy("mail")
            } else {
                ComponentHealth::degraded("mail", "no SMTP relay; mails stay queued")
            });

        status.calculate_score();
        status
    }

    /// Runs the probe query on the blocking pool.
    async fn check_database_health(&self) -> ComponentHealth {
        let db = Arc::clone(&self.db);
        match tokio::task::spawn_blocking(move || db.health_check()).await {
            Ok(Ok(())) => ComponentHealth::healthy("database"),
            Ok(Err(e)) => {
                warn!(error = %e, "database health check failed");
                ComponentHealth::unhealthy("database", format!("query failed: {e}"))
            }
            Err(e) => {
                tracing::error!(error = %e, "database health check task panicked");
                ComponentHealth::unhealthy("database", format!("task panic: {e}"))
            }
        }
    }

    async fn check_scheduler_health(&self) -> ComponentHealth {
        if !self.config.alerts.enabled {
            return ComponentHealth::degraded("alert_scheduler", "disabled by configuration");
        }
        if self.alert_scheduler_running().await {
            ComponentHealth::healthy("alert_scheduler")
        } else {
            ComponentHealth::unhealthy("alert_scheduler", "not running")
        }
    }

    /// Stop the alert scheduler. Safe to call more than once.
    pub async fn shutdown(&self) -> Result<()> {
        info!("shutdown called on AppContext");

        let Some(mut scheduler) = self.alert_scheduler.lock().await.take() else {
            return Ok(());
        };
        if scheduler.is_running() {
            scheduler.stop().await?;
        }
        Ok(())
    }
}

async fn create_alert_scheduler(
    config: &Config,
    reporter: Arc<AlertBatchReporter>,
) -> Result<AlertScheduler> {
    let job: Arc<dyn AlertJob> = reporter;
    let scheduler_config = AlertSchedulerConfig::from(&config.alerts);

    let mut scheduler = AlertScheduler::with_config(scheduler_config, job).await.map_err(|err| {
        tracing::error!(error = %err, "failed to construct AlertScheduler");
        TransitDeskError::from(err)
    })?;

    tokio::time::timeout(SCHEDULER_START_TIMEOUT, scheduler.start())
        .await
        .map_err(|_| {
            tracing::error!(
                timeout_secs = SCHEDULER_START_TIMEOUT.as_secs(),
                "AlertScheduler start timed out"
            );
            TransitDeskError::Scheduling("AlertScheduler start timed out".into())
        })?
        .map_err(|err| {
            tracing::error!(error = %err, "failed to start AlertScheduler");
            TransitDeskError::from(err)
        })?;

    info!(cron = %config.alerts.cron_expression, "alert scheduler running");
    Ok(scheduler)
}
