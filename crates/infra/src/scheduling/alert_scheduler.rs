//! Cron-driven ETA alert batch.
//!
//! Wraps `tokio-cron-scheduler` with an explicit start/stop lifecycle. Each
//! tick runs one [`AlertJob`] under a timeout; failures and timeouts are
//! logged and never stop the schedule.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use transitdesk_core::AlertBatchReporter;
use transitdesk_domain::AlertsConfig;
use uuid::Uuid;

use super::error::{SchedulerError, SchedulerResult};
use crate::errors::InfraError;

/// Unit of work executed on every tick.
#[async_trait]
pub trait AlertJob: Send + Sync {
    async fn run(&self) -> Result<(), InfraError>;
}

#[async_trait]
impl AlertJob for AlertBatchReporter {
    async fn run(&self) -> Result<(), InfraError> {
        let report = self.run_batch().await?;
        info!(
            updated = report.updated_count,
            overdue = report.overdue.len(),
            danger = report.danger.len(),
            report_sent = report.report_sent,
            report_state = ?report.report_state,
            "ETA alert batch finished"
        );
        Ok(())
    }
}

/// Configuration for [`AlertScheduler`].
#[derive(Debug, Clone)]
pub struct AlertSchedulerConfig {
    /// Six-field cron expression (seconds first).
    pub cron_expression: String,
    /// Upper bound for one batch run.
    pub job_timeout: Duration,
    /// Timeout for starting the scheduler.
    pub start_timeout: Duration,
    /// Timeout for stopping the scheduler.
    pub stop_timeout: Duration,
    /// Timeout for awaiting the monitor task join handle.
    pub join_timeout: Duration,
}

impl Default for AlertSchedulerConfig {
    fn default() -> Self {
        Self::from(&AlertsConfig::default())
    }
}

impl From<&AlertsConfig> for AlertSchedulerConfig {
    fn from(config: &AlertsConfig) -> Self {
        Self {
            cron_expression: config.cron_expression.clone(),
            job_timeout: Duration::from_secs(config.job_timeout_seconds),
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(5),
        }
    }
}

/// Alert scheduler with explicit lifecycle management.
pub struct AlertScheduler {
    scheduler: Arc<RwLock<JobScheduler>>,
    config: AlertSchedulerConfig,
    job_id: Uuid,
    monitor_handle: Option<JoinHandle<()>>,
    cancellation: CancellationToken,
    job: Arc<dyn AlertJob>,
}

impl AlertScheduler {
    /// Create a scheduler and register the job. An invalid cron expression
    /// fails here, not on `start`.
    pub async fn with_config(
        config: AlertSchedulerConfig,
        job: Arc<dyn AlertJob>,
    ) -> SchedulerResult<Self> {
        let raw_scheduler = JobScheduler::new()
            .await
            .map_err(|e| SchedulerError::CreationFailed(e.to_string()))?;

        let mut scheduler = Self {
            scheduler: Arc::new(RwLock::new(raw_scheduler)),
            config,
            job_id: Uuid::nil(),
            monitor_handle: None,
            cancellation: CancellationToken::new(),
            job,
        };

        scheduler.job_id = scheduler.register_alert_job().await?;
        Ok(scheduler)
    }

    /// Identifier of the registered cron job.
    pub const fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Start the scheduler, spawning the monitoring task.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        let scheduler = Arc::clone(&self.scheduler);
        let start_timeout = self.config.start_timeout;
        let start_result = tokio::time::timeout(start_timeout, async move {
            let guard = scheduler.write().await;
            guard.start().await
        })
        .await
        .map_err(|_| SchedulerError::Timeout { seconds: start_timeout.as_secs() })?;

        start_result.map_err(|e| SchedulerError::StartFailed(e.to_string()))?;

        let cancel = self.cancellation.clone();
        let handle = tokio::spawn(async move {
            cancel.cancelled().await;
            debug!("Alert scheduler monitor cancelled");
        });

        self.monitor_handle = Some(handle);
        info!(cron = %self.config.cron_expression, "Alert scheduler started");
        Ok(())
    }

    /// Stop the scheduler and wait for the monitor task to finish.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation.cancel();

        let scheduler = Arc::clone(&self.scheduler);
        let stop_timeout = self.config.stop_timeout;
        let stop_result = tokio::time::timeout(stop_timeout, async move {
            let mut guard = scheduler.write().await;
            guard.shutdown().await
        })
        .await
        .map_err(|_| SchedulerError::Timeout { seconds: stop_timeout.as_secs() })?;

        stop_result.map_err(|e| SchedulerError::StopFailed(e.to_string()))?;

        if let Some(handle) = self.monitor_handle.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: join_timeout.as_secs() })?
                .map_err(|e| SchedulerError::TaskJoinFailed(e.to_string()))?;
        }

        info!("Alert scheduler stopped");
        self.cancellation = CancellationToken::new();
        Ok(())
    }

    /// Returns true when the monitor task is active.
    pub fn is_running(&self) -> bool {
        self.monitor_handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    async fn register_alert_job(&mut self) -> SchedulerResult<Uuid> {
        if self.job_id != Uuid::nil() {
            return Ok(self.job_id);
        }

        let job = Arc::clone(&self.job);
        let job_timeout = self.config.job_timeout;

        let job_definition = Job::new_async(self.config.cron_expression.as_str(), move |_id, _lock| {
            let job = Arc::clone(&job);

            Box::pin(async move {
                let started = Instant::now();

                match tokio::time::timeout(job_timeout, job.run()).await {
                    Ok(Ok(())) => {
                        debug!(elapsed_ms = started.elapsed().as_millis(), "Alert batch succeeded");
                    }
                    Ok(Err(err)) => {
                        error!(error = %err.0, "Alert batch failed");
                    }
                    Err(_) => {
                        warn!(timeout_secs = job_timeout.as_secs(), "Alert batch timed out");
                    }
                }
            })
        })
        .map_err(|e| SchedulerError::JobRegistrationFailed(e.to_string()))?;

        let job_id = job_definition.guid();
        let scheduler = self.scheduler.write().await;
        scheduler
            .add(job_definition)
            .await
            .map_err(|e| SchedulerError::JobRegistrationFailed(e.to_string()))?;

        debug!(cron = %self.config.cron_expression, job_id = %job_id, "Registered alert batch job");
        Ok(job_id)
    }
}

impl Drop for AlertScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("AlertScheduler dropped while running; cancelling tasks");
            self.cancellation.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use transitdesk_domain::TransitDeskError;

    use super::*;

    struct CountingJob {
        runs: AtomicUsize,
        fail: bool,
    }

    impl CountingJob {
        fn new(fail: bool) -> Self {
            Self { runs: AtomicUsize::new(0), fail }
        }

        fn run_count(&self) -> usize {
            self.runs.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AlertJob for CountingJob {
        async fn run(&self) -> Result<(), InfraError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(InfraError(TransitDeskError::Database("locked".into())));
            }
            Ok(())
        }
    }

    fn fast_config() -> AlertSchedulerConfig {
        AlertSchedulerConfig {
            cron_expression: "*/1 * * * * *".into(),
            job_timeout: Duration::from_secs(2),
            start_timeout: Duration::from_secs(2),
            stop_timeout: Duration::from_secs(2),
            join_timeout: Duration::from_secs(2),
        }
    }

    #[test]
    fn config_follows_alert_settings() {
        let alerts = AlertsConfig { job_timeout_seconds: 42, ..AlertsConfig::default() };
        let config = AlertSchedulerConfig::from(&alerts);
        assert_eq!(config.cron_expression, "0 0 7 * * *");
        assert_eq!(config.job_timeout, Duration::from_secs(42));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn lifecycle_runs_successfully() {
        let job = Arc::new(CountingJob::new(false));
        let mut scheduler =
            AlertScheduler::with_config(fast_config(), job.clone()).await.expect("created");
        assert_ne!(scheduler.job_id(), Uuid::nil());

        scheduler.start().await.expect("start succeeds");
        assert!(scheduler.is_running());
        tokio::time::sleep(Duration::from_secs(2)).await;
        scheduler.stop().await.expect("stop succeeds");

        assert!(job.run_count() >= 1);
        assert!(!scheduler.is_running());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failing_job_keeps_schedule_alive() {
        let job = Arc::new(CountingJob::new(true));
        let mut scheduler =
            AlertScheduler::with_config(fast_config(), job.clone()).await.expect("created");

        scheduler.start().await.expect("start succeeds");
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(scheduler.is_running());
        scheduler.stop().await.expect("stop succeeds");

        assert!(job.run_count() >= 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn double_start_is_rejected() {
        let job = Arc::new(CountingJob::new(false));
        let mut scheduler =
            AlertScheduler::with_config(fast_config(), job).await.expect("created");

        scheduler.start().await.expect("first start");
        let err = scheduler.start().await.expect_err("second start fails");
        assert!(matches!(err, SchedulerError::AlreadyRunning));
        scheduler.stop().await.expect("stop succeeds");
    }

    #[tokio::test]
    async fn stop_without_start_is_rejected() {
        let job = Arc::new(CountingJob::new(false));
        let mut scheduler =
            AlertScheduler::with_config(fast_config(), job).await.expect("created");

        let err = scheduler.stop().await.expect_err("not running");
        assert!(matches!(err, SchedulerError::NotRunning));
    }

    #[tokio::test]
    async fn invalid_cron_fails_registration() {
        let job = Arc::new(CountingJob::new(false));
        let config = AlertSchedulerConfig { cron_expression: "not a cron".into(), ..fast_config() };

        let err = AlertScheduler::with_config(config, job).await.err().expect("rejected");
        assert!(matches!(err, SchedulerError::JobRegistrationFailed(_)));
    }
}
