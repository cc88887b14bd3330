//! Scheduled maintenance: the search-log retention sweep

use crate::analytics::{AnalyticsConfig, AnalyticsRecorder};
use crate::error::{AppError, Result};
use crate::metrics::ANALYTICS_FAILURES_TOTAL;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Delete search logs older than `days_to_keep`, logging the outcome
pub async fn run_retention(recorder: &AnalyticsRecorder, days_to_keep: u32) -> Result<u64> {
    let start = std::time::Instant::now();
    match recorder.clear_old_search_data(days_to_keep).await {
        Ok(deleted) => {
            tracing::info!(
                days_to_keep = days_to_keep,
                deleted = deleted,
                duration_ms = start.elapsed().as_millis() as u64,
                "Retention sweep finished"
            );
            Ok(deleted)
        }
        Err(e) => {
            ANALYTICS_FAILURES_TOTAL.with_label_values(&["retention"]).inc();
            tracing::error!(days_to_keep = days_to_keep, error = %e, "Retention sweep failed");
            Err(e.into())
        }
    }
}

/// Cron-driven background jobs
pub struct MaintenanceScheduler {
    scheduler: JobScheduler,
}

impl MaintenanceScheduler {
    /// Register the retention sweep and start the scheduler.
    ///
    /// Returns `None` when retention is disabled.
    pub async fn start(
        recorder: Arc<AnalyticsRecorder>,
        config: &AnalyticsConfig,
    ) -> Result<Option<Self>> {
        if !config.retention_enabled {
            tracing::info!("Search-log retention is disabled in configuration");
            return Ok(None);
        }

        let scheduler = JobScheduler::new().await.map_err(scheduler_error)?;

        let days_to_keep = config.retention_days;
        let job = Job::new_async(config.retention_schedule.as_str(), move |_uuid, _lock| {
            let recorder = Arc::clone(&recorder);
            Box::pin(async move {
                // Failures are already logged and counted
                let _ = run_retention(&recorder, days_to_keep).await;
            })
        })
        .map_err(|e: JobSchedulerError| {
            AppError::Configuration(format!(
                "invalid retention schedule '{}': {}",
                config.retention_schedule, e
            ))
        })?;

        scheduler.add(job).await.map_err(scheduler_error)?;
        scheduler.start().await.map_err(scheduler_error)?;

        tracing::info!(
            schedule = %config.retention_schedule,
            days_to_keep = days_to_keep,
            "Retention job scheduled"
        );

        Ok(Some(Self { scheduler }))
    }

    pub async fn shutdown(mut self) -> Result<()> {
        self.scheduler.shutdown().await.map_err(scheduler_error)?;
        tracing::info!("Maintenance scheduler stopped");
        Ok(())
    }
}

fn scheduler_error(err: JobSchedulerError) -> AppError {
    AppError::Internal(format!("scheduler: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::InMemoryAnalyticsStore;

    fn recorder() -> Arc<AnalyticsRecorder> {
        Arc::new(
            AnalyticsRecorder::new(
                Arc::new(InMemoryAnalyticsStore::new()),
                AnalyticsConfig::default(),
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_disabled_retention_schedules_nothing() {
        let config = AnalyticsConfig {
            retention_enabled: false,
            ..Default::default()
        };
        assert!(MaintenanceScheduler::start(recorder(), &config)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_invalid_schedule_is_a_configuration_error() {
        let config = AnalyticsConfig {
            retention_schedule: "every tuesday".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            MaintenanceScheduler::start(recorder(), &config).await,
            Err(AppError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_run_retention_on_empty_store() {
        assert_eq!(run_retention(&recorder(), 30).await.unwrap(), 0);
    }
}
