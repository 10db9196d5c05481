//! Background harvest scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers one
//! recurring harvest job per campaign schedule expression.

use std::sync::Arc;

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use tagpulse_collector::{client_from_config, run_cycle};
use tagpulse_core::{AppConfig, CampaignConfig};

/// Builds and starts the background job scheduler.
///
/// Registers one harvest job per `campaign.schedules` entry and starts the
/// scheduler. Returns the running [`JobScheduler`] handle, which must be kept
/// alive for the lifetime of the process — dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, an
/// expression cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    config: Arc<AppConfig>,
    campaign: Arc<CampaignConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    let pool = Arc::new(pool);
    for expression in &campaign.schedules {
        register_harvest_job(
            &scheduler,
            expression,
            Arc::clone(&pool),
            Arc::clone(&config),
            Arc::clone(&campaign),
        )
        .await?;
    }

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register one recurring harvest job for a single cron expression.
///
/// Each tick drives a full harvest cycle over the campaign's platforms. A
/// malformed expression fails registration, and with it server startup.
async fn register_harvest_job(
    scheduler: &JobScheduler,
    expression: &str,
    pool: Arc<PgPool>,
    config: Arc<AppConfig>,
    campaign: Arc<CampaignConfig>,
) -> Result<(), JobSchedulerError> {
    let schedule = expression.to_string();

    let job = Job::new_async(expression, move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let config = Arc::clone(&config);
        let campaign = Arc::clone(&campaign);
        let schedule = schedule.clone();

        Box::pin(async move {
            tracing::info!(%schedule, "scheduler: starting harvest cycle");
            run_harvest_job(&pool, &config, &campaign).await;
            tracing::info!(%schedule, "scheduler: harvest cycle complete");
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Drive one harvest cycle and log its outcome.
///
/// A missing Apify token skips the tick entirely; no ledger rows are written
/// for a cycle that never reached a platform.
async fn run_harvest_job(pool: &PgPool, config: &AppConfig, campaign: &CampaignConfig) {
    let client = match client_from_config(config) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "scheduler: harvest skipped");
            return;
        }
    };

    match run_cycle(pool, &client, campaign).await {
        Ok(summary) => {
            let failed = summary.failed_platforms();
            if failed.is_empty() {
                tracing::info!(
                    saved = summary.total_saved(),
                    duplicates = summary.total_duplicates(),
                    errors = summary.total_errors(),
                    "scheduler: harvest cycle finished"
                );
            } else {
                tracing::warn!(
                    ?failed,
                    saved = summary.total_saved(),
                    "scheduler: harvest cycle finished with failed platforms"
                );
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "scheduler: harvest cycle aborted");
        }
    }
}
