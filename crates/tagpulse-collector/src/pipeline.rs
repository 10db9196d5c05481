//! Harvest-cycle orchestration.
//!
//! One cycle walks the campaign's platforms in configured order, harvests
//! each through the Apify client, normalizes and upserts the returned items,
//! and appends one ledger row per platform attempt. A platform failure is
//! recorded and the cycle moves on to the next platform; only a ledger write
//! failure aborts the cycle.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::Value;
use sqlx::PgPool;
use thiserror::Error;

use tagpulse_apify::{ApifyClient, ApifyError};
use tagpulse_core::{AppConfig, CampaignConfig, Platform, RunStatus};
use tagpulse_db::{record_harvest_run, upsert_post, DbError, NewHarvestRun, UpsertOutcome};

use crate::normalize::normalize_item;

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("APIFY_API_TOKEN is not set; harvesting requires it")]
    MissingToken,

    #[error(transparent)]
    Apify(#[from] ApifyError),

    #[error(transparent)]
    Db(#[from] DbError),
}

/// Builds an [`ApifyClient`] from application config, carrying the configured
/// retry policy.
///
/// # Errors
///
/// Returns [`CollectorError::MissingToken`] if no API token is configured,
/// or [`CollectorError::Apify`] if the HTTP client cannot be constructed.
pub fn client_from_config(config: &AppConfig) -> Result<ApifyClient, CollectorError> {
    let token = config
        .apify_api_token
        .as_deref()
        .ok_or(CollectorError::MissingToken)?;
    let client = ApifyClient::new(token)?.with_retry(
        config.apify_max_retries,
        config.apify_retry_backoff_base_secs,
    );
    Ok(client)
}

/// Per-keyword accounting for one platform attempt. `errors` counts
/// persistence failures only; items that fail normalization never reach
/// keyword attribution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeywordStats {
    pub total: i32,
    pub saved: i32,
    pub duplicates: i32,
    pub errors: i32,
}

/// What one platform attempt produced, mirrored into the run ledger.
#[derive(Debug, Clone)]
pub struct PlatformOutcome {
    pub platform: Platform,
    pub status: RunStatus,
    /// Service-side run ID; `None` when the harvest call itself failed.
    pub run_id: Option<String>,
    pub items_returned: i32,
    pub saved: i32,
    pub duplicates: i32,
    pub errors: i32,
    /// Item accounting per campaign keyword, for operator summaries.
    pub keyword_counts: BTreeMap<String, KeywordStats>,
    pub duration_ms: i64,
    pub error_message: Option<String>,
}

/// Outcome of one full cycle over every campaign platform.
#[derive(Debug, Clone, Default)]
pub struct CycleSummary {
    pub runs: Vec<PlatformOutcome>,
}

impl CycleSummary {
    #[must_use]
    pub fn total_saved(&self) -> i64 {
        self.runs.iter().map(|o| i64::from(o.saved)).sum()
    }

    #[must_use]
    pub fn total_duplicates(&self) -> i64 {
        self.runs.iter().map(|o| i64::from(o.duplicates)).sum()
    }

    #[must_use]
    pub fn total_errors(&self) -> i64 {
        self.runs.iter().map(|o| i64::from(o.errors)).sum()
    }

    #[must_use]
    pub fn failed_platforms(&self) -> Vec<Platform> {
        self.runs
            .iter()
            .filter(|o| o.status == RunStatus::Failed)
            .map(|o| o.platform)
            .collect()
    }
}

/// Runs one harvest cycle over every platform in the campaign.
///
/// Platforms are harvested in configured order, with
/// `collection.platform_delay_secs` of quiet time between consecutive
/// attempts. A failed harvest lands in the ledger as `failed` and does not
/// stop the remaining platforms.
///
/// # Errors
///
/// Returns [`CollectorError::Db`] if a ledger row cannot be written. Harvest
/// and per-item errors are captured in the report instead of propagated.
pub async fn run_cycle(
    pool: &PgPool,
    client: &ApifyClient,
    campaign: &CampaignConfig,
) -> Result<CycleSummary, CollectorError> {
    let mut summary = CycleSummary::default();

    for (idx, &platform) in campaign.platforms.iter().enumerate() {
        if idx > 0 && campaign.collection.platform_delay_secs > 0 {
            tokio::time::sleep(Duration::from_secs(campaign.collection.platform_delay_secs))
                .await;
        }

        let outcome = harvest_platform(pool, client, campaign, platform).await?;
        summary.runs.push(outcome);
    }

    tracing::info!(
        platforms = summary.runs.len(),
        saved = summary.total_saved(),
        duplicates = summary.total_duplicates(),
        errors = summary.total_errors(),
        "harvest cycle complete"
    );
    Ok(summary)
}

async fn harvest_platform(
    pool: &PgPool,
    client: &ApifyClient,
    campaign: &CampaignConfig,
    platform: Platform,
) -> Result<PlatformOutcome, CollectorError> {
    let started_at = Utc::now();
    let started = Instant::now();
    tracing::info!(
        platform = %platform,
        keywords = campaign.keywords.len(),
        "harvesting platform"
    );

    let outcome = match client
        .harvest(platform, &campaign.keywords, &campaign.collection)
        .await
    {
        Ok(harvest) => {
            let items_returned = i32::try_from(harvest.items.len()).unwrap_or(i32::MAX);
            let stats = process_items(pool, platform, &campaign.keywords, &harvest.items).await;
            let status = if stats.errors == 0 {
                RunStatus::Success
            } else {
                RunStatus::Partial
            };
            PlatformOutcome {
                platform,
                status,
                run_id: Some(harvest.run_id),
                items_returned,
                saved: stats.saved,
                duplicates: stats.duplicates,
                errors: stats.errors,
                keyword_counts: stats.keyword_counts,
                duration_ms: elapsed_ms(started),
                error_message: None,
            }
        }
        Err(e) => {
            tracing::error!(platform = %platform, error = %e, "harvest failed");
            PlatformOutcome {
                platform,
                status: RunStatus::Failed,
                run_id: None,
                items_returned: 0,
                saved: 0,
                duplicates: 0,
                errors: 0,
                keyword_counts: BTreeMap::new(),
                duration_ms: elapsed_ms(started),
                error_message: Some(e.to_string()),
            }
        }
    };

    let row = record_harvest_run(
        pool,
        &NewHarvestRun {
            platform,
            keywords: &campaign.keywords,
            run_id: outcome.run_id.as_deref(),
            items_returned: outcome.items_returned,
            saved: outcome.saved,
            duplicates: outcome.duplicates,
            errors: outcome.errors,
            started_at,
            duration_ms: outcome.duration_ms,
            status: outcome.status,
            error_message: outcome.error_message.as_deref(),
        },
    )
    .await?;

    tracing::info!(
        platform = %platform,
        run = %row.public_id,
        status = %outcome.status,
        saved = outcome.saved,
        duplicates = outcome.duplicates,
        errors = outcome.errors,
        "ledger row recorded"
    );
    for (keyword, stats) in &outcome.keyword_counts {
        tracing::debug!(
            platform = %platform,
            keyword = %keyword,
            total = stats.total,
            saved = stats.saved,
            duplicates = stats.duplicates,
            errors = stats.errors,
            "keyword accounting"
        );
    }
    Ok(outcome)
}

fn elapsed_ms(started: Instant) -> i64 {
    i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX)
}

#[derive(Debug, Default)]
struct ItemStats {
    saved: i32,
    duplicates: i32,
    errors: i32,
    keyword_counts: BTreeMap<String, KeywordStats>,
}

/// Normalizes and upserts one dataset's items. Item-level failures are
/// counted, not propagated; the batch always runs to the end.
async fn process_items(
    pool: &PgPool,
    platform: Platform,
    keywords: &[String],
    items: &[Value],
) -> ItemStats {
    let mut stats = ItemStats::default();

    for item in items {
        let post = match normalize_item(platform, keywords, item) {
            Ok(post) => post,
            Err(e) => {
                tracing::warn!(
                    platform = %platform,
                    error = %e,
                    "skipping item — normalization failed"
                );
                stats.errors += 1;
                continue;
            }
        };

        let keyword = stats
            .keyword_counts
            .entry(post.keyword_matched.clone())
            .or_default();
        keyword.total += 1;

        match upsert_post(pool, &post).await {
            Ok(UpsertOutcome::Inserted) => {
                stats.saved += 1;
                keyword.saved += 1;
            }
            Ok(UpsertOutcome::Updated) => {
                stats.duplicates += 1;
                keyword.duplicates += 1;
            }
            Err(e) => {
                tracing::warn!(
                    platform = %platform,
                    post_id = %post.post_id,
                    error = %e,
                    "failed to persist post"
                );
                stats.errors += 1;
                keyword.errors += 1;
            }
        }
    }

    stats
}
