//! Database operations for the `harvest_runs` ledger.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tagpulse_core::{Platform, RunStatus};
use uuid::Uuid;

use crate::DbError;

/// A row from the `harvest_runs` ledger.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HarvestRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub platform: String,
    pub keywords: Vec<String>,
    /// Scraper-side run ID; absent when the run never started remotely.
    pub run_id: Option<String>,
    pub items_returned: i32,
    pub saved: i32,
    pub duplicates: i32,
    pub errors: i32,
    pub started_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Everything known about a finished harvest cycle, ready for the ledger.
#[derive(Debug, Clone)]
pub struct NewHarvestRun<'a> {
    pub platform: Platform,
    pub keywords: &'a [String],
    pub run_id: Option<&'a str>,
    pub items_returned: i32,
    pub saved: i32,
    pub duplicates: i32,
    pub errors: i32,
    pub started_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub status: RunStatus,
    pub error_message: Option<&'a str>,
}

/// Filters for [`list_harvest_runs`]. `None` fields match everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunFilters {
    pub platform: Option<Platform>,
    /// Inclusive lower bound on `created_at`.
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    pub until: Option<DateTime<Utc>>,
    /// Defaults to 50 rows when unset.
    pub limit: Option<i64>,
}

/// Writes one ledger row for a finished harvest cycle.
///
/// The ledger is append-only: a row is inserted exactly once, after the
/// cycle's outcome is known, and there is no update path. Generates a UUID in
/// Rust and binds it to `public_id`. Returns the full stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn record_harvest_run(
    pool: &PgPool,
    new: &NewHarvestRun<'_>,
) -> Result<HarvestRunRow, DbError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, HarvestRunRow>(
        "INSERT INTO harvest_runs (public_id, platform, keywords, run_id, items_returned, \
                                   saved, duplicates, errors, started_at, duration_ms, \
                                   status, error_message) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
         RETURNING id, public_id, platform, keywords, run_id, items_returned, saved, \
                   duplicates, errors, started_at, duration_ms, status, error_message, \
                   created_at",
    )
    .bind(public_id)
    .bind(new.platform.as_str())
    .bind(new.keywords)
    .bind(new.run_id)
    .bind(new.items_returned)
    .bind(new.saved)
    .bind(new.duplicates)
    .bind(new.errors)
    .bind(new.started_at)
    .bind(new.duration_ms)
    .bind(new.status.as_str())
    .bind(new.error_message)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Lists ledger rows newest-first, optionally narrowed by platform and a
/// `created_at` window. Ties on `created_at` break toward the higher id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_harvest_runs(
    pool: &PgPool,
    filters: &RunFilters,
) -> Result<Vec<HarvestRunRow>, DbError> {
    let rows = sqlx::query_as::<_, HarvestRunRow>(
        "SELECT id, public_id, platform, keywords, run_id, items_returned, saved, \
                duplicates, errors, started_at, duration_ms, status, error_message, \
                created_at \
         FROM harvest_runs \
         WHERE ($1::TEXT IS NULL OR platform = $1) \
           AND ($2::TIMESTAMPTZ IS NULL OR created_at >= $2) \
           AND ($3::TIMESTAMPTZ IS NULL OR created_at < $3) \
         ORDER BY created_at DESC, id DESC \
         LIMIT COALESCE($4, 50)",
    )
    .bind(filters.platform.map(Platform::as_str))
    .bind(filters.since)
    .bind(filters.until)
    .bind(filters.limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Counts all ledger rows.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_harvest_runs(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM harvest_runs")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
