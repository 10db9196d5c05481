use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tagpulse_db::RunFilters;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{
    map_db_error, normalize_limit, parse_platform, ApiError, ApiResponse, AppState, ResponseMeta,
};

/// One ledger row. The surrogate key stays internal; `public_id` is the
/// stable external reference.
#[derive(Debug, Serialize)]
pub(super) struct RunItem {
    pub public_id: Uuid,
    pub platform: String,
    pub keywords: Vec<String>,
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

#[derive(Debug, Deserialize)]
pub(super) struct RunQuery {
    pub platform: Option<String>,
    /// Inclusive lower bound on `created_at`, RFC 3339.
    pub start: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`, RFC 3339.
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

pub(super) async fn list_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<RunQuery>,
) -> Result<Json<ApiResponse<Vec<RunItem>>>, ApiError> {
    let platform = parse_platform(&req_id.0, query.platform.as_deref())?;

    let rows = tagpulse_db::list_harvest_runs(
        &state.pool,
        &RunFilters {
            platform,
            since: query.start,
            until: query.end,
            limit: Some(normalize_limit(query.limit)),
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| RunItem {
            public_id: row.public_id,
            platform: row.platform,
            keywords: row.keywords,
            run_id: row.run_id,
            items_returned: row.items_returned,
            saved: row.saved,
            duplicates: row.duplicates,
            errors: row.errors,
            started_at: row.started_at,
            duration_ms: row.duration_ms,
            status: row.status,
            error_message: row.error_message,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
