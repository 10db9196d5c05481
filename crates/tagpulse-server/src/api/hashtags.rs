use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tagpulse_analytics::{EmergingHashtag, HashtagNetwork, TaggedPost};
use tagpulse_core::Platform;
use tagpulse_db::TaggedPostRow;

use crate::middleware::RequestId;

use super::{
    map_db_error, normalize_limit, parse_platform, ApiError, ApiResponse, AppState, ResponseMeta,
};

/// Trend lookback in days; covers both the recent and the prior window.
const TREND_LOOKBACK_DAYS: i64 = 14;

#[derive(Debug, Serialize)]
pub(super) struct HashtagItem {
    pub hashtag: String,
    pub usage_count: i64,
    pub total_engagement: i64,
}

#[derive(Debug, Deserialize)]
pub(super) struct HashtagQuery {
    pub platform: Option<String>,
    pub limit: Option<i64>,
}

pub(super) async fn list_hashtags(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<HashtagQuery>,
) -> Result<Json<ApiResponse<Vec<HashtagItem>>>, ApiError> {
    let platform = parse_platform(&req_id.0, query.platform.as_deref())?;

    let rows = tagpulse_db::top_hashtags(&state.pool, platform, Some(normalize_limit(query.limit)))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| HashtagItem {
            hashtag: row.hashtag,
            usage_count: row.usage_count,
            total_engagement: row.total_engagement,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Converts stored rows into the analytics input. The platform column is
/// CHECK-constrained, so the parse only drops rows if the constraint and the
/// enum ever disagree.
fn tagged_posts(rows: Vec<TaggedPostRow>) -> Vec<TaggedPost> {
    rows.into_iter()
        .filter_map(|row| {
            row.platform.parse::<Platform>().ok().map(|platform| TaggedPost {
                platform,
                hashtags: row.hashtags,
                published_at: row.published_at,
                engagement: row.engagement,
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
pub(super) struct NetworkQuery {
    pub min_co_occurrence: Option<i64>,
}

pub(super) async fn hashtag_network(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<NetworkQuery>,
) -> Result<Json<ApiResponse<HashtagNetwork>>, ApiError> {
    let min_co_occurrence = query.min_co_occurrence.unwrap_or(2).max(1);

    let rows = tagpulse_db::fetch_tagged_posts(&state.pool, None)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = tagpulse_analytics::build_graph(&tagged_posts(rows), min_co_occurrence);

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct EmergingQuery {
    pub limit: Option<i64>,
}

pub(super) async fn list_emerging_hashtags(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<EmergingQuery>,
) -> Result<Json<ApiResponse<Vec<EmergingHashtag>>>, ApiError> {
    let limit = usize::try_from(normalize_limit(query.limit)).unwrap_or(50);

    // Posts older than both windows can't influence the ranking; let the
    // store skip them.
    let now = Utc::now();
    let since = now - Duration::days(TREND_LOOKBACK_DAYS);

    let rows = tagpulse_db::fetch_tagged_posts(&state.pool, Some(since))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = tagpulse_analytics::emerging_hashtags(&tagged_posts(rows), now, limit);

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
