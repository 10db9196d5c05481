use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{
    map_db_error, normalize_limit, parse_platform, ApiError, ApiResponse, AppState, ResponseMeta,
};

#[derive(Debug, Serialize)]
pub(super) struct InfluencerItem {
    username: String,
    platform: String,
    post_count: i64,
    total_likes: i64,
    total_comments: i64,
    total_views: i64,
    total_engagement: i64,
    last_post_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct InfluencerQuery {
    pub platform: Option<String>,
    pub limit: Option<i64>,
}

pub(super) async fn list_influencers(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<InfluencerQuery>,
) -> Result<Json<ApiResponse<Vec<InfluencerItem>>>, ApiError> {
    let platform = parse_platform(&req_id.0, query.platform.as_deref())?;

    let rows =
        tagpulse_db::top_influencers(&state.pool, platform, Some(normalize_limit(query.limit)))
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| InfluencerItem {
            username: row.username,
            platform: row.platform,
            post_count: row.post_count,
            total_likes: row.total_likes,
            total_comments: row.total_comments,
            total_views: row.total_views,
            total_engagement: row.total_engagement,
            last_post_at: row.last_post_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
