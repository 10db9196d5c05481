use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tagpulse_db::{DbError, PostFilters, PostRow};

use crate::middleware::RequestId;

use super::{
    map_db_error, normalize_limit, parse_platform, ApiError, ApiResponse, AppState, ResponseMeta,
};

/// One stored post as exposed by the API. `raw_payload` stays internal; the
/// dashboard never needs the scraper's original item.
#[derive(Debug, Serialize)]
pub(super) struct PostItem {
    id: i64,
    platform: String,
    post_id: String,
    username: Option<String>,
    caption: String,
    hashtags: Vec<String>,
    keyword_matched: String,
    published_at: Option<DateTime<Utc>>,
    harvested_at: DateTime<Utc>,
    likes_count: Option<i64>,
    comments_count: Option<i64>,
    shares_count: Option<i64>,
    views_count: Option<i64>,
    post_url: Option<String>,
    media_urls: Vec<String>,
    media_kind: String,
}

impl From<PostRow> for PostItem {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            platform: row.platform,
            post_id: row.post_id,
            username: row.username,
            caption: row.caption,
            hashtags: row.hashtags,
            keyword_matched: row.keyword_matched,
            published_at: row.published_at,
            harvested_at: row.harvested_at,
            likes_count: row.likes_count,
            comments_count: row.comments_count,
            shares_count: row.shares_count,
            views_count: row.views_count,
            post_url: row.post_url,
            media_urls: row.media_urls,
            media_kind: row.media_kind,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct PostQuery {
    pub platform: Option<String>,
    pub keyword: Option<String>,
    /// Inclusive lower bound on `published_at`, RFC 3339.
    pub start: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `published_at`, RFC 3339.
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

pub(super) async fn list_posts(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<PostQuery>,
) -> Result<Json<ApiResponse<Vec<PostItem>>>, ApiError> {
    let platform = parse_platform(&req_id.0, query.platform.as_deref())?;

    let rows = tagpulse_db::list_posts(
        &state.pool,
        &PostFilters {
            platform,
            keyword: query.keyword.as_deref(),
            since: query.start,
            until: query.end,
            limit: Some(normalize_limit(query.limit)),
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(PostItem::from).collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct TopPostsQuery {
    pub metric: Option<String>,
    pub limit: Option<i64>,
}

/// Maps the short metric names the dashboard sends onto the engagement
/// column names the store ranks by. Unknown names pass through untouched and
/// are rejected by the query layer's allowlist.
pub(super) fn canonical_metric(name: &str) -> &str {
    match name {
        "likes" => "likes_count",
        "comments" => "comments_count",
        "shares" => "shares_count",
        "views" => "views_count",
        other => other,
    }
}

pub(super) async fn list_top_posts(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<TopPostsQuery>,
) -> Result<Json<ApiResponse<Vec<PostItem>>>, ApiError> {
    let metric = canonical_metric(query.metric.as_deref().unwrap_or("likes"));

    let rows = tagpulse_db::top_posts(&state.pool, metric, Some(normalize_limit(query.limit)))
        .await
        .map_err(|e| match e {
            DbError::InvalidMetric(m) => ApiError::new(
                req_id.0.clone(),
                "validation_error",
                format!("unknown metric '{m}'; expected likes, comments, shares, or views"),
            ),
            other => map_db_error(req_id.0.clone(), &other),
        })?;

    let data = rows.into_iter().map(PostItem::from).collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
