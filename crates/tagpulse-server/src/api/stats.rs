use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, parse_platform, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct StatsItem {
    platform: String,
    keyword_matched: String,
    total_posts: i64,
    unique_users: i64,
    total_likes: i64,
    total_comments: i64,
    last_published_at: Option<DateTime<Utc>>,
    last_harvested_at: DateTime<Utc>,
}

pub(super) async fn list_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<StatsItem>>>, ApiError> {
    let rows = tagpulse_db::stats_summary(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| StatsItem {
            platform: row.platform,
            keyword_matched: row.keyword_matched,
            total_posts: row.total_posts,
            unique_users: row.unique_users,
            total_likes: row.total_likes,
            total_comments: row.total_comments,
            last_published_at: row.last_published_at,
            last_harvested_at: row.last_harvested_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Serialize)]
pub(super) struct TimelineItem {
    date: NaiveDate,
    platform: String,
    keyword_matched: String,
    posts_count: i64,
    total_likes: i64,
    total_comments: i64,
}

#[derive(Debug, Deserialize)]
pub(super) struct TimelineQuery {
    pub platform: Option<String>,
    pub days: Option<i32>,
}

pub(super) async fn list_timeline(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<TimelineQuery>,
) -> Result<Json<ApiResponse<Vec<TimelineItem>>>, ApiError> {
    let platform = parse_platform(&req_id.0, query.platform.as_deref())?;
    let days = query.days.map(|d| d.clamp(1, 365));

    let rows = tagpulse_db::daily_timeline(&state.pool, platform, days)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| TimelineItem {
            date: row.date,
            platform: row.platform,
            keyword_matched: row.keyword_matched,
            posts_count: row.posts_count,
            total_likes: row.total_likes,
            total_comments: row.total_comments,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Serialize)]
pub(super) struct PlatformComparisonItem {
    platform: String,
    total_posts: i64,
    unique_users: i64,
    avg_likes: Option<i64>,
    avg_comments: Option<i64>,
    avg_views: Option<i64>,
    max_likes: Option<i64>,
    max_comments: Option<i64>,
    total_likes: i64,
    total_comments: i64,
    video_count: i64,
    photo_count: i64,
    avg_hashtags_per_post: f64,
    avg_caption_length: i64,
}

pub(super) async fn compare_platforms(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<PlatformComparisonItem>>>, ApiError> {
    let rows = tagpulse_db::platform_comparison(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| PlatformComparisonItem {
            platform: row.platform,
            total_posts: row.total_posts,
            unique_users: row.unique_users,
            avg_likes: row.avg_likes,
            avg_comments: row.avg_comments,
            avg_views: row.avg_views,
            max_likes: row.max_likes,
            max_comments: row.max_comments,
            total_likes: row.total_likes,
            total_comments: row.total_comments,
            video_count: row.video_count,
            photo_count: row.photo_count,
            avg_hashtags_per_post: row.avg_hashtags_per_post,
            avg_caption_length: row.avg_caption_length,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
