//! Read-side aggregates over `posts`: hashtag leaderboards, per-platform and
//! per-keyword rollups, influencer rankings, and the daily timeline.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use tagpulse_core::Platform;

use crate::{DbError, PostRow};

/// Engagement columns [`top_posts`] accepts as a ranking metric.
const TOP_POST_METRICS: &[&str] = &[
    "likes_count",
    "comments_count",
    "shares_count",
    "views_count",
];

const POST_COLUMNS: &str = "id, platform, post_id, username, user_id, caption, hashtags, \
     keyword_matched, published_at, harvested_at, likes_count, comments_count, shares_count, \
     views_count, post_url, media_urls, media_kind, raw_payload";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// One hashtag with its usage and engagement totals.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TopHashtagRow {
    pub hashtag: String,
    pub usage_count: i64,
    pub total_engagement: i64,
}

/// Collection totals for one `(platform, keyword)` pair.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StatsSummaryRow {
    pub platform: String,
    pub keyword_matched: String,
    pub total_posts: i64,
    pub unique_users: i64,
    pub total_likes: i64,
    pub total_comments: i64,
    pub last_published_at: Option<DateTime<Utc>>,
    pub last_harvested_at: DateTime<Utc>,
}

/// Side-by-side engagement profile of one platform.
///
/// The `avg_*` and `max_*` columns are `None` when no post on the platform
/// reports that metric; SQL aggregates skip NULLs, so absent metrics never
/// drag an average toward zero.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlatformComparisonRow {
    pub platform: String,
    pub total_posts: i64,
    pub unique_users: i64,
    pub avg_likes: Option<i64>,
    pub avg_comments: Option<i64>,
    pub avg_views: Option<i64>,
    pub max_likes: Option<i64>,
    pub max_comments: Option<i64>,
    pub total_likes: i64,
    pub total_comments: i64,
    pub video_count: i64,
    pub photo_count: i64,
    pub avg_hashtags_per_post: f64,
    pub avg_caption_length: i64,
}

/// One author ranked by summed engagement across their harvested posts.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InfluencerRow {
    pub username: String,
    pub platform: String,
    pub post_count: i64,
    pub total_likes: i64,
    pub total_comments: i64,
    pub total_views: i64,
    pub total_engagement: i64,
    pub last_post_at: Option<DateTime<Utc>>,
}

/// Post volume and engagement for one `(day, platform, keyword)` cell.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TimelineRow {
    pub date: NaiveDate,
    pub platform: String,
    pub keyword_matched: String,
    pub posts_count: i64,
    pub total_likes: i64,
    pub total_comments: i64,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Ranks hashtags by how many stored posts carry them, most-used first.
/// Ties break alphabetically. Tags are stored lowercased, so no folding
/// happens here.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn top_hashtags(
    pool: &PgPool,
    platform: Option<Platform>,
    limit: Option<i64>,
) -> Result<Vec<TopHashtagRow>, DbError> {
    let rows = sqlx::query_as::<_, TopHashtagRow>(
        "SELECT h.hashtag, COUNT(*) AS usage_count, \
                SUM(COALESCE(p.likes_count, 0) + COALESCE(p.comments_count, 0))::BIGINT \
                    AS total_engagement \
         FROM posts p, LATERAL unnest(p.hashtags) AS h(hashtag) \
         WHERE ($1::TEXT IS NULL OR p.platform = $1) \
         GROUP BY h.hashtag \
         ORDER BY usage_count DESC, h.hashtag ASC \
         LIMIT COALESCE($2, 20)",
    )
    .bind(platform.map(Platform::as_str))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Collection totals grouped by platform and matched keyword.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn stats_summary(pool: &PgPool) -> Result<Vec<StatsSummaryRow>, DbError> {
    let rows = sqlx::query_as::<_, StatsSummaryRow>(
        "SELECT platform, keyword_matched, \
                COUNT(*) AS total_posts, \
                COUNT(DISTINCT username) AS unique_users, \
                SUM(COALESCE(likes_count, 0))::BIGINT AS total_likes, \
                SUM(COALESCE(comments_count, 0))::BIGINT AS total_comments, \
                MAX(published_at) AS last_published_at, \
                MAX(harvested_at) AS last_harvested_at \
         FROM posts \
         GROUP BY platform, keyword_matched \
         ORDER BY platform, keyword_matched",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Compares the platforms on volume, engagement, media mix, and writing
/// habits. One row per platform that has at least one stored post.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn platform_comparison(pool: &PgPool) -> Result<Vec<PlatformComparisonRow>, DbError> {
    let rows = sqlx::query_as::<_, PlatformComparisonRow>(
        "SELECT platform, \
                COUNT(*) AS total_posts, \
                COUNT(DISTINCT username) AS unique_users, \
                ROUND(AVG(likes_count))::BIGINT AS avg_likes, \
                ROUND(AVG(comments_count))::BIGINT AS avg_comments, \
                ROUND(AVG(views_count))::BIGINT AS avg_views, \
                MAX(likes_count) AS max_likes, \
                MAX(comments_count) AS max_comments, \
                SUM(COALESCE(likes_count, 0))::BIGINT AS total_likes, \
                SUM(COALESCE(comments_count, 0))::BIGINT AS total_comments, \
                COUNT(*) FILTER (WHERE media_kind = 'video') AS video_count, \
                COUNT(*) FILTER (WHERE media_kind = 'photo') AS photo_count, \
                ROUND(AVG(cardinality(hashtags)), 1)::DOUBLE PRECISION AS avg_hashtags_per_post, \
                ROUND(AVG(char_length(caption)))::BIGINT AS avg_caption_length \
         FROM posts \
         GROUP BY platform \
         ORDER BY platform",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Ranks authors by total likes + comments across their stored posts.
/// Posts without a username are excluded before grouping.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn top_influencers(
    pool: &PgPool,
    platform: Option<Platform>,
    limit: Option<i64>,
) -> Result<Vec<InfluencerRow>, DbError> {
    let rows = sqlx::query_as::<_, InfluencerRow>(
        "SELECT username, platform, \
                COUNT(*) AS post_count, \
                SUM(COALESCE(likes_count, 0))::BIGINT AS total_likes, \
                SUM(COALESCE(comments_count, 0))::BIGINT AS total_comments, \
                SUM(COALESCE(views_count, 0))::BIGINT AS total_views, \
                SUM(COALESCE(likes_count, 0) + COALESCE(comments_count, 0))::BIGINT \
                    AS total_engagement, \
                MAX(published_at) AS last_post_at \
         FROM posts \
         WHERE username IS NOT NULL \
           AND ($1::TEXT IS NULL OR platform = $1) \
         GROUP BY username, platform \
         ORDER BY total_engagement DESC, post_count DESC \
         LIMIT COALESCE($2, 10)",
    )
    .bind(platform.map(Platform::as_str))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Top posts by one engagement metric, taking up to `limit` from each
/// platform so a views-heavy platform cannot crowd the other out.
///
/// # Errors
///
/// Returns [`DbError::InvalidMetric`] if `metric` is not an engagement
/// column, or [`DbError::Sqlx`] if the query fails.
pub async fn top_posts(
    pool: &PgPool,
    metric: &str,
    limit: Option<i64>,
) -> Result<Vec<PostRow>, DbError> {
    if !TOP_POST_METRICS.contains(&metric) {
        return Err(DbError::InvalidMetric(metric.to_string()));
    }

    // The metric is interpolated rather than bound; the allowlist above pins
    // it to a fixed set of column names.
    let sql = format!(
        "(SELECT {POST_COLUMNS} FROM posts \
          WHERE platform = 'instagram' AND {metric} IS NOT NULL AND {metric} > 0 \
          ORDER BY {metric} DESC LIMIT COALESCE($1, 10)) \
         UNION ALL \
         (SELECT {POST_COLUMNS} FROM posts \
          WHERE platform = 'tiktok' AND {metric} IS NOT NULL AND {metric} > 0 \
          ORDER BY {metric} DESC LIMIT COALESCE($1, 10)) \
         ORDER BY {metric} DESC"
    );

    let rows = sqlx::query_as::<_, PostRow>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Daily post volume and engagement per platform and keyword, newest day
/// first. Posts without a publish time cannot be placed on the timeline and
/// are skipped. `days` bounds the window; `None` returns all history.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn daily_timeline(
    pool: &PgPool,
    platform: Option<Platform>,
    days: Option<i32>,
) -> Result<Vec<TimelineRow>, DbError> {
    let rows = sqlx::query_as::<_, TimelineRow>(
        "SELECT DATE(published_at) AS date, platform, keyword_matched, \
                COUNT(*) AS posts_count, \
                SUM(COALESCE(likes_count, 0))::BIGINT AS total_likes, \
                SUM(COALESCE(comments_count, 0))::BIGINT AS total_comments \
         FROM posts \
         WHERE published_at IS NOT NULL \
           AND ($1::TEXT IS NULL OR platform = $1) \
           AND ($2::INT IS NULL OR published_at >= NOW() - make_interval(days => $2)) \
         GROUP BY DATE(published_at), platform, keyword_matched \
         ORDER BY date DESC, platform, keyword_matched",
    )
    .bind(platform.map(Platform::as_str))
    .bind(days)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
