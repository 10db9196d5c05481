//! Database operations for the `posts` table: dedup-aware writes and the
//! filtered read surface.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tagpulse_core::{Platform, Post};

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A full row from the `posts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
    pub id: i64,
    pub platform: String,
    pub post_id: String,
    pub username: Option<String>,
    pub user_id: Option<String>,
    pub caption: String,
    pub hashtags: Vec<String>,
    pub keyword_matched: String,
    pub published_at: Option<DateTime<Utc>>,
    /// When this post was last seen by a harvest, not when it was created.
    pub harvested_at: DateTime<Utc>,
    pub likes_count: Option<i64>,
    pub comments_count: Option<i64>,
    pub shares_count: Option<i64>,
    pub views_count: Option<i64>,
    pub post_url: Option<String>,
    pub media_urls: Vec<String>,
    pub media_kind: String,
    pub raw_payload: serde_json::Value,
}

/// The slice of a post the hashtag analytics need: tags plus context.
///
/// `engagement` is likes + comments with NULLs treated as zero, computed in
/// SQL so the graph and trend builders weigh posts identically.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaggedPostRow {
    pub platform: String,
    pub hashtags: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub engagement: i64,
}

/// Whether an upsert created a new row or refreshed an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Inserts a post, or refreshes its engagement counters when the same
/// `(platform, post_id)` pair already exists.
///
/// The insert and the fallback update are separate statements instead of a
/// single `ON CONFLICT DO UPDATE` so the caller can tell new rows from
/// refreshed ones without inspecting row contents. On refresh, the four
/// counter columns take the incoming values verbatim (including `NULL`) and
/// `harvested_at` moves to `NOW()`; all other columns keep their
/// first-observed values.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either statement fails.
pub async fn upsert_post(pool: &PgPool, post: &Post) -> Result<UpsertOutcome, DbError> {
    let inserted_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO posts (platform, post_id, username, user_id, caption, hashtags, \
                            keyword_matched, published_at, likes_count, comments_count, \
                            shares_count, views_count, post_url, media_urls, media_kind, \
                            raw_payload) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
         ON CONFLICT (platform, post_id) DO NOTHING \
         RETURNING id",
    )
    .bind(post.platform.as_str())
    .bind(&post.post_id)
    .bind(post.username.as_deref())
    .bind(post.user_id.as_deref())
    .bind(&post.caption)
    .bind(&post.hashtags)
    .bind(&post.keyword_matched)
    .bind(post.published_at)
    .bind(post.likes)
    .bind(post.comments)
    .bind(post.shares)
    .bind(post.views)
    .bind(post.post_url.as_deref())
    .bind(&post.media_urls)
    .bind(post.media_kind.as_str())
    .bind(&post.raw_payload)
    .fetch_optional(pool)
    .await?;

    if inserted_id.is_some() {
        return Ok(UpsertOutcome::Inserted);
    }

    sqlx::query(
        "UPDATE posts \
         SET likes_count = $3, comments_count = $4, shares_count = $5, views_count = $6, \
             harvested_at = NOW() \
         WHERE platform = $1 AND post_id = $2",
    )
    .bind(post.platform.as_str())
    .bind(&post.post_id)
    .bind(post.likes)
    .bind(post.comments)
    .bind(post.shares)
    .bind(post.views)
    .execute(pool)
    .await?;

    Ok(UpsertOutcome::Updated)
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Filters for [`list_posts`]. `None` fields match everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostFilters<'a> {
    pub platform: Option<Platform>,
    pub keyword: Option<&'a str>,
    /// Inclusive lower bound on `published_at`.
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `published_at`.
    pub until: Option<DateTime<Utc>>,
    /// Defaults to 100 rows when unset.
    pub limit: Option<i64>,
}

/// Lists posts newest-first, optionally narrowed by platform, keyword, and
/// publish window. Posts without a publish time sort last.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_posts(pool: &PgPool, filters: &PostFilters<'_>) -> Result<Vec<PostRow>, DbError> {
    let rows = sqlx::query_as::<_, PostRow>(
        "SELECT id, platform, post_id, username, user_id, caption, hashtags, \
                keyword_matched, published_at, harvested_at, likes_count, comments_count, \
                shares_count, views_count, post_url, media_urls, media_kind, raw_payload \
         FROM posts \
         WHERE ($1::TEXT IS NULL OR platform = $1) \
           AND ($2::TEXT IS NULL OR keyword_matched = $2) \
           AND ($3::TIMESTAMPTZ IS NULL OR published_at >= $3) \
           AND ($4::TIMESTAMPTZ IS NULL OR published_at < $4) \
         ORDER BY published_at DESC NULLS LAST, id DESC \
         LIMIT COALESCE($5, 100)",
    )
    .bind(filters.platform.map(Platform::as_str))
    .bind(filters.keyword)
    .bind(filters.since)
    .bind(filters.until)
    .bind(filters.limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fetches a single post by its platform identity.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no such post exists, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_post(pool: &PgPool, platform: Platform, post_id: &str) -> Result<PostRow, DbError> {
    sqlx::query_as::<_, PostRow>(
        "SELECT id, platform, post_id, username, user_id, caption, hashtags, \
                keyword_matched, published_at, harvested_at, likes_count, comments_count, \
                shares_count, views_count, post_url, media_urls, media_kind, raw_payload \
         FROM posts \
         WHERE platform = $1 AND post_id = $2",
    )
    .bind(platform.as_str())
    .bind(post_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Counts all stored posts.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_posts(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Streams the hashtag-bearing posts into memory for the analytics builders.
///
/// Posts with an empty hashtag array carry no signal for either the
/// co-occurrence graph or the trend window and are skipped at the source.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn fetch_tagged_posts(
    pool: &PgPool,
    since: Option<DateTime<Utc>>,
) -> Result<Vec<TaggedPostRow>, DbError> {
    let rows = sqlx::query_as::<_, TaggedPostRow>(
        "SELECT platform, hashtags, published_at, \
                (COALESCE(likes_count, 0) + COALESCE(comments_count, 0))::BIGINT AS engagement \
         FROM posts \
         WHERE cardinality(hashtags) > 0 \
           AND ($1::TIMESTAMPTZ IS NULL OR published_at >= $1)",
    )
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
