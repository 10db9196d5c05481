mod hashtags;
mod influencers;
mod posts;
mod runs;
mod stats;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::time::Duration;
use tagpulse_core::Platform;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

/// Resolves an optional `platform` query parameter, rejecting unknown names.
pub(super) fn parse_platform(
    request_id: &str,
    raw: Option<&str>,
) -> Result<Option<Platform>, ApiError> {
    raw.map(|s| {
        s.parse::<Platform>().map_err(|_| {
            ApiError::new(
                request_id,
                "validation_error",
                format!("unknown platform '{s}'; expected instagram or tiktok"),
            )
        })
    })
    .transpose()
}

pub(super) fn map_db_error(request_id: String, error: &tagpulse_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/posts", get(posts::list_posts))
        .route("/api/v1/top-posts", get(posts::list_top_posts))
        .route("/api/v1/stats", get(stats::list_stats))
        .route("/api/v1/timeline", get(stats::list_timeline))
        .route(
            "/api/v1/platforms/comparison",
            get(stats::compare_platforms),
        )
        .route("/api/v1/hashtags", get(hashtags::list_hashtags))
        .route("/api/v1/hashtags/network", get(hashtags::hashtag_network))
        .route(
            "/api/v1/hashtags/emerging",
            get(hashtags::list_emerging_hashtags),
        )
        .route("/api/v1/influencers", get(influencers::list_influencers))
        .route("/api/v1/runs", get(runs::list_runs))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match tagpulse_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::hashtags::HashtagItem;
    use super::posts::canonical_metric;
    use super::runs::RunItem;
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::Utc;
    use tower::ServiceExt;
    use uuid::Uuid;

    #[test]
    fn hashtag_item_is_serializable() {
        // Proves the type compiles and serde works — no DB needed.
        let item = HashtagItem {
            hashtag: "cop30".to_string(),
            usage_count: 42,
            total_engagement: 1_200,
        };
        let json = serde_json::to_string(&item).expect("serialize");
        assert!(json.contains("\"hashtag\":\"cop30\""));
        assert!(json.contains("\"usage_count\":42"));
    }

    #[test]
    fn run_item_is_serializable() {
        let item = RunItem {
            public_id: Uuid::new_v4(),
            platform: "instagram".to_string(),
            keywords: vec!["cop30".to_string()],
            run_id: Some("run-1".to_string()),
            items_returned: 10,
            saved: 8,
            duplicates: 2,
            errors: 0,
            started_at: Utc::now(),
            duration_ms: 1_500,
            status: "success".to_string(),
            error_message: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&item).expect("serialize RunItem");
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("parse");
        assert_eq!(parsed["status"].as_str(), Some("success"));
        assert_eq!(parsed["saved"].as_i64(), Some(8));
        assert!(parsed["error_message"].is_null());
    }

    #[test]
    fn normalize_limit_applies_defaults_and_bounds() {
        assert_eq!(normalize_limit(None), 50);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(1_000)), 200);
        assert_eq!(normalize_limit(Some(25)), 25);
    }

    #[test]
    fn api_error_validation_error_maps_to_bad_request() {
        let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn parse_platform_accepts_known_and_rejects_unknown() {
        assert_eq!(
            parse_platform("req-1", Some("tiktok")).expect("known platform"),
            Some(Platform::TikTok)
        );
        assert_eq!(parse_platform("req-1", None).expect("absent is fine"), None);
        let err = parse_platform("req-1", Some("myspace")).expect_err("unknown platform");
        assert_eq!(err.error.code, "validation_error");
    }

    #[test]
    fn canonical_metric_maps_friendly_names() {
        assert_eq!(canonical_metric("likes"), "likes_count");
        assert_eq!(canonical_metric("views"), "views_count");
        assert_eq!(canonical_metric("likes_count"), "likes_count");
        // Unknown names pass through; the query layer rejects them.
        assert_eq!(canonical_metric("zaps"), "zaps");
    }

    // -------------------------------------------------------------------------
    // Route integration tests (with DB)
    // -------------------------------------------------------------------------

    /// Insert a minimal post row for route tests.
    async fn seed_post(
        pool: &sqlx::PgPool,
        platform: &str,
        post_id: &str,
        keyword: &str,
        hashtags: &[&str],
        published_days_ago: i32,
        likes: i64,
    ) {
        let tags: Vec<String> = hashtags.iter().map(|t| (*t).to_string()).collect();
        sqlx::query(
            "INSERT INTO posts (platform, post_id, username, caption, hashtags, \
                                keyword_matched, published_at, likes_count, comments_count, \
                                views_count, media_kind, raw_payload) \
             VALUES ($1, $2, $3, '', $4, $5, NOW() - make_interval(days => $6), $7, 0, $7, \
                     'photo', '{}'::jsonb)",
        )
        .bind(platform)
        .bind(post_id)
        .bind(format!("user-{post_id}"))
        .bind(&tags)
        .bind(keyword)
        .bind(published_days_ago)
        .bind(likes)
        .execute(pool)
        .await
        .expect("seed post");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn list_posts_filters_by_platform(pool: sqlx::PgPool) {
        seed_post(&pool, "instagram", "IG-1", "cop30", &["cop30"], 1, 10).await;
        seed_post(&pool, "tiktok", "TT-1", "cop30", &["cop30"], 1, 20).await;

        let auth = crate::middleware::AuthState::from_env(true).expect("auth");
        let app = build_app(AppState { pool }, auth, default_rate_limit_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/posts?platform=instagram")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        let data = json["data"].as_array().expect("data array");
        assert_eq!(data.len(), 1, "expected only the instagram post");
        assert_eq!(data[0]["post_id"].as_str(), Some("IG-1"));
        assert_eq!(data[0]["keyword_matched"].as_str(), Some("cop30"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn list_posts_rejects_unknown_platform(pool: sqlx::PgPool) {
        let auth = crate::middleware::AuthState::from_env(true).expect("auth");
        let app = build_app(AppState { pool }, auth, default_rate_limit_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/posts?platform=myspace")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(json["error"]["code"].as_str(), Some("validation_error"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn stats_groups_by_platform_and_keyword(pool: sqlx::PgPool) {
        seed_post(&pool, "instagram", "IG-1", "cop30", &["cop30"], 2, 10).await;
        seed_post(&pool, "instagram", "IG-2", "cop30", &["clima"], 1, 30).await;

        let auth = crate::middleware::AuthState::from_env(true).expect("auth");
        let app = build_app(AppState { pool }, auth, default_rate_limit_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/stats")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        let data = json["data"].as_array().expect("data array");
        assert_eq!(data.len(), 1, "both posts share platform and keyword");
        assert_eq!(data[0]["total_posts"].as_i64(), Some(2));
        assert_eq!(data[0]["unique_users"].as_i64(), Some(2));
        assert_eq!(data[0]["total_likes"].as_i64(), Some(40));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn hashtag_network_reports_ordered_pairs(pool: sqlx::PgPool) {
        seed_post(&pool, "instagram", "IG-1", "cop30", &["cop30", "amazonia"], 1, 5).await;
        seed_post(&pool, "tiktok", "TT-1", "cop30", &["amazonia", "cop30"], 1, 5).await;

        let auth = crate::middleware::AuthState::from_env(true).expect("auth");
        let app = build_app(AppState { pool }, auth, default_rate_limit_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/hashtags/network?min_co_occurrence=2")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        let edges = json["data"]["edges"].as_array().expect("edges array");
        assert_eq!(edges.len(), 1, "one pair across both posts");
        assert_eq!(edges[0]["source"].as_str(), Some("amazonia"));
        assert_eq!(edges[0]["target"].as_str(), Some("cop30"));
        assert_eq!(edges[0]["weight"].as_i64(), Some(2));
        // Two usages per tag sits below the node floor; edges still appear.
        let nodes = json["data"]["nodes"].as_array().expect("nodes array");
        assert!(nodes.is_empty());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn emerging_hashtags_ranks_recent_tags(pool: sqlx::PgPool) {
        for n in 1..=3 {
            seed_post(
                &pool,
                "instagram",
                &format!("IG-{n}"),
                "cop30",
                &["mutirao"],
                1,
                10,
            )
            .await;
        }

        let auth = crate::middleware::AuthState::from_env(true).expect("auth");
        let app = build_app(AppState { pool }, auth, default_rate_limit_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/hashtags/emerging")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        let data = json["data"].as_array().expect("data array");
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["hashtag"].as_str(), Some("mutirao"));
        assert_eq!(data[0]["recent_count"].as_i64(), Some(3));
        assert_eq!(data[0]["growth_rate"].as_f64(), Some(100.0));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn top_posts_accepts_friendly_metric_alias(pool: sqlx::PgPool) {
        seed_post(&pool, "tiktok", "TT-1", "cop30", &["cop30"], 1, 500).await;

        let auth = crate::middleware::AuthState::from_env(true).expect("auth");
        let app = build_app(AppState { pool }, auth, default_rate_limit_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/top-posts?metric=views")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        let data = json["data"].as_array().expect("data array");
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["post_id"].as_str(), Some("TT-1"));
        assert_eq!(data[0]["views_count"].as_i64(), Some(500));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn top_posts_rejects_unknown_metric(pool: sqlx::PgPool) {
        let auth = crate::middleware::AuthState::from_env(true).expect("auth");
        let app = build_app(AppState { pool }, auth, default_rate_limit_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/top-posts?metric=zaps")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(json["error"]["code"].as_str(), Some("validation_error"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn runs_returns_ledger_rows(pool: sqlx::PgPool) {
        let keywords = vec!["cop30".to_string(), "clima".to_string()];
        sqlx::query(
            "INSERT INTO harvest_runs (public_id, platform, keywords, run_id, items_returned, \
                                       saved, duplicates, errors, started_at, duration_ms, status) \
             VALUES ($1, 'instagram', $2, 'run-abc', 12, 10, 2, 0, NOW(), 4200, 'success')",
        )
        .bind(Uuid::new_v4())
        .bind(&keywords)
        .execute(&pool)
        .await
        .expect("seed harvest run");

        let auth = crate::middleware::AuthState::from_env(true).expect("auth");
        let app = build_app(AppState { pool }, auth, default_rate_limit_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/runs?platform=instagram")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        let data = json["data"].as_array().expect("data array");
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["run_id"].as_str(), Some("run-abc"));
        assert_eq!(data[0]["saved"].as_i64(), Some(10));
        assert_eq!(data[0]["duplicates"].as_i64(), Some(2));
        assert_eq!(data[0]["status"].as_str(), Some("success"));
        assert!(data[0]["public_id"].as_str().is_some());
    }
}
