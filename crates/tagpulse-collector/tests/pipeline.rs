//! End-to-end harvest-cycle tests against Postgres and a mocked Apify API.
//!
//! Each test needs a live Postgres instance (`DATABASE_URL`); the HTTP side
//! is served by `wiremock`, so no real scraper traffic is made. Covers the
//! save/duplicate/error accounting, ledger rows, keyword attribution, and
//! per-platform failure isolation.

use serde_json::json;
use sqlx::PgPool;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tagpulse_apify::ApifyClient;
use tagpulse_collector::run_cycle;
use tagpulse_core::{CampaignConfig, CollectionParams, Platform, RunStatus};
use tagpulse_db::{count_posts, get_post, list_harvest_runs, RunFilters};

fn test_client(base_url: &str) -> ApifyClient {
    ApifyClient::with_base_url("test-token", base_url)
        .expect("client construction should not fail")
        .with_retry(0, 0)
}

fn campaign(platforms: &[Platform], keywords: &[&str]) -> CampaignConfig {
    CampaignConfig {
        keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
        platforms: platforms.to_vec(),
        collection: CollectionParams {
            results_limit: 50,
            timeout_secs: 30,
            memory_mbytes: 1024,
            platform_delay_secs: 0,
        },
        schedules: vec!["0 0 6 * * *".to_string()],
    }
}

fn run_body(id: &str, status: &str, dataset_id: &str) -> serde_json::Value {
    json!({
        "data": {
            "id": id,
            "status": status,
            "defaultDatasetId": dataset_id,
            "startedAt": "2026-08-01T06:00:00.000Z",
            "finishedAt": null
        }
    })
}

/// Mounts the start + poll mocks for one actor run that completes cleanly.
async fn mount_run(server: &MockServer, actor: &str, run_id: &str, dataset_id: &str) {
    Mock::given(method("POST"))
        .and(path(format!("/acts/{actor}/runs")))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(run_body(run_id, "RUNNING", dataset_id)),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/actor-runs/{run_id}")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(run_body(run_id, "SUCCEEDED", dataset_id)),
        )
        .mount(server)
        .await;
}

async fn mount_dataset(server: &MockServer, dataset_id: &str, items: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/datasets/{dataset_id}/items")))
        .respond_with(ResponseTemplate::new(200).set_body_json(items))
        .mount(server)
        .await;
}

fn instagram_item(id: &str, caption: &str, likes: i64) -> serde_json::Value {
    json!({
        "id": id,
        "shortCode": id,
        "ownerUsername": "ana.mar",
        "ownerId": "55001",
        "caption": caption,
        "timestamp": "2026-08-01T12:30:00.000Z",
        "likesCount": likes,
        "commentsCount": 3,
        "type": "Image",
        "displayUrl": "https://cdn.example.com/a.jpg"
    })
}

fn tiktok_item(id: &str, text: &str) -> serde_json::Value {
    json!({
        "id": id,
        "text": text,
        "authorMeta": { "name": "leo.films", "id": "88012" },
        "createTimeISO": "2026-08-02T10:00:00Z",
        "diggCount": 40,
        "commentCount": 5,
        "shareCount": 2,
        "playCount": 900,
        "videoMeta": { "coverUrl": "https://cdn.example.com/c.jpg" }
    })
}

// ---------------------------------------------------------------------------
// Save / error accounting
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn cycle_saves_posts_and_records_partial_ledger_row(pool: PgPool) {
    let server = MockServer::start().await;
    mount_run(&server, "apify~instagram-scraper", "run-1", "ds-1").await;
    mount_dataset(
        &server,
        "ds-1",
        json!([
            instagram_item("IG-1", "Morning at the harbor #Harbor #Dawn", 10),
            instagram_item("IG-2", "still waters near the harbor", 25),
            { "caption": "no id, no author" }
        ]),
    )
    .await;

    let client = test_client(&server.uri());
    let campaign = campaign(&[Platform::Instagram], &["harbor"]);

    let report = run_cycle(&pool, &client, &campaign)
        .await
        .expect("cycle should complete");

    assert_eq!(report.runs.len(), 1);
    let outcome = &report.runs[0];
    assert_eq!(outcome.platform, Platform::Instagram);
    assert_eq!(outcome.status, RunStatus::Partial, "one item was unusable");
    assert_eq!(outcome.run_id.as_deref(), Some("run-1"));
    assert_eq!(outcome.items_returned, 3);
    assert_eq!(outcome.saved, 2);
    assert_eq!(outcome.duplicates, 0);
    assert_eq!(outcome.errors, 1);
    let harbor = outcome.keyword_counts.get("harbor").copied().unwrap_or_default();
    assert_eq!(harbor.total, 2);
    assert_eq!(harbor.saved, 2);
    assert!(outcome.error_message.is_none());

    assert_eq!(count_posts(&pool).await.unwrap(), 2);

    let stored = get_post(&pool, Platform::Instagram, "IG-1")
        .await
        .expect("IG-1 should be stored");
    assert_eq!(stored.hashtags, vec!["harbor".to_string(), "dawn".to_string()]);
    assert_eq!(stored.keyword_matched, "harbor");
    assert_eq!(stored.likes_count, Some(10));

    let runs = list_harvest_runs(&pool, &RunFilters::default())
        .await
        .expect("ledger query failed");
    assert_eq!(runs.len(), 1);
    let run = &runs[0];
    assert_eq!(run.platform, "instagram");
    assert_eq!(run.keywords, vec!["harbor".to_string()]);
    assert_eq!(run.run_id.as_deref(), Some("run-1"));
    assert_eq!(run.status, "partial");
    assert_eq!(run.items_returned, 3);
    assert_eq!(run.saved, 2);
    assert_eq!(run.errors, 1);
    assert!(run.duration_ms >= 0);
}

// ---------------------------------------------------------------------------
// Reharvest / duplicates
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn second_cycle_refreshes_engagement_and_counts_duplicates(pool: PgPool) {
    let server = MockServer::start().await;
    mount_run(&server, "apify~instagram-scraper", "run-1", "ds-1").await;

    // First cycle sees likes=10; the second sees the same post at likes=99.
    Mock::given(method("GET"))
        .and(path("/datasets/ds-1/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([instagram_item(
            "IG-1",
            "Morning at the harbor #harbor",
            10
        )])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_dataset(
        &server,
        "ds-1",
        json!([instagram_item("IG-1", "Morning at the harbor #harbor", 99)]),
    )
    .await;

    let client = test_client(&server.uri());
    let campaign = campaign(&[Platform::Instagram], &["harbor"]);

    let first = run_cycle(&pool, &client, &campaign).await.unwrap();
    assert_eq!(first.runs[0].saved, 1);
    assert_eq!(first.runs[0].duplicates, 0);

    let second = run_cycle(&pool, &client, &campaign).await.unwrap();
    let outcome = &second.runs[0];
    assert_eq!(outcome.status, RunStatus::Success);
    assert_eq!(outcome.saved, 0, "refresh is not a new save");
    assert_eq!(outcome.duplicates, 1);
    let harbor = outcome.keyword_counts.get("harbor").copied().unwrap_or_default();
    assert_eq!(harbor.duplicates, 1);
    assert_eq!(harbor.saved, 0);

    let stored = get_post(&pool, Platform::Instagram, "IG-1").await.unwrap();
    assert_eq!(stored.likes_count, Some(99), "engagement should be refreshed");
    assert_eq!(count_posts(&pool).await.unwrap(), 1);

    let runs = list_harvest_runs(&pool, &RunFilters::default()).await.unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].duplicates, 1, "latest row reflects the rerun");
    assert_eq!(runs[0].saved, 0);
}

// ---------------------------------------------------------------------------
// Keyword attribution
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn unmatched_posts_attribute_to_first_campaign_keyword(pool: PgPool) {
    let server = MockServer::start().await;
    mount_run(&server, "apify~instagram-scraper", "run-1", "ds-1").await;
    mount_dataset(
        &server,
        "ds-1",
        json!([instagram_item("IG-9", "esse look de hoje", 1)]),
    )
    .await;

    let client = test_client(&server.uri());
    let campaign = campaign(&[Platform::Instagram], &["cop30", "clima"]);

    let report = run_cycle(&pool, &client, &campaign).await.unwrap();
    let cop30 = report.runs[0]
        .keyword_counts
        .get("cop30")
        .copied()
        .unwrap_or_default();
    assert_eq!(cop30.saved, 1);

    let stored = get_post(&pool, Platform::Instagram, "IG-9").await.unwrap();
    assert_eq!(stored.keyword_matched, "cop30");
}

// ---------------------------------------------------------------------------
// Per-platform failure isolation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn failed_platform_is_recorded_and_cycle_continues(pool: PgPool) {
    let server = MockServer::start().await;

    // Instagram run starts, then the poll reports a terminal failure.
    Mock::given(method("POST"))
        .and(path("/acts/apify~instagram-scraper/runs"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(run_body("run-ig", "RUNNING", "ds-ig")),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/actor-runs/run-ig"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(run_body("run-ig", "FAILED", "ds-ig")),
        )
        .mount(&server)
        .await;

    // TikTok completes normally.
    mount_run(&server, "clockworks~tiktok-scraper", "run-tt", "ds-tt").await;
    mount_dataset(
        &server,
        "ds-tt",
        json!([tiktok_item("TT-1", "harbor runs at sunrise")]),
    )
    .await;

    let client = test_client(&server.uri());
    let campaign = campaign(&[Platform::Instagram, Platform::TikTok], &["harbor"]);

    let report = run_cycle(&pool, &client, &campaign)
        .await
        .expect("a platform failure must not abort the cycle");

    assert_eq!(report.runs.len(), 2);
    assert_eq!(report.failed_platforms(), vec![Platform::Instagram]);

    let failed = &report.runs[0];
    assert_eq!(failed.status, RunStatus::Failed);
    assert!(failed.run_id.is_none());
    assert_eq!(failed.saved, 0);
    let message = failed.error_message.as_deref().unwrap_or_default();
    assert!(
        message.contains("FAILED"),
        "error message should carry the terminal status, got: {message}"
    );

    let succeeded = &report.runs[1];
    assert_eq!(succeeded.platform, Platform::TikTok);
    assert_eq!(succeeded.status, RunStatus::Success);
    assert_eq!(succeeded.saved, 1);

    assert_eq!(count_posts(&pool).await.unwrap(), 1);
    assert!(get_post(&pool, Platform::TikTok, "TT-1").await.is_ok());

    let runs = list_harvest_runs(&pool, &RunFilters::default()).await.unwrap();
    assert_eq!(runs.len(), 2);
    let failed_row = runs
        .iter()
        .find(|r| r.platform == "instagram")
        .expect("failed platform should still get a ledger row");
    assert_eq!(failed_row.status, "failed");
    assert!(failed_row.run_id.is_none());
    assert!(failed_row
        .error_message
        .as_deref()
        .unwrap_or_default()
        .contains("FAILED"));
}
