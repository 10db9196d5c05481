//! HTTP client for the Apify actor-run REST API.
//!
//! Wraps `reqwest` with bearer-token auth, transient-error retry, and typed
//! response deserialization. A harvest is three calls: start an actor run,
//! long-poll it to a terminal status, then fetch the dataset it produced.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

use tagpulse_core::{CollectionParams, Platform};

use crate::error::ApifyError;
use crate::retry::retry_with_backoff;
use crate::types::{ActorInput, ApiResponse, Harvest, RunData};

const DEFAULT_BASE_URL: &str = "https://api.apify.com/v2";

/// Interval the API holds a run-status request open before answering, in
/// seconds. The HTTP client timeout must stay above this.
const WAIT_FOR_FINISH_SECS: u64 = 60;

const REQUEST_TIMEOUT_SECS: u64 = 90;

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BACKOFF_BASE_MS: u64 = 5_000;

/// Actor for Instagram hashtag harvests (path form of `apify/instagram-scraper`).
const INSTAGRAM_SCRAPER: &str = "apify~instagram-scraper";

/// Actor for TikTok hashtag harvests (path form of `clockworks/tiktok-scraper`).
const TIKTOK_SCRAPER: &str = "clockworks~tiktok-scraper";

fn actor_id(platform: Platform) -> &'static str {
    match platform {
        Platform::Instagram => INSTAGRAM_SCRAPER,
        Platform::TikTok => TIKTOK_SCRAPER,
    }
}

/// Client for the Apify actor-run REST API.
///
/// Manages the HTTP client, API token, and base URL. Use [`ApifyClient::new`]
/// for production or [`ApifyClient::with_base_url`] to point at a mock
/// server in tests.
#[derive(Debug)]
pub struct ApifyClient {
    client: Client,
    token: String,
    base_url: String,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl ApifyClient {
    /// Creates a new client pointed at the production Apify API.
    ///
    /// # Errors
    ///
    /// Returns [`ApifyError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(token: &str) -> Result<Self, ApifyError> {
        Self::with_base_url(token, DEFAULT_BASE_URL)
    }

    /// Creates a new client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ApifyError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self, ApifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("tagpulse/0.1 (campaign-listening)")
            .build()?;

        Ok(Self {
            client,
            token: token.to_owned(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
        })
    }

    /// Overrides the transient-error retry policy.
    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base_secs: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_secs.saturating_mul(1_000);
        self
    }

    /// Starts an actor run for one platform's keyword batch.
    ///
    /// The configured run timeout and memory budget are passed through to
    /// the service unchanged as `timeout` (seconds) and `memory` (MB).
    ///
    /// # Errors
    ///
    /// - [`ApifyError::Api`] on a non-2xx response.
    /// - [`ApifyError::Http`] on network failure.
    /// - [`ApifyError::Deserialize`] if the response does not match the
    ///   expected envelope.
    pub async fn start_run(
        &self,
        platform: Platform,
        keywords: &[String],
        params: &CollectionParams,
    ) -> Result<RunData, ApifyError> {
        let input = ActorInput::for_platform(platform, keywords, params.results_limit);
        let url = format!(
            "{}/acts/{}/runs?timeout={}&memory={}",
            self.base_url,
            actor_id(platform),
            params.timeout_secs,
            params.memory_mbytes,
        );

        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.post_run(&url, &input)
        })
        .await
    }

    async fn post_run(&self, url: &str, input: &ActorInput) -> Result<RunData, ApifyError> {
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(input)
            .send()
            .await?;
        let envelope: ApiResponse<RunData> = Self::read_json(resp, "start run").await?;
        Ok(envelope.data)
    }

    /// Polls a run until it reaches a terminal status, long-polling with
    /// `waitForFinish` to keep the request count low.
    ///
    /// # Errors
    ///
    /// - [`ApifyError::Timeout`] if no terminal status arrives within `timeout`.
    /// - [`ApifyError::RunFailed`] if the run ends `FAILED`, `ABORTED`, or
    ///   `TIMED-OUT`.
    /// - [`ApifyError::Api`] / [`ApifyError::Http`] / [`ApifyError::Deserialize`]
    ///   as for any request.
    pub async fn wait_for_run(&self, run_id: &str, timeout: Duration) -> Result<RunData, ApifyError> {
        let url = format!(
            "{}/actor-runs/{run_id}?waitForFinish={WAIT_FOR_FINISH_SECS}",
            self.base_url
        );

        let polling = async {
            loop {
                let run = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
                    self.poll_run(&url, run_id)
                })
                .await?;

                if run.status == "SUCCEEDED" {
                    return Ok(run);
                }
                if run.is_terminal() {
                    return Err(ApifyError::RunFailed(run.status));
                }
                tracing::debug!(run_id, status = %run.status, "run still in progress");
            }
        };

        match tokio::time::timeout(timeout, polling).await {
            Ok(result) => result,
            Err(_) => Err(ApifyError::Timeout {
                secs: timeout.as_secs(),
            }),
        }
    }

    async fn poll_run(&self, url: &str, run_id: &str) -> Result<RunData, ApifyError> {
        let resp = self.client.get(url).bearer_auth(&self.token).send().await?;
        let envelope: ApiResponse<RunData> =
            Self::read_json(resp, &format!("run status ({run_id})")).await?;
        Ok(envelope.data)
    }

    /// Fetches all items from a run's default dataset.
    ///
    /// Items are returned untyped; the normalizer decides field by field
    /// what each one means.
    ///
    /// # Errors
    ///
    /// - [`ApifyError::Api`] on a non-2xx response.
    /// - [`ApifyError::Http`] on network failure.
    /// - [`ApifyError::Deserialize`] if the body is not a JSON array.
    pub async fn dataset_items(&self, dataset_id: &str) -> Result<Vec<Value>, ApifyError> {
        let url = format!(
            "{}/datasets/{dataset_id}/items?format=json&clean=true",
            self.base_url
        );

        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.fetch_items(&url, dataset_id)
        })
        .await
    }

    async fn fetch_items(&self, url: &str, dataset_id: &str) -> Result<Vec<Value>, ApifyError> {
        let resp = self.client.get(url).bearer_auth(&self.token).send().await?;
        Self::read_json(resp, &format!("dataset items ({dataset_id})")).await
    }

    /// Runs one platform harvest end-to-end: start the actor, wait for it,
    /// fetch the dataset.
    ///
    /// On success the returned [`Harvest`] always carries the run ID, even
    /// when the dataset is empty — the ledger records it either way.
    ///
    /// # Errors
    ///
    /// Any error from [`Self::start_run`], [`Self::wait_for_run`], or
    /// [`Self::dataset_items`].
    pub async fn harvest(
        &self,
        platform: Platform,
        keywords: &[String],
        params: &CollectionParams,
    ) -> Result<Harvest, ApifyError> {
        let started = Instant::now();
        tracing::info!(
            platform = %platform,
            keywords = keywords.len(),
            results_limit = params.results_limit,
            "starting harvest run"
        );

        let run = self.start_run(platform, keywords, params).await?;
        tracing::info!(run_id = %run.id, "run started, waiting for completion");

        let completed = self
            .wait_for_run(&run.id, Duration::from_secs(params.timeout_secs))
            .await?;

        let items = self.dataset_items(&completed.default_dataset_id).await?;
        let duration = started.elapsed();
        tracing::info!(
            run_id = %completed.id,
            items = items.len(),
            elapsed_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            "harvest complete"
        );

        Ok(Harvest {
            run_id: completed.id,
            items,
            duration,
        })
    }

    /// Asserts a 2xx HTTP status and parses the response body as JSON.
    ///
    /// Non-2xx responses become [`ApifyError::Api`], with the message pulled
    /// from the API's `{"error": {"message": ...}}` body when present.
    async fn read_json<T: DeserializeOwned>(
        resp: reqwest::Response,
        context: &str,
    ) -> Result<T, ApifyError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), &body));
        }
        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| ApifyError::Deserialize {
            context: context.to_string(),
            source: e,
        })
    }
}

fn api_error(status: u16, body: &str) -> ApifyError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(ToString::to_string)
        })
        .unwrap_or_else(|| body.to_string());
    ApifyError::Api { status, message }
}
