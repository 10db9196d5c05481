//! Apify API request and response types.
//!
//! The API wraps every response in a `{"data": ...}` envelope; [`ApiResponse`]
//! captures that pattern generically. Actor inputs are typed per scraper so
//! the wire contract is visible in one place; dataset items stay untyped
//! (`serde_json::Value`) because payload shapes drift between scraper
//! versions and the normalizer probes them field by field.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use tagpulse_core::Platform;

/// Top-level envelope for all Apify API responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Apify actor run metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct RunData {
    pub id: String,
    /// `READY`, `RUNNING`, `SUCCEEDED`, `FAILED`, `ABORTED`, or `TIMED-OUT`.
    pub status: String,
    #[serde(rename = "defaultDatasetId")]
    pub default_dataset_id: String,
    #[serde(rename = "startedAt")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "finishedAt")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunData {
    /// Returns `true` once the run can no longer change status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status.as_str(),
            "SUCCEEDED" | "FAILED" | "ABORTED" | "TIMED-OUT"
        )
    }
}

/// Input for the apify/instagram-scraper actor in hashtag mode.
#[derive(Debug, Clone, Serialize)]
pub struct InstagramScraperInput {
    /// Hashtags without the `#` prefix.
    pub hashtags: Vec<String>,
    #[serde(rename = "resultsLimit")]
    pub results_limit: u32,
}

/// Input for the clockworks/tiktok-scraper actor in hashtag mode.
///
/// All download flags are off: the pipeline stores asset URLs, never the
/// assets themselves.
#[derive(Debug, Clone, Serialize)]
pub struct TikTokScraperInput {
    /// Hashtags with the `#` prefix, which this scraper requires.
    pub hashtags: Vec<String>,
    #[serde(rename = "resultsPerPage")]
    pub results_per_page: u32,
    /// `""` searches all sections, `"/video"` videos only.
    #[serde(rename = "searchSection")]
    pub search_section: String,
    #[serde(rename = "shouldDownloadVideos")]
    pub should_download_videos: bool,
    #[serde(rename = "shouldDownloadCovers")]
    pub should_download_covers: bool,
    #[serde(rename = "shouldDownloadSubtitles")]
    pub should_download_subtitles: bool,
    #[serde(rename = "shouldDownloadSlideshowImages")]
    pub should_download_slideshow_images: bool,
}

/// Actor input for one platform harvest.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ActorInput {
    Instagram(InstagramScraperInput),
    TikTok(TikTokScraperInput),
}

impl ActorInput {
    /// Builds the platform-appropriate input for a keyword batch.
    ///
    /// Keywords are configured without the `#` prefix; the TikTok scraper
    /// wants it added, the Instagram one does not.
    #[must_use]
    pub fn for_platform(platform: Platform, keywords: &[String], results_limit: u32) -> Self {
        match platform {
            Platform::Instagram => ActorInput::Instagram(InstagramScraperInput {
                hashtags: keywords.to_vec(),
                results_limit,
            }),
            Platform::TikTok => ActorInput::TikTok(TikTokScraperInput {
                hashtags: keywords.iter().map(|k| format!("#{k}")).collect(),
                results_per_page: results_limit,
                search_section: String::new(),
                should_download_videos: false,
                should_download_covers: false,
                should_download_subtitles: false,
                should_download_slideshow_images: false,
            }),
        }
    }
}

/// Outcome of one end-to-end harvest: the raw dataset items plus the run
/// identity needed for the ledger. `run_id` is present even when the dataset
/// came back empty.
#[derive(Debug, Clone)]
pub struct Harvest {
    pub run_id: String,
    pub items: Vec<Value>,
    pub duration: Duration,
}
