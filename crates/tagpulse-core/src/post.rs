use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{MediaKind, Platform};

/// A social post normalized from a raw scraper payload, ready for storage
/// and comparison across platforms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub platform: Platform,
    /// Platform-native post ID. Unique together with `platform`.
    pub post_id: String,
    pub username: Option<String>,
    /// Platform-native author ID, when the scraper returns one.
    pub user_id: Option<String>,
    pub caption: String,
    /// Lowercased, deduplicated, first-seen order preserved.
    pub hashtags: Vec<String>,
    /// Campaign keyword this post is attributed to.
    pub keyword_matched: String,
    /// Publish time as reported by the platform; `None` when absent or
    /// unparseable.
    pub published_at: Option<DateTime<Utc>>,
    /// `None` means the platform does not report the metric; `Some(0)` means
    /// it reports zero. The distinction survives into storage.
    pub likes: Option<i64>,
    pub comments: Option<i64>,
    pub shares: Option<i64>,
    pub views: Option<i64>,
    pub post_url: Option<String>,
    /// Display assets in render order; carousel children follow the lead asset.
    pub media_urls: Vec<String>,
    pub media_kind: MediaKind,
    /// Verbatim scraper payload, kept for reprocessing.
    pub raw_payload: Value,
}

impl Post {
    /// Returns the identity field this post is missing, if any.
    ///
    /// A post without a platform-native ID or an author username cannot be
    /// deduplicated or attributed and must not be stored.
    #[must_use]
    pub fn missing_identity_field(&self) -> Option<&'static str> {
        if self.post_id.trim().is_empty() {
            return Some("post_id");
        }
        match &self.username {
            Some(name) if !name.trim().is_empty() => None,
            _ => Some("username"),
        }
    }
}
