use chrono::{DateTime, Utc};

use tagpulse_core::Platform;

/// One hashtag-bearing post, reduced to the fields the analytics builders
/// read.
#[derive(Debug, Clone)]
pub struct TaggedPost {
    pub platform: Platform,
    /// Lowercased, deduplicated hashtags.
    pub hashtags: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
    /// Likes plus comments; zero when the platform reported neither.
    pub engagement: i64,
}
