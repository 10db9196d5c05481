use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("unknown platform: {0}")]
pub struct ParsePlatformError(String);

/// Social platform a post was harvested from.
///
/// Stored in Postgres as lowercase TEXT; the scraper actor, payload shape,
/// and normalization chain are all selected by this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    TikTok,
}

impl Platform {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::TikTok => "tiktok",
        }
    }

    /// All platforms, in the default collection order.
    #[must_use]
    pub fn all() -> &'static [Platform] {
        &[Platform::Instagram, Platform::TikTok]
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = ParsePlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "instagram" => Ok(Platform::Instagram),
            "tiktok" => Ok(Platform::TikTok),
            other => Err(ParsePlatformError(other.to_string())),
        }
    }
}

/// Primary media type of a post. Carousels count as photo unless the
/// payload marks the lead asset as video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one platform harvest, as recorded in the run ledger.
///
/// `Partial` means the harvest call succeeded but at least one item failed
/// normalization or persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Partial,
    Failed,
}

impl RunStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Partial => "partial",
            RunStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_display_roundtrip() {
        for platform in Platform::all() {
            let parsed: Platform = platform.to_string().parse().unwrap();
            assert_eq!(parsed, *platform);
        }
    }

    #[test]
    fn platform_from_str_is_case_insensitive() {
        assert_eq!("TikTok".parse::<Platform>().unwrap(), Platform::TikTok);
        assert_eq!("INSTAGRAM".parse::<Platform>().unwrap(), Platform::Instagram);
    }

    #[test]
    fn platform_from_str_rejects_unknown() {
        assert!("twitter".parse::<Platform>().is_err());
    }

    #[test]
    fn platform_serde_is_lowercase() {
        assert_eq!(
            serde_json::to_string(&Platform::TikTok).unwrap(),
            "\"tiktok\""
        );
        let parsed: Platform = serde_json::from_str("\"instagram\"").unwrap();
        assert_eq!(parsed, Platform::Instagram);
    }

    #[test]
    fn run_status_as_str() {
        assert_eq!(RunStatus::Success.as_str(), "success");
        assert_eq!(RunStatus::Partial.as_str(), "partial");
        assert_eq!(RunStatus::Failed.as_str(), "failed");
    }

    #[test]
    fn media_kind_as_str() {
        assert_eq!(MediaKind::Photo.as_str(), "photo");
        assert_eq!(MediaKind::Video.as_str(), "video");
    }
}
