//! Hashtag extraction and campaign keyword attribution.

use std::sync::LazyLock;

use regex::Regex;

static HASHTAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([\wÀ-ſ]+)").expect("valid hashtag regex"));

/// Pulls hashtags out of free text: `#` followed by word characters,
/// including the Latin-1/Latin-Extended letters common in Portuguese and
/// Spanish captions, so `#ação` and `#día` survive intact. Tags come back
/// lowercased, deduplicated, in first-seen order, without the `#`.
#[must_use]
pub fn hashtags_from_text(text: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for capture in HASHTAG_RE.captures_iter(text) {
        let tag = capture[1].to_lowercase();
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

/// Canonicalizes an explicit tag list the same way caption-derived tags are
/// treated: leading `#` stripped, lowercased, blanks dropped, first
/// occurrence wins.
#[must_use]
pub fn canonicalize_tags(raw: Vec<String>) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for entry in raw {
        let tag = entry.trim().trim_start_matches('#').to_lowercase();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

/// Attributes an item to a campaign keyword.
///
/// Keywords are tried in their configured order; the first one found in the
/// caption or inside any hashtag wins. When nothing matches, the item is
/// attributed to the first keyword of the batch rather than dropped: hashtag
/// search actors return related content beyond the literal query, and an
/// unattributed post would otherwise vanish from every per-keyword rollup.
///
/// Returns `None` only for an empty keyword list.
#[must_use]
pub fn detect_keyword(keywords: &[String], caption: &str, hashtags: &[String]) -> Option<String> {
    let caption_lower = caption.to_lowercase();
    for keyword in keywords {
        let needle = keyword.to_lowercase();
        if caption_lower.contains(&needle) || hashtags.iter().any(|tag| tag.contains(&needle)) {
            return Some(keyword.clone());
        }
    }

    let fallback = keywords.first()?;
    tracing::debug!(keyword = %fallback, "no keyword matched; attributing to first of batch");
    Some(fallback.clone())
}
