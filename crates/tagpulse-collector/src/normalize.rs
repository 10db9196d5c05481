//! Normalization from raw actor payloads to [`tagpulse_core::Post`].
//!
//! Each platform has its own chain of candidate fields, ordered newest actor
//! shape first. Everything beyond the identity fields is soft: a missing
//! caption becomes empty, missing counters take the platform's default, and
//! an unreadable timestamp becomes `None`.

use serde_json::Value;
use thiserror::Error;

use tagpulse_core::{MediaKind, Platform, Post};

use crate::extract::{first_count, first_str, first_timestamp, lookup};
use crate::matcher::{canonicalize_tags, detect_keyword, hashtags_from_text};

/// A raw item that cannot be identified or attributed.
#[derive(Debug, Error)]
#[error("item is missing required field: {field}")]
pub struct NormalizeError {
    pub field: &'static str,
}

/// Normalizes one raw dataset item into a [`Post`].
///
/// # Errors
///
/// Returns [`NormalizeError`] if the item lacks a platform-native post ID or
/// an author username; such items cannot be deduplicated or attributed and
/// must not reach storage.
pub fn normalize_item(
    platform: Platform,
    keywords: &[String],
    raw: &Value,
) -> Result<Post, NormalizeError> {
    let post = match platform {
        Platform::Instagram => instagram_post(keywords, raw),
        Platform::TikTok => tiktok_post(keywords, raw),
    };

    if let Some(field) = post.missing_identity_field() {
        return Err(NormalizeError { field });
    }
    Ok(post)
}

fn instagram_post(keywords: &[String], raw: &Value) -> Post {
    let post_id = first_str(raw, &["id", "shortCode"]).unwrap_or_default();
    let username = first_str(raw, &["ownerUsername", "owner/username"]);
    let user_id = first_str(raw, &["ownerId", "owner/id"]);
    let caption = first_str(raw, &["caption"]).unwrap_or_default();

    let hashtags = explicit_hashtags(raw).unwrap_or_else(|| hashtags_from_text(&caption));
    let keyword_matched = detect_keyword(keywords, &caption, &hashtags).unwrap_or_default();

    // Reels report type "Video" or productType "clips"; the presence of a
    // video URL catches older payloads that carry neither marker.
    let is_video = lookup(raw, "type").and_then(Value::as_str) == Some("Video")
        || lookup(raw, "productType").and_then(Value::as_str) == Some("clips")
        || lookup(raw, "videoUrl").is_some();

    let mut media_urls = Vec::new();
    if let Some(url) = first_str(raw, &["videoUrl", "displayUrl"]) {
        media_urls.push(url);
    }
    if let Some(children) = lookup(raw, "childPosts").and_then(Value::as_array) {
        for child in children {
            if let Some(url) = first_str(child, &["videoUrl", "displayUrl"]) {
                media_urls.push(url);
            }
        }
    }

    let post_url = first_str(raw, &["url"]).or_else(|| {
        first_str(raw, &["shortCode"]).map(|code| format!("https://www.instagram.com/p/{code}/"))
    });

    Post {
        platform: Platform::Instagram,
        post_id,
        username,
        user_id,
        likes: Some(first_count(raw, &["likesCount"]).unwrap_or(0)),
        comments: Some(first_count(raw, &["commentsCount"]).unwrap_or(0)),
        // Instagram's public surface exposes neither; NULL, not zero.
        shares: None,
        views: None,
        published_at: first_timestamp(raw, &["timestamp"]),
        hashtags,
        keyword_matched,
        caption,
        post_url,
        media_urls,
        media_kind: if is_video {
            MediaKind::Video
        } else {
            MediaKind::Photo
        },
        raw_payload: raw.clone(),
    }
}

fn tiktok_post(keywords: &[String], raw: &Value) -> Post {
    let post_id = first_str(raw, &["id"]).unwrap_or_default();
    let username = first_str(raw, &["authorMeta/name", "author/uniqueId"]);
    let user_id = first_str(raw, &["authorMeta/id", "author/id"]);
    let caption = first_str(raw, &["text"]).unwrap_or_default();

    let hashtags = explicit_hashtags(raw).unwrap_or_else(|| hashtags_from_text(&caption));
    let keyword_matched = detect_keyword(keywords, &caption, &hashtags).unwrap_or_default();

    let mut media_urls = Vec::new();
    if let Some(url) = first_str(raw, &["videoMeta/coverUrl", "covers/default", "videoUrl"]) {
        media_urls.push(url);
    }

    let post_url = first_str(raw, &["webVideoUrl"]).or_else(|| {
        username
            .as_deref()
            .map(|name| format!("https://www.tiktok.com/@{name}/video/{post_id}"))
    });

    Post {
        platform: Platform::TikTok,
        post_id,
        username,
        user_id,
        likes: Some(first_count(raw, &["diggCount", "stats/diggCount"]).unwrap_or(0)),
        comments: Some(first_count(raw, &["commentCount", "stats/commentCount"]).unwrap_or(0)),
        shares: Some(first_count(raw, &["shareCount", "stats/shareCount"]).unwrap_or(0)),
        views: Some(first_count(raw, &["playCount", "stats/playCount"]).unwrap_or(0)),
        published_at: first_timestamp(raw, &["createTimeISO", "createTime"]),
        hashtags,
        keyword_matched,
        caption,
        post_url,
        media_urls,
        media_kind: MediaKind::Video,
        raw_payload: raw.clone(),
    }
}

/// Reads an explicit hashtag array when the payload carries one. Entries may
/// be bare strings (Instagram) or `{ "name": ... }` objects (TikTok). An
/// absent or empty array yields `None` so the caller falls back to mining the
/// caption.
fn explicit_hashtags(raw: &Value) -> Option<Vec<String>> {
    let entries = lookup(raw, "hashtags")?.as_array()?;
    let tags: Vec<String> = entries.iter().filter_map(tag_entry).collect();
    if tags.is_empty() {
        None
    } else {
        Some(canonicalize_tags(tags))
    }
}

fn tag_entry(entry: &Value) -> Option<String> {
    match entry {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map
            .get("name")
            .and_then(Value::as_str)
            .map(ToString::to_string),
        _ => None,
    }
}
