//! Emerging-hashtag ranking: week-over-week growth per hashtag.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::types::TaggedPost;

/// Days in each comparison window.
const WINDOW_DAYS: i64 = 7;

/// Minimum recent-window posts before a hashtag can rank. Below this the
/// growth figure is noise.
pub const MIN_RECENT_COUNT: i64 = 3;

#[derive(Debug, Clone, Serialize)]
pub struct EmergingHashtag {
    pub hashtag: String,
    pub recent_count: i64,
    pub prior_count: i64,
    /// Likes plus comments across the recent-window posts.
    pub recent_engagement: i64,
    /// Percent change from the prior window, rounded to two decimals. A
    /// hashtag absent from the prior window reads exactly `100.0`.
    pub growth_rate: f64,
}

#[derive(Default)]
struct WindowAcc {
    recent: i64,
    prior: i64,
    recent_engagement: i64,
}

/// Ranks hashtags by week-over-week growth.
///
/// The recent window is `[now - 7d, now]` and the prior window
/// `[now - 14d, now - 7d)`; undated posts are ignored. Only hashtags with at
/// least [`MIN_RECENT_COUNT`] recent posts rank, ordered by growth rate,
/// then recent engagement, then name.
#[must_use]
pub fn emerging_hashtags(
    posts: &[TaggedPost],
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<EmergingHashtag> {
    let recent_start = now - Duration::days(WINDOW_DAYS);
    let prior_start = now - Duration::days(2 * WINDOW_DAYS);

    let mut tags: BTreeMap<String, WindowAcc> = BTreeMap::new();

    for post in posts {
        let Some(published) = post.published_at else {
            continue;
        };
        let in_recent = published >= recent_start && published <= now;
        let in_prior = published >= prior_start && published < recent_start;
        if !in_recent && !in_prior {
            continue;
        }

        let unique: BTreeSet<&str> = post.hashtags.iter().map(String::as_str).collect();
        for tag in unique {
            let acc = tags.entry(tag.to_string()).or_default();
            if in_recent {
                acc.recent += 1;
                acc.recent_engagement += post.engagement;
            } else {
                acc.prior += 1;
            }
        }
    }

    let mut ranked: Vec<EmergingHashtag> = tags
        .into_iter()
        .filter(|(_, acc)| acc.recent >= MIN_RECENT_COUNT)
        .map(|(hashtag, acc)| EmergingHashtag {
            hashtag,
            recent_count: acc.recent,
            prior_count: acc.prior,
            recent_engagement: acc.recent_engagement,
            growth_rate: growth_rate(acc.recent, acc.prior),
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.growth_rate
            .partial_cmp(&a.growth_rate)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.recent_engagement.cmp(&a.recent_engagement))
            .then_with(|| a.hashtag.cmp(&b.hashtag))
    });
    ranked.truncate(limit);
    ranked
}

/// Percent change between windows. A zero prior count reads as exactly
/// +100%, which keeps brand-new hashtags rankable without dividing by zero.
fn growth_rate(recent: i64, prior: i64) -> f64 {
    if prior == 0 {
        return 100.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let raw = (recent - prior) as f64 / prior as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tagpulse_core::Platform;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 20, 12, 0, 0).single().unwrap()
    }

    fn dated_post(tags: &[&str], days_ago: i64, engagement: i64) -> TaggedPost {
        TaggedPost {
            platform: Platform::Instagram,
            hashtags: tags.iter().map(|t| (*t).to_string()).collect(),
            published_at: Some(now() - Duration::days(days_ago)),
            engagement,
        }
    }

    #[test]
    fn new_hashtag_clamps_growth_to_exactly_100() {
        let posts: Vec<TaggedPost> = (1..=5)
            .map(|d| dated_post(&["riverfest"], d, 10))
            .collect();
        let ranked = emerging_hashtags(&posts, now(), 10);

        assert_eq!(ranked.len(), 1);
        let top = &ranked[0];
        assert_eq!(top.hashtag, "riverfest");
        assert_eq!(top.recent_count, 5);
        assert_eq!(top.prior_count, 0);
        assert!((top.growth_rate - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn growth_is_rounded_to_two_decimals() {
        // recent 4, prior 3: (4 - 3) / 3 * 100 = 33.333... -> 33.33
        let mut posts: Vec<TaggedPost> =
            (1..=4).map(|d| dated_post(&["clima"], d, 0)).collect();
        posts.extend((8..=10).map(|d| dated_post(&["clima"], d, 0)));

        let ranked = emerging_hashtags(&posts, now(), 10);
        assert!((ranked[0].growth_rate - 33.33).abs() < 1e-9);
    }

    #[test]
    fn decline_reads_negative() {
        // recent 3, prior 6: -50%.
        let mut posts: Vec<TaggedPost> =
            (1..=3).map(|d| dated_post(&["fading"], d, 0)).collect();
        posts.extend((8..=13).map(|d| dated_post(&["fading"], d, 0)));

        let ranked = emerging_hashtags(&posts, now(), 10);
        assert_eq!(ranked[0].prior_count, 6);
        assert!((ranked[0].growth_rate - (-50.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn fewer_than_three_recent_posts_does_not_rank() {
        let posts = vec![
            dated_post(&["quiet"], 1, 100),
            dated_post(&["quiet"], 2, 100),
        ];
        assert!(emerging_hashtags(&posts, now(), 10).is_empty());
    }

    #[test]
    fn window_boundaries_are_inclusive_recent_exclusive_prior() {
        let exactly_7d = TaggedPost {
            published_at: Some(now() - Duration::days(7)),
            ..dated_post(&["edge"], 0, 0)
        };
        let mut posts = vec![exactly_7d.clone(), exactly_7d.clone(), exactly_7d];
        // Exactly 14 days back is the first instant of the prior window.
        posts.push(dated_post(&["edge"], 14, 0));
        posts.push(dated_post(&["edge"], 9, 0));
        // Beyond the prior window and undated posts are ignored.
        posts.push(dated_post(&["edge"], 15, 0));
        posts.push(TaggedPost {
            published_at: None,
            ..dated_post(&["edge"], 0, 0)
        });

        let ranked = emerging_hashtags(&posts, now(), 10);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].recent_count, 3, "the 7d boundary is recent");
        assert_eq!(ranked[0].prior_count, 2);
    }

    #[test]
    fn ranking_breaks_ties_on_engagement_then_name() {
        // beta: growth 100, engagement 50.
        let mut posts = vec![
            dated_post(&["beta"], 1, 25),
            dated_post(&["beta"], 2, 25),
            dated_post(&["beta"], 3, 0),
        ];
        // gamma: recent 6 prior 3 -> growth 100, engagement 50.
        for d in 1..=5 {
            posts.push(dated_post(&["gamma"], d, 10));
        }
        posts.push(dated_post(&["gamma"], 6, 0));
        for d in 8..=10 {
            posts.push(dated_post(&["gamma"], d, 99));
        }
        // alpha: growth 100, engagement 30.
        for d in 1..=3 {
            posts.push(dated_post(&["alpha"], d, 10));
        }
        // delta: recent 4 prior 8 -> growth -50.
        for d in 1..=4 {
            posts.push(dated_post(&["delta"], d, 0));
        }
        for _ in 0..8 {
            posts.push(dated_post(&["delta"], 9, 0));
        }

        let ranked = emerging_hashtags(&posts, now(), 10);
        let names: Vec<&str> = ranked.iter().map(|e| e.hashtag.as_str()).collect();
        assert_eq!(names, vec!["beta", "gamma", "alpha", "delta"]);
    }

    #[test]
    fn limit_truncates_after_ranking() {
        let mut posts: Vec<TaggedPost> =
            (1..=3).map(|d| dated_post(&["first"], d, 50)).collect();
        posts.extend((1..=3).map(|d| dated_post(&["second"], d, 10)));

        let ranked = emerging_hashtags(&posts, now(), 1);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].hashtag, "first");
    }

    #[test]
    fn engagement_counts_recent_window_only() {
        let mut posts = vec![
            dated_post(&["eco"], 1, 10),
            dated_post(&["eco"], 2, 20),
            dated_post(&["eco"], 3, 0),
        ];
        posts.push(dated_post(&["eco"], 9, 999));

        let ranked = emerging_hashtags(&posts, now(), 10);
        assert_eq!(ranked[0].recent_engagement, 30);
    }
}
