//! Hashtag co-occurrence network.
//!
//! Edges count how often two hashtags appear on the same post; nodes rank
//! hashtags by overall usage. The two sets are computed independently, so a
//! heavily used hashtag still shows up when none of its pairings clear the
//! co-occurrence threshold.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::types::TaggedPost;

/// Edge cap after threshold filtering and weight sorting.
pub const MAX_EDGES: usize = 100;

/// Node cap after usage sorting.
pub const MAX_NODES: usize = 50;

/// Minimum posts a hashtag must appear on to become a node.
pub const MIN_NODE_USAGE: i64 = 3;

#[derive(Debug, Clone, Serialize)]
pub struct HashtagNode {
    pub hashtag: String,
    /// Number of posts the hashtag appears on.
    pub usage_count: i64,
    pub platforms: BTreeSet<String>,
    pub total_engagement: i64,
}

/// An unordered co-occurrence pair. `source < target` lexicographically, so
/// `{a, b}` and `{b, a}` always land on the same edge.
#[derive(Debug, Clone, Serialize)]
pub struct HashtagEdge {
    pub source: String,
    pub target: String,
    /// Number of posts both hashtags appear on together.
    pub weight: i64,
    pub platforms: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HashtagNetwork {
    pub nodes: Vec<HashtagNode>,
    pub edges: Vec<HashtagEdge>,
}

#[derive(Default)]
struct NodeAcc {
    usage: i64,
    platforms: BTreeSet<String>,
    engagement: i64,
}

#[derive(Default)]
struct EdgeAcc {
    weight: i64,
    platforms: BTreeSet<String>,
}

/// Builds the co-occurrence network for one batch of posts.
///
/// Edges keep pairs that co-occur at least `min_co_occurrence` times, sorted
/// weight-descending (ties break on the pair key) and capped at
/// [`MAX_EDGES`]. Nodes are the top [`MAX_NODES`] hashtags with usage of at
/// least [`MIN_NODE_USAGE`], sorted usage-descending.
#[must_use]
pub fn build_graph(posts: &[TaggedPost], min_co_occurrence: i64) -> HashtagNetwork {
    let mut nodes: BTreeMap<String, NodeAcc> = BTreeMap::new();
    let mut edges: BTreeMap<(String, String), EdgeAcc> = BTreeMap::new();

    for post in posts {
        // Stored hashtags are already deduplicated; the set also puts them in
        // lexicographic order so pair keys come out source < target.
        let tags: BTreeSet<&str> = post.hashtags.iter().map(String::as_str).collect();
        let platform = post.platform.as_str();

        for &tag in &tags {
            let acc = nodes.entry(tag.to_string()).or_default();
            acc.usage += 1;
            acc.engagement += post.engagement;
            acc.platforms.insert(platform.to_string());
        }

        let ordered: Vec<&str> = tags.into_iter().collect();
        for i in 0..ordered.len() {
            for j in (i + 1)..ordered.len() {
                let key = (ordered[i].to_string(), ordered[j].to_string());
                let acc = edges.entry(key).or_default();
                acc.weight += 1;
                acc.platforms.insert(platform.to_string());
            }
        }
    }

    let mut edge_list: Vec<HashtagEdge> = edges
        .into_iter()
        .filter(|(_, acc)| acc.weight >= min_co_occurrence)
        .map(|((source, target), acc)| HashtagEdge {
            source,
            target,
            weight: acc.weight,
            platforms: acc.platforms,
        })
        .collect();
    edge_list.sort_by(|a, b| {
        b.weight
            .cmp(&a.weight)
            .then_with(|| a.source.cmp(&b.source))
            .then_with(|| a.target.cmp(&b.target))
    });
    edge_list.truncate(MAX_EDGES);

    let mut node_list: Vec<HashtagNode> = nodes
        .into_iter()
        .filter(|(_, acc)| acc.usage >= MIN_NODE_USAGE)
        .map(|(hashtag, acc)| HashtagNode {
            hashtag,
            usage_count: acc.usage,
            platforms: acc.platforms,
            total_engagement: acc.engagement,
        })
        .collect();
    node_list.sort_by(|a, b| {
        b.usage_count
            .cmp(&a.usage_count)
            .then_with(|| a.hashtag.cmp(&b.hashtag))
    });
    node_list.truncate(MAX_NODES);

    HashtagNetwork {
        nodes: node_list,
        edges: edge_list,
    }
}
