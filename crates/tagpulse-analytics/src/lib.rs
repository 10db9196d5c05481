//! In-memory analytics over harvested posts.
//!
//! Everything here is a pure computation. The reporting layer fetches the
//! hashtag-bearing posts once, maps them into [`TaggedPost`], and hands the
//! slice to these builders; nothing in this crate touches the network or the
//! database.

pub mod graph;
pub mod trend;
pub mod types;

pub use graph::{build_graph, HashtagEdge, HashtagNetwork, HashtagNode};
pub use trend::{emerging_hashtags, EmergingHashtag};
pub use types::TaggedPost;
