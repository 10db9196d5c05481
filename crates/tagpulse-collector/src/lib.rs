mod extract;

pub mod matcher;
pub mod normalize;
pub mod pipeline;

pub use matcher::{detect_keyword, hashtags_from_text};
pub use normalize::{normalize_item, NormalizeError};
pub use pipeline::{
    client_from_config, run_cycle, CollectorError, CycleSummary, KeywordStats, PlatformOutcome,
};
