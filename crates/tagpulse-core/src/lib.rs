pub mod app_config;
pub mod campaign;
pub mod config;
pub mod post;
pub mod types;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use campaign::{load_campaign, CampaignConfig, CollectionParams};
pub use config::{load_app_config, load_app_config_from_env};
pub use post::Post;
pub use types::{MediaKind, Platform, RunStatus};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read campaign file at {path}: {source}")]
    CampaignFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse campaign file: {0}")]
    CampaignFileParse(#[from] serde_yaml::Error),

    #[error("campaign validation failed: {0}")]
    Validation(String),
}
