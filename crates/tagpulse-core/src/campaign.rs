use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::Platform;
use crate::ConfigError;

/// Per-cycle collection parameters, passed through to the harvesting
/// service unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionParams {
    /// Maximum posts requested per hashtag per run.
    pub results_limit: u32,
    /// Upper bound on a single scraper run, in seconds.
    pub timeout_secs: u64,
    /// Memory budget for the scraper run, in megabytes.
    pub memory_mbytes: u32,
    /// Pause between consecutive platform harvests.
    pub platform_delay_secs: u64,
}

impl Default for CollectionParams {
    fn default() -> Self {
        CollectionParams {
            results_limit: 500,
            timeout_secs: 600,
            memory_mbytes: 4096,
            platform_delay_secs: 5,
        }
    }
}

/// A keyword campaign: what to track, where, and how often.
///
/// Loaded once at startup from `campaign.yaml` and treated as immutable for
/// the lifetime of the process. Keyword order is significant: posts that
/// match none of the campaign keywords are attributed to the first one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignConfig {
    pub keywords: Vec<String>,
    pub platforms: Vec<Platform>,
    #[serde(default)]
    pub collection: CollectionParams,
    /// 6-field cron expressions for scheduled harvests.
    #[serde(default = "default_schedules")]
    pub schedules: Vec<String>,
}

fn default_schedules() -> Vec<String> {
    vec!["0 0 6 * * *".to_string(), "0 0 18 * * *".to_string()]
}

/// Load and validate a campaign definition from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_campaign(path: &Path) -> Result<CampaignConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CampaignFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let campaign: CampaignConfig = serde_yaml::from_str(&content)?;

    validate_campaign(&campaign)?;

    Ok(campaign)
}

fn validate_campaign(campaign: &CampaignConfig) -> Result<(), ConfigError> {
    if campaign.keywords.is_empty() {
        return Err(ConfigError::Validation(
            "campaign must define at least one keyword".to_string(),
        ));
    }

    let mut seen_keywords = HashSet::new();
    for keyword in &campaign.keywords {
        if keyword.trim().is_empty() {
            return Err(ConfigError::Validation(
                "keywords must be non-empty".to_string(),
            ));
        }
        if keyword.starts_with('#') {
            return Err(ConfigError::Validation(format!(
                "keyword '{keyword}' must not include the '#' prefix; it is added per platform"
            )));
        }
        if keyword.chars().any(char::is_whitespace) {
            return Err(ConfigError::Validation(format!(
                "keyword '{keyword}' must not contain whitespace"
            )));
        }
        if !seen_keywords.insert(keyword.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate keyword: '{keyword}'"
            )));
        }
    }

    if campaign.platforms.is_empty() {
        return Err(ConfigError::Validation(
            "campaign must define at least one platform".to_string(),
        ));
    }

    let mut seen_platforms = HashSet::new();
    for platform in &campaign.platforms {
        if !seen_platforms.insert(*platform) {
            return Err(ConfigError::Validation(format!(
                "duplicate platform: '{platform}'"
            )));
        }
    }

    if campaign.collection.results_limit == 0 {
        return Err(ConfigError::Validation(
            "collection.results_limit must be at least 1".to_string(),
        ));
    }

    if campaign.schedules.iter().any(|s| s.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "schedules must be non-empty cron expressions".to_string(),
        ));
    }

    Ok(())
}
