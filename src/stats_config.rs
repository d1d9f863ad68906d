//! Configuration consumed by the stats fetcher

use crate::repository_exclusion::{parse_boolean, ExclusionRules};

pub const FETCH_MULTI_PAGE_STARS_KEY: &str = "FETCH_MULTI_PAGE_STARS";

/// Exclusion rules plus the multi-page toggle, read together
#[derive(Debug, Clone, Default)]
pub struct StatsConfig {
    pub exclusion: ExclusionRules,
    /// Keep paging through repositories after the first page
    pub multi_page_stars: bool,
}

impl StatsConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            exclusion: ExclusionRules::from_lookup(&lookup),
            multi_page_stars: parse_boolean(lookup(FETCH_MULTI_PAGE_STARS_KEY).as_deref(), false),
        }
    }

    pub fn from_env() -> Self {
        Self {
            exclusion: ExclusionRules::from_env(),
            multi_page_stars: parse_boolean(
                std::env::var(FETCH_MULTI_PAGE_STARS_KEY).ok().as_deref(),
                false,
            ),
        }
    }
}

/// Where a fetcher gets its configuration from
#[derive(Debug, Clone, Default)]
pub enum ConfigSource {
    /// Re-read the process environment at the start of every fetch
    #[default]
    Environment,
    /// Always use this value
    Fixed(StatsConfig),
}

impl ConfigSource {
    /// Produce the configuration for one fetch
    pub fn load(&self) -> StatsConfig {
        match self {
            ConfigSource::Environment => StatsConfig::from_env(),
            ConfigSource::Fixed(config) => config.clone(),
        }
    }
}

/// Settings for the HTTP transport, read once at startup
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub api_url: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            token: None,
            timeout_secs: 10,
        }
    }
}

impl TransportConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            api_url: lookup("GITHUB_API_URL").unwrap_or(defaults.api_url),
            token: lookup("GITHUB_TOKEN").filter(|t| !t.trim().is_empty()),
            timeout_secs: lookup("REQUEST_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}
