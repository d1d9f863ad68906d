use crate::stats_config::{ConfigSource, StatsConfig, TransportConfig};
use std::collections::HashMap;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[test]
fn test_stats_config_defaults() {
    let config = StatsConfig::from_lookup(lookup_from(&[]));
    assert!(!config.multi_page_stars);
    assert!(config.exclusion.exact_names.is_empty());
    assert!(config.exclusion.patterns.is_empty());
}

#[test]
fn test_stats_config_reads_all_keys() {
    let config = StatsConfig::from_lookup(lookup_from(&[
        ("FETCH_MULTI_PAGE_STARS", "true"),
        ("EXCLUDE_PRIVATE", "TRUE"),
        ("EXCLUDE_REPO", "'a','b'"),
        ("EXCLUDE_REPO_REGEX", "'/^c/','[bad'"),
    ]));

    assert!(config.multi_page_stars);
    assert!(config.exclusion.flags.private);
    assert!(!config.exclusion.flags.fork);
    assert_eq!(config.exclusion.exact_names.len(), 2);
    assert_eq!(config.exclusion.patterns.len(), 1);
}

#[test]
fn test_fixed_source_returns_its_value() {
    let config = StatsConfig::from_lookup(lookup_from(&[("FETCH_MULTI_PAGE_STARS", "true")]));
    let source = ConfigSource::Fixed(config);
    assert!(source.load().multi_page_stars);
    assert!(source.load().multi_page_stars);
}

#[test]
fn test_transport_config_defaults() {
    let config = TransportConfig::from_lookup(lookup_from(&[]));
    assert_eq!(config.api_url, "https://api.github.com");
    assert_eq!(config.timeout_secs, 10);
    assert!(config.token.is_none());
}

#[test]
fn test_transport_config_overrides() {
    let config = TransportConfig::from_lookup(lookup_from(&[
        ("GITHUB_API_URL", "http://localhost:1234"),
        ("GITHUB_TOKEN", "ghp_test"),
        ("REQUEST_TIMEOUT_SECS", "not-a-number"),
    ]));
    assert_eq!(config.api_url, "http://localhost:1234");
    assert_eq!(config.token.as_deref(), Some("ghp_test"));
    assert_eq!(config.timeout_secs, 10);
}

#[test]
fn test_blank_token_is_ignored() {
    let config = TransportConfig::from_lookup(lookup_from(&[("GITHUB_TOKEN", "  ")]));
    assert!(config.token.is_none());
}
