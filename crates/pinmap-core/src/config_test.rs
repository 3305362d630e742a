use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn build_app_config_defaults_with_empty_env() {
    let map: HashMap<&str, &str> = HashMap::new();
    let cfg = build_app_config(lookup_from_map(&map)).expect("defaults should load");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.cluster.radius, RadiusPolicy::default());
    assert_eq!(cfg.cluster.max_individual, 4);
    assert!(!cfg.cluster.stable_cluster_ids);
    assert!((cfg.default_span_degrees - 0.2).abs() < f64::EPSILON);
    assert!((cfg.search_radius_miles - 10.0).abs() < f64::EPSILON);
    assert!((cfg.region_epsilon_degrees - 1e-4).abs() < f64::EPSILON);
    assert!(cfg.source.sites_url.is_none());
    assert!(cfg.source.api_key.is_none());
    assert_eq!(cfg.source.timeout_secs, 15);
    assert_eq!(cfg.source.user_agent, "pinmap/0.1 (site-browser)");
    assert_eq!(cfg.source.max_retries, 2);
    assert_eq!(cfg.source.backoff_base_ms, 500);
}

#[test]
fn radius_policy_overrides() {
    let mut map = HashMap::new();
    map.insert("PINMAP_CLUSTER_FLOOR_MILES", "1.5");
    map.insert("PINMAP_CLUSTER_SCALE_FACTOR", "30");
    map.insert("PINMAP_CLUSTER_FALLBACK_MILES", "25");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert!((cfg.cluster.radius.floor_miles - 1.5).abs() < f64::EPSILON);
    assert!((cfg.cluster.radius.scale_factor - 30.0).abs() < f64::EPSILON);
    assert!((cfg.cluster.radius.fallback_miles - 25.0).abs() < f64::EPSILON);
}

#[test]
fn radius_floor_invalid() {
    let mut map = HashMap::new();
    map.insert("PINMAP_CLUSTER_FLOOR_MILES", "wide");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(
            result,
            Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "PINMAP_CLUSTER_FLOOR_MILES"
        ),
        "expected InvalidEnvVar(PINMAP_CLUSTER_FLOOR_MILES), got: {result:?}"
    );
}

#[test]
fn radius_scale_factor_rejects_non_finite() {
    let mut map = HashMap::new();
    map.insert("PINMAP_CLUSTER_SCALE_FACTOR", "inf");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(
            result,
            Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "PINMAP_CLUSTER_SCALE_FACTOR"
        ),
        "expected InvalidEnvVar(PINMAP_CLUSTER_SCALE_FACTOR), got: {result:?}"
    );
}

#[test]
fn negative_radius_floor_is_accepted() {
    let mut map = HashMap::new();
    map.insert("PINMAP_CLUSTER_FLOOR_MILES", "-2");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert!((cfg.cluster.radius.floor_miles + 2.0).abs() < f64::EPSILON);
}

#[test]
fn max_individual_override() {
    let mut map = HashMap::new();
    map.insert("PINMAP_MAX_INDIVIDUAL", "9");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.cluster.max_individual, 9);
}

#[test]
fn max_individual_negative_disables_clustering() {
    let mut map = HashMap::new();
    map.insert("PINMAP_MAX_INDIVIDUAL", "-3");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.cluster.max_individual, 0);
}

#[test]
fn max_individual_invalid() {
    let mut map = HashMap::new();
    map.insert("PINMAP_MAX_INDIVIDUAL", "four");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(
            result,
            Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "PINMAP_MAX_INDIVIDUAL"
        ),
        "expected InvalidEnvVar(PINMAP_MAX_INDIVIDUAL), got: {result:?}"
    );
}

#[test]
fn stable_cluster_ids_accepts_common_flags() {
    for raw in ["true", "TRUE", "1", "yes", "on"] {
        let mut map = HashMap::new();
        map.insert("PINMAP_STABLE_CLUSTER_IDS", raw);
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert!(cfg.cluster.stable_cluster_ids, "flag '{raw}' should enable");
    }
}

#[test]
fn stable_cluster_ids_invalid() {
    let mut map = HashMap::new();
    map.insert("PINMAP_STABLE_CLUSTER_IDS", "maybe");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(
            result,
            Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "PINMAP_STABLE_CLUSTER_IDS"
        ),
        "expected InvalidEnvVar(PINMAP_STABLE_CLUSTER_IDS), got: {result:?}"
    );
}

#[test]
fn blank_sites_url_is_treated_as_unset() {
    let mut map = HashMap::new();
    map.insert("PINMAP_SITES_URL", "   ");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert!(cfg.source.sites_url.is_none());
}

#[test]
fn source_settings_overrides() {
    let mut map = HashMap::new();
    map.insert("PINMAP_SITES_URL", "https://sites.example.com/api");
    map.insert("PINMAP_SOURCE_API_KEY", "secret-key");
    map.insert("PINMAP_SOURCE_TIMEOUT_SECS", "5");
    map.insert("PINMAP_SOURCE_MAX_RETRIES", "0");
    map.insert("PINMAP_SOURCE_BACKOFF_BASE_MS", "100");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(
        cfg.source.sites_url.as_deref(),
        Some("https://sites.example.com/api")
    );
    assert_eq!(cfg.source.api_key.as_deref(), Some("secret-key"));
    assert_eq!(cfg.source.timeout_secs, 5);
    assert_eq!(cfg.source.max_retries, 0);
    assert_eq!(cfg.source.backoff_base_ms, 100);
}

#[test]
fn source_timeout_invalid() {
    let mut map = HashMap::new();
    map.insert("PINMAP_SOURCE_TIMEOUT_SECS", "-1");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(
            result,
            Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "PINMAP_SOURCE_TIMEOUT_SECS"
        ),
        "expected InvalidEnvVar(PINMAP_SOURCE_TIMEOUT_SECS), got: {result:?}"
    );
}

#[test]
fn debug_output_redacts_api_key() {
    let mut map = HashMap::new();
    map.insert("PINMAP_SOURCE_API_KEY", "super-secret");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    let rendered = format!("{cfg:?}");
    assert!(!rendered.contains("super-secret"));
    assert!(rendered.contains("[redacted]"));
}

#[test]
fn empty_env_matches_default_config() {
    let map: HashMap<&str, &str> = HashMap::new();
    let cfg = build_app_config(lookup_from_map(&map)).expect("defaults should load");
    let defaults = AppConfig::default();
    assert_eq!(cfg.log_level, defaults.log_level);
    assert_eq!(cfg.cluster, defaults.cluster);
    assert!((cfg.default_span_degrees - defaults.default_span_degrees).abs() < f64::EPSILON);
    assert!((cfg.search_radius_miles - defaults.search_radius_miles).abs() < f64::EPSILON);
    assert!((cfg.region_epsilon_degrees - defaults.region_epsilon_degrees).abs() < f64::EPSILON);
    assert_eq!(cfg.source.timeout_secs, defaults.source.timeout_secs);
    assert_eq!(cfg.source.user_agent, defaults.source.user_agent);
    assert_eq!(cfg.source.max_retries, defaults.source.max_retries);
    assert_eq!(cfg.source.backoff_base_ms, defaults.source.backoff_base_ms);
}
