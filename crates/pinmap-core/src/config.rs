use crate::app_config::{AppConfig, ClusterSettings, SourceSettings};
use crate::radius::RadiusPolicy;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but malformed.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but malformed.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Every setting has a default; only malformed values are rejected. Values
/// that are well-formed but degenerate (negative radius floor, zero
/// `PINMAP_MAX_INDIVIDUAL`) are accepted and disable clustering downstream.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_f64 = |var: &str, default: &str| -> Result<f64, ConfigError> {
        let raw = or_default(var, default);
        let value = raw
            .trim()
            .parse::<f64>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(invalid(var, format!("'{raw}' is not a finite number")))
        }
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        let raw = or_default(var, default);
        parse_flag(&raw).ok_or_else(|| invalid(var, format!("'{raw}' is not a boolean")))
    };

    let log_level = or_default("PINMAP_LOG_LEVEL", "info");

    let radius = RadiusPolicy {
        floor_miles: parse_f64("PINMAP_CLUSTER_FLOOR_MILES", "0.3")?,
        scale_factor: parse_f64("PINMAP_CLUSTER_SCALE_FACTOR", "15")?,
        fallback_miles: parse_f64("PINMAP_CLUSTER_FALLBACK_MILES", "10")?,
    };

    let max_individual_raw = or_default("PINMAP_MAX_INDIVIDUAL", "4");
    let max_individual = max_individual_raw
        .trim()
        .parse::<i64>()
        .map_err(|e| invalid("PINMAP_MAX_INDIVIDUAL", e.to_string()))?;
    // Non-positive thresholds mean "never cluster".
    let max_individual = usize::try_from(max_individual).unwrap_or(0);

    let stable_cluster_ids = parse_bool("PINMAP_STABLE_CLUSTER_IDS", "false")?;

    let default_span_degrees = parse_f64("PINMAP_DEFAULT_SPAN_DEGREES", "0.2")?;
    let search_radius_miles = parse_f64("PINMAP_SEARCH_RADIUS_MILES", "10")?;
    let region_epsilon_degrees = parse_f64("PINMAP_REGION_EPSILON_DEGREES", "0.0001")?;

    let source = SourceSettings {
        sites_url: lookup("PINMAP_SITES_URL")
            .ok()
            .filter(|s| !s.trim().is_empty()),
        api_key: lookup("PINMAP_SOURCE_API_KEY")
            .ok()
            .filter(|s| !s.trim().is_empty()),
        timeout_secs: parse_u64("PINMAP_SOURCE_TIMEOUT_SECS", "15")?,
        user_agent: or_default("PINMAP_SOURCE_USER_AGENT", "pinmap/0.1 (site-browser)"),
        max_retries: parse_u32("PINMAP_SOURCE_MAX_RETRIES", "2")?,
        backoff_base_ms: parse_u64("PINMAP_SOURCE_BACKOFF_BASE_MS", "500")?,
    };

    Ok(AppConfig {
        log_level,
        cluster: ClusterSettings {
            radius,
            max_individual,
            stable_cluster_ids,
        },
        default_span_degrees,
        search_radius_miles,
        region_epsilon_degrees,
        source,
    })
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
