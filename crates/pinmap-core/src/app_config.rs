use crate::radius::RadiusPolicy;

/// Clustering knobs: the radius policy plus the individual-marker threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSettings {
    pub radius: RadiusPolicy,
    /// Groups larger than this collapse into one cluster marker.
    /// `0` disables clustering.
    pub max_individual: usize,
    /// Derive cluster ids from membership instead of generating fresh ones.
    pub stable_cluster_ids: bool,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            radius: RadiusPolicy::default(),
            max_individual: 4,
            stable_cluster_ids: false,
        }
    }
}

/// Settings for the HTTP site provider.
#[derive(Clone)]
pub struct SourceSettings {
    pub sites_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            sites_url: None,
            api_key: None,
            timeout_secs: 15,
            user_agent: "pinmap/0.1 (site-browser)".to_string(),
            max_retries: 2,
            backoff_base_ms: 500,
        }
    }
}

impl std::fmt::Debug for SourceSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceSettings")
            .field("sites_url", &self.sites_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_retries", &self.max_retries)
            .field("backoff_base_ms", &self.backoff_base_ms)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub cluster: ClusterSettings,
    /// Span (degrees) used when the map recenters on the user or a search result.
    pub default_span_degrees: f64,
    /// User-facing search radius sent to the site provider.
    pub search_radius_miles: f64,
    /// Region changes smaller than this (degrees) are treated as jitter.
    pub region_epsilon_degrees: f64,
    pub source: SourceSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            cluster: ClusterSettings::default(),
            default_span_degrees: 0.2,
            search_radius_miles: 10.0,
            region_epsilon_degrees: 1e-4,
            source: SourceSettings::default(),
        }
    }
}
