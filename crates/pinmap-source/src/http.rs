//! REST client for the upstream site directory.
//!
//! `GET {base}/sites?lat=..&lon=..&radius_miles=..` answering
//! `{"sites": [{"id", "coordinate": {"lat", "lon"}, "display_name"}]}`.

use std::time::Duration;

use pinmap_core::{Site, SiteSource, SourceSettings, Viewport};
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::error::SourceError;
use crate::retry::retry_with_backoff;

const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
struct SitesResponse {
    #[serde(default)]
    sites: Vec<Site>,
}

/// Site provider backed by an HTTP API.
///
/// Use [`HttpSiteSource::new`] with the configured URL or
/// [`HttpSiteSource::with_base_url`] to point at a mock server in tests.
pub struct HttpSiteSource {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl HttpSiteSource {
    /// Builds a client for `settings.sites_url`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::NotConfigured`] when no URL is set, or any
    /// error from [`HttpSiteSource::with_base_url`].
    pub fn new(settings: &SourceSettings) -> Result<Self, SourceError> {
        let base_url = settings
            .sites_url
            .as_deref()
            .ok_or(SourceError::NotConfigured)?;
        Self::with_base_url(settings, base_url)
    }

    /// Builds a client for an explicit base URL.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the `reqwest::Client` cannot be
    /// constructed, or [`SourceError::InvalidBaseUrl`] if `base_url` does not
    /// parse.
    pub fn with_base_url(settings: &SourceSettings, base_url: &str) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(settings.user_agent.as_str())
            .build()?;

        // Exactly one trailing slash, so `join("sites")` appends a segment
        // instead of replacing the last one.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| SourceError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            api_key: settings.api_key.clone(),
            max_retries: settings.max_retries,
            backoff_base_ms: settings.backoff_base_ms,
        })
    }

    fn sites_url(&self, region: &Viewport, radius_miles: f64) -> Result<Url, SourceError> {
        let mut url = self
            .base_url
            .join("sites")
            .map_err(|e| SourceError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        url.query_pairs_mut()
            .append_pair("lat", &region.center.lat.to_string())
            .append_pair("lon", &region.center.lon.to_string())
            .append_pair("radius_miles", &radius_miles.to_string());
        Ok(url)
    }

    async fn fetch_once(&self, url: &Url) -> Result<Vec<Site>, SourceError> {
        let mut request = self.client.get(url.clone());
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::UnexpectedStatus {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let body = response.text().await?;
        let envelope: SitesResponse =
            serde_json::from_str(&body).map_err(|e| SourceError::Deserialize {
                context: url.path().to_owned(),
                source: e,
            })?;
        Ok(envelope.sites)
    }
}

impl SiteSource for HttpSiteSource {
    type Error = SourceError;

    async fn fetch_sites(
        &self,
        region: &Viewport,
        radius_miles: f64,
    ) -> Result<Vec<Site>, SourceError> {
        let url = self.sites_url(region, radius_miles)?;
        let sites = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.fetch_once(&url)
        })
        .await?;

        let total = sites.len();
        let sites: Vec<Site> = sites
            .into_iter()
            .filter(|site| {
                let valid = site.coordinate.is_valid();
                if !valid {
                    tracing::warn!(site_id = %site.id, "dropping site with invalid coordinate");
                }
                valid
            })
            .collect();

        tracing::debug!(
            total,
            kept = sites.len(),
            radius_miles,
            "fetched sites from provider"
        );
        Ok(sites)
    }
}

#[cfg(test)]
mod tests {
    use pinmap_core::Coordinate;

    use super::*;

    fn settings() -> SourceSettings {
        SourceSettings {
            sites_url: None,
            api_key: None,
            timeout_secs: 5,
            user_agent: "pinmap-test".to_owned(),
            max_retries: 0,
            backoff_base_ms: 0,
        }
    }

    #[test]
    fn sites_url_carries_center_and_radius() {
        let source =
            HttpSiteSource::with_base_url(&settings(), "https://sites.example.com/api").unwrap();
        let region = Viewport::centered(Coordinate::new(34.5, -81.25), 0.2);
        let url = source.sites_url(&region, 10.0).unwrap();
        assert_eq!(
            url.as_str(),
            "https://sites.example.com/api/sites?lat=34.5&lon=-81.25&radius_miles=10"
        );
    }

    #[test]
    fn trailing_slashes_are_normalised() {
        let source =
            HttpSiteSource::with_base_url(&settings(), "https://sites.example.com/api//").unwrap();
        let region = Viewport::centered(Coordinate::new(1.0, 2.0), 0.2);
        let url = source.sites_url(&region, 2.5).unwrap();
        assert!(
            url.as_str().starts_with("https://sites.example.com/api/sites?"),
            "{url}"
        );
    }

    #[test]
    fn new_requires_configured_url() {
        assert!(matches!(
            HttpSiteSource::new(&settings()),
            Err(SourceError::NotConfigured)
        ));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            HttpSiteSource::with_base_url(&settings(), "not a url"),
            Err(SourceError::InvalidBaseUrl { .. })
        ));
    }
}
