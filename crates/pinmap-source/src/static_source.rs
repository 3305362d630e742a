use std::convert::Infallible;

use pinmap_core::{distance_meters, miles_to_meters, Site, SiteSource, SitesFile, Viewport};

/// In-memory site provider, typically loaded from a sites file.
///
/// Returns the sites within the requested radius of the viewport center.
/// A non-positive or non-finite radius returns every site.
#[derive(Debug, Clone, Default)]
pub struct StaticSiteSource {
    sites: Vec<Site>,
}

impl StaticSiteSource {
    #[must_use]
    pub fn new(sites: Vec<Site>) -> Self {
        Self { sites }
    }

    #[must_use]
    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    #[must_use]
    pub fn within(&self, region: &Viewport, radius_miles: f64) -> Vec<Site> {
        if !radius_miles.is_finite() || radius_miles <= 0.0 {
            return self.sites.clone();
        }
        let radius_m = miles_to_meters(radius_miles);
        self.sites
            .iter()
            .filter(|site| distance_meters(region.center, site.coordinate) <= radius_m)
            .cloned()
            .collect()
    }
}

impl From<SitesFile> for StaticSiteSource {
    fn from(file: SitesFile) -> Self {
        Self::new(file.sites)
    }
}

impl SiteSource for StaticSiteSource {
    type Error = Infallible;

    async fn fetch_sites(
        &self,
        region: &Viewport,
        radius_miles: f64,
    ) -> Result<Vec<Site>, Infallible> {
        let sites = self.within(region, radius_miles);
        tracing::debug!(
            total = self.sites.len(),
            matched = sites.len(),
            radius_miles,
            "filtered static sites"
        );
        Ok(sites)
    }
}
