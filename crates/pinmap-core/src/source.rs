use std::future::Future;

use crate::types::{Site, Viewport};

/// Upstream provider of sites for a map region.
///
/// Implementations may return an empty list and may fail. No ordering is
/// assumed by the clustering engine. Fetches run off the thread that owns
/// the rendering surface, so the returned future must be `Send`.
pub trait SiteSource: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    fn fetch_sites(
        &self,
        region: &Viewport,
        radius_miles: f64,
    ) -> impl Future<Output = Result<Vec<Site>, Self::Error>> + Send;
}
