//! Viewport controller: owns the visible region, decides when to recluster
//! the sites it already holds, and when to ask the upstream provider for a
//! new set.
//!
//! Reclustering is cheap and happens on every accepted region change. A
//! re-query is only issued for programmatic recentering (first location fix,
//! search submission), a search-radius change, or an explicit "search this
//! area" confirmation after the user dragged the map.
//!
//! The controller is synchronous and performs no I/O. Callers execute the
//! returned [`Effect`]s and feed fetch results back through
//! [`ViewportController::fetch_completed`].

use std::collections::{HashMap, HashSet};

use pinmap_core::{AppConfig, Coordinate, Marker, MarkerKind, RadiusPolicy, Site, Viewport};
use serde::{Deserialize, Serialize};

use crate::cluster::Clusterer;
use crate::reconcile::{AnnotationBaseline, RenderInstructions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    Idle,
    AwaitingLocation,
    Tracking,
}

/// Who moved the map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionOrigin {
    /// Drag or pinch by the user.
    #[default]
    User,
    /// Recentering the application asked for.
    Programmatic,
}

/// A request for the upstream provider, tagged with a sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FetchRequest {
    pub seq: u64,
    pub region: Viewport,
    pub radius_miles: f64,
}

/// User-visible status attached to a frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notice {
    NoResults,
    FetchFailed { message: String },
}

/// One clustering + reconciliation pass, ready for the rendering surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub instructions: RenderInstructions,
    /// Region the surface should move to, when the controller recentered.
    pub region: Option<Viewport>,
    pub cluster_radius_miles: f64,
    /// Show the "search this area" affordance.
    pub search_area_prompt: bool,
    pub notice: Option<Notice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    Render(Frame),
    Fetch(FetchRequest),
    SelectSite { site_id: String },
    ZoomInto(Viewport),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerSettings {
    pub radius: RadiusPolicy,
    pub default_span_degrees: f64,
    pub search_radius_miles: f64,
    pub region_epsilon_degrees: f64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ControllerSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            radius: config.cluster.radius,
            default_span_degrees: config.default_span_degrees,
            search_radius_miles: config.search_radius_miles,
            region_epsilon_degrees: config.region_epsilon_degrees,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViewportController {
    settings: ControllerSettings,
    clusterer: Clusterer,
    state: ControllerState,
    viewport: Option<Viewport>,
    last_applied: Option<Viewport>,
    manually_positioned: bool,
    user_location: Option<Coordinate>,
    pending_region: Option<Viewport>,
    search_radius_miles: f64,
    sites: Vec<Site>,
    markers: HashMap<String, Marker>,
    baseline: AnnotationBaseline,
    latest_seq: u64,
    notice: Option<Notice>,
}

impl ViewportController {
    #[must_use]
    pub fn new(settings: ControllerSettings, clusterer: Clusterer) -> Self {
        Self {
            settings,
            clusterer,
            state: ControllerState::Idle,
            viewport: None,
            last_applied: None,
            manually_positioned: false,
            user_location: None,
            pending_region: None,
            search_radius_miles: settings.search_radius_miles,
            sites: Vec::new(),
            markers: HashMap::new(),
            baseline: AnnotationBaseline::new(),
            latest_seq: 0,
            notice: None,
        }
    }

    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            ControllerSettings::from(config),
            Clusterer::from(&config.cluster),
        )
    }

    #[must_use]
    pub fn state(&self) -> ControllerState {
        self.state
    }

    #[must_use]
    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    #[must_use]
    pub fn pending_region(&self) -> Option<Viewport> {
        self.pending_region
    }

    #[must_use]
    pub fn user_location(&self) -> Option<Coordinate> {
        self.user_location
    }

    #[must_use]
    pub fn search_radius_miles(&self) -> f64 {
        self.search_radius_miles
    }

    #[must_use]
    pub fn cluster_radius_miles(&self) -> f64 {
        self.settings.radius.radius_for(self.viewport.as_ref())
    }

    #[must_use]
    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    #[must_use]
    pub fn baseline(&self) -> &AnnotationBaseline {
        &self.baseline
    }

    /// Sequence number of the most recently issued fetch; `0` before any.
    #[must_use]
    pub fn latest_seq(&self) -> u64 {
        self.latest_seq
    }

    /// The map became visible.
    pub fn appear(&mut self) -> Vec<Effect> {
        if self.state != ControllerState::Idle {
            return Vec::new();
        }
        match self.user_location {
            Some(location) => self.begin_tracking(location),
            None => {
                self.state = ControllerState::AwaitingLocation;
                tracing::debug!("waiting for first location fix");
                Vec::new()
            }
        }
    }

    /// A new user location arrived. Only the first fix after appearing
    /// recenters the map, and only if the user has not positioned it.
    pub fn location_updated(&mut self, location: Coordinate) -> Vec<Effect> {
        self.user_location = Some(location);
        match self.state {
            ControllerState::AwaitingLocation => self.begin_tracking(location),
            ControllerState::Idle | ControllerState::Tracking => Vec::new(),
        }
    }

    /// The surface reports a new visible region.
    ///
    /// Changes within the region epsilon of the last applied region are
    /// ignored. User-driven changes recluster immediately but only raise the
    /// "search this area" prompt; they never query on their own.
    pub fn region_changed(&mut self, region: Viewport, origin: RegionOrigin) -> Vec<Effect> {
        if self.is_jitter(&region) {
            tracing::trace!(?region, "ignoring sub-epsilon region change");
            return Vec::new();
        }

        self.viewport = Some(region);
        self.last_applied = Some(region);
        if origin == RegionOrigin::User {
            self.manually_positioned = true;
            self.pending_region = Some(region);
        }

        vec![Effect::Render(self.render(None))]
    }

    /// The user picked a different search radius. Reclusters and re-queries
    /// the current region.
    pub fn search_radius_changed(&mut self, radius_miles: f64) -> Vec<Effect> {
        self.search_radius_miles = radius_miles;
        let Some(region) = self.viewport else {
            return vec![Effect::Render(self.render(None))];
        };
        self.pending_region = None;
        let fetch = self.issue_fetch(region);
        vec![Effect::Render(self.render(None)), Effect::Fetch(fetch)]
    }

    /// The user confirmed "search this area" for the pending region.
    pub fn confirm_search_area(&mut self) -> Vec<Effect> {
        let Some(region) = self.pending_region.take() else {
            return Vec::new();
        };
        let fetch = self.issue_fetch(region);
        vec![Effect::Render(self.render(None)), Effect::Fetch(fetch)]
    }

    /// A text search resolved to `center`. Recenters and re-queries.
    pub fn submit_search(&mut self, center: Coordinate) -> Vec<Effect> {
        self.pending_region = None;
        self.manually_positioned = true;
        let region = Viewport::centered(center, self.settings.default_span_degrees);
        let pushed = self.push_region(region);
        let fetch = self.issue_fetch(region);
        vec![Effect::Render(self.render(pushed)), Effect::Fetch(fetch)]
    }

    /// Deliver the outcome of fetch `seq`.
    ///
    /// Anything but the latest issued request is dropped without effects.
    /// A failure empties the map and surfaces the message; nothing is retried.
    pub fn fetch_completed(&mut self, seq: u64, result: Result<Vec<Site>, String>) -> Vec<Effect> {
        if seq == 0 || seq != self.latest_seq {
            tracing::debug!(seq, latest = self.latest_seq, "dropping stale site response");
            return Vec::new();
        }

        match result {
            Ok(sites) => {
                let sites = dedup_sites(sites);
                tracing::info!(seq, sites = sites.len(), "site fetch completed");
                self.notice = sites.is_empty().then_some(Notice::NoResults);
                self.sites = sites;
            }
            Err(message) => {
                tracing::warn!(seq, error = %message, "site fetch failed");
                self.sites.clear();
                self.notice = Some(Notice::FetchFailed { message });
            }
        }

        vec![Effect::Render(self.render(None))]
    }

    /// A marker was tapped. Pins select their site; clusters zoom in.
    pub fn marker_tapped(&mut self, marker_id: &str) -> Vec<Effect> {
        let Some(marker) = self.markers.get(marker_id) else {
            tracing::debug!(marker_id, "tap on unknown marker");
            return Vec::new();
        };

        match &marker.kind {
            MarkerKind::Site { site_id } => vec![Effect::SelectSite {
                site_id: site_id.clone(),
            }],
            MarkerKind::Cluster { .. } => {
                let current = self.viewport.unwrap_or_else(|| {
                    Viewport::centered(marker.coordinate, self.settings.default_span_degrees)
                });
                vec![Effect::ZoomInto(current.zoomed_into(marker.coordinate))]
            }
        }
    }

    fn begin_tracking(&mut self, location: Coordinate) -> Vec<Effect> {
        self.state = ControllerState::Tracking;
        tracing::debug!(lat = location.lat, lon = location.lon, "tracking user location");
        if self.manually_positioned {
            return Vec::new();
        }

        let region = Viewport::centered(location, self.settings.default_span_degrees);
        let pushed = self.push_region(region);
        let fetch = self.issue_fetch(region);
        vec![Effect::Render(self.render(pushed)), Effect::Fetch(fetch)]
    }

    fn is_jitter(&self, region: &Viewport) -> bool {
        self.last_applied
            .is_some_and(|last| last.approx_eq(region, self.settings.region_epsilon_degrees))
    }

    /// Apply a programmatic region. Returns it when the surface has to move.
    fn push_region(&mut self, region: Viewport) -> Option<Viewport> {
        if self.is_jitter(&region) {
            return None;
        }
        self.viewport = Some(region);
        self.last_applied = Some(region);
        Some(region)
    }

    fn issue_fetch(&mut self, region: Viewport) -> FetchRequest {
        self.latest_seq += 1;
        let request = FetchRequest {
            seq: self.latest_seq,
            region,
            radius_miles: self.search_radius_miles,
        };
        tracing::info!(
            seq = request.seq,
            lat = region.center.lat,
            lon = region.center.lon,
            radius_miles = request.radius_miles,
            "requesting sites"
        );
        request
    }

    fn render(&mut self, region: Option<Viewport>) -> Frame {
        let radius = self.cluster_radius_miles();
        let markers: Vec<Marker> = self.sites.iter().map(Marker::from_site).collect();
        let clustered = self.clusterer.cluster(&markers, radius);
        let instructions = self.baseline.refresh(&clustered);
        self.markers = clustered.into_iter().map(|m| (m.id.clone(), m)).collect();

        Frame {
            instructions,
            region,
            cluster_radius_miles: radius,
            search_area_prompt: self.pending_region.is_some(),
            notice: self.notice.clone(),
        }
    }
}

/// Keep the first site for each id.
fn dedup_sites(sites: Vec<Site>) -> Vec<Site> {
    let mut seen = HashSet::with_capacity(sites.len());
    sites
        .into_iter()
        .filter(|site| seen.insert(site.id.clone()))
        .collect()
}

#[cfg(test)]
#[path = "viewport_test.rs"]
mod tests;
