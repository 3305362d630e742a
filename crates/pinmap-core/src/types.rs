//! Value types shared by the clustering engine, the reconciler, and the
//! viewport controller.

use serde::{Deserialize, Serialize};

/// A WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// `true` when both components are finite and inside the WGS84 ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// A point of interest as supplied by the upstream site provider.
///
/// Read-only input: nothing in the engine mutates a `Site`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: String,
    pub coordinate: Coordinate,
    #[serde(alias = "displayName")]
    pub display_name: String,
}

/// What a [`Marker`] stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarkerKind {
    /// An individual pin for one upstream site.
    Site { site_id: String },
    /// A synthetic marker standing in for `size >= 2` nearby markers.
    Cluster { size: usize },
}

/// One renderable point produced by a clustering pass.
///
/// Markers are created fresh on every pass and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: String,
    pub coordinate: Coordinate,
    pub label: Option<String>,
    #[serde(flatten)]
    pub kind: MarkerKind,
}

impl Marker {
    /// Individual pin for `site`. The marker id is the site id, so pins keep
    /// their identity across passes.
    #[must_use]
    pub fn from_site(site: &Site) -> Self {
        Self {
            id: site.id.clone(),
            coordinate: site.coordinate,
            label: Some(site.display_name.clone()),
            kind: MarkerKind::Site {
                site_id: site.id.clone(),
            },
        }
    }

    /// Synthetic cluster marker labelled `"{size} sites nearby"`.
    #[must_use]
    pub fn cluster(id: String, coordinate: Coordinate, size: usize) -> Self {
        Self {
            id,
            coordinate,
            label: Some(format!("{size} sites nearby")),
            kind: MarkerKind::Cluster { size },
        }
    }

    #[must_use]
    pub fn is_cluster(&self) -> bool {
        matches!(self.kind, MarkerKind::Cluster { .. })
    }

    #[must_use]
    pub fn cluster_size(&self) -> Option<usize> {
        match self.kind {
            MarkerKind::Cluster { size } => Some(size),
            MarkerKind::Site { .. } => None,
        }
    }

    #[must_use]
    pub fn source_site_id(&self) -> Option<&str> {
        match &self.kind {
            MarkerKind::Site { site_id } => Some(site_id.as_str()),
            MarkerKind::Cluster { .. } => None,
        }
    }
}

/// The visible map region: a center plus angular span in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: Coordinate,
    pub span_lat: f64,
    pub span_lon: f64,
}

impl Viewport {
    #[must_use]
    pub const fn new(center: Coordinate, span_lat: f64, span_lon: f64) -> Self {
        Self {
            center,
            span_lat,
            span_lon,
        }
    }

    /// Square viewport centered on `center`.
    #[must_use]
    pub const fn centered(center: Coordinate, span: f64) -> Self {
        Self::new(center, span, span)
    }

    /// `true` when center and both spans are each within `epsilon` degrees.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        (self.center.lat - other.center.lat).abs() <= epsilon
            && (self.center.lon - other.center.lon).abs() <= epsilon
            && (self.span_lat - other.span_lat).abs() <= epsilon
            && (self.span_lon - other.span_lon).abs() <= epsilon
    }

    /// Region recentered on `center` with both spans halved.
    #[must_use]
    pub fn zoomed_into(&self, center: Coordinate) -> Self {
        Self::new(center, self.span_lat / 2.0, self.span_lon / 2.0)
    }
}

/// What the rendering surface currently shows for one marker id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedAnnotation {
    pub id: String,
    pub coordinate: Coordinate,
    pub label: Option<String>,
}

impl From<&Marker> for RenderedAnnotation {
    fn from(marker: &Marker) -> Self {
        Self {
            id: marker.id.clone(),
            coordinate: marker.coordinate,
            label: marker.label.clone(),
        }
    }
}
