//! Greedy, seed-based marker clustering.
//!
//! Each pass takes the first unassigned marker as a seed and gathers every
//! remaining marker within the radius *of the seed*. Membership is not
//! transitive: two members of one group may be up to twice the radius apart,
//! and a marker just outside the seed's radius stays out even if it is close
//! to another member. Groups larger than `max_individual` collapse into one
//! synthetic cluster marker at the members' mean coordinate; smaller groups
//! are emitted as individual pins, unchanged and in input order.
//!
//! Cost is O(n²) per pass, fine for the low hundreds of sites a viewport holds.

use pinmap_core::{distance_meters, miles_to_meters, ClusterSettings, Coordinate, Marker};
use sha2::{Digest, Sha256};

pub const DEFAULT_MAX_INDIVIDUAL: usize = 4;

/// How synthetic cluster markers are identified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClusterIdStrategy {
    /// New random id on every pass. Clusters never reconcile as unchanged.
    #[default]
    Fresh,
    /// Id derived from the sorted member marker ids, so an identical group
    /// keeps its id across passes.
    Membership,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clusterer {
    max_individual: usize,
    ids: ClusterIdStrategy,
}

impl Default for Clusterer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_INDIVIDUAL)
    }
}

impl From<&ClusterSettings> for Clusterer {
    fn from(settings: &ClusterSettings) -> Self {
        let ids = if settings.stable_cluster_ids {
            ClusterIdStrategy::Membership
        } else {
            ClusterIdStrategy::Fresh
        };
        Self::new(settings.max_individual).with_id_strategy(ids)
    }
}

impl Clusterer {
    #[must_use]
    pub fn new(max_individual: usize) -> Self {
        Self {
            max_individual,
            ids: ClusterIdStrategy::Fresh,
        }
    }

    #[must_use]
    pub fn with_id_strategy(mut self, ids: ClusterIdStrategy) -> Self {
        self.ids = ids;
        self
    }

    #[must_use]
    pub fn max_individual(&self) -> usize {
        self.max_individual
    }

    /// Reduce `markers` to the render set for a clustering radius in miles.
    ///
    /// A non-positive or non-finite radius, or a `max_individual` of zero,
    /// disables clustering and returns every marker unchanged.
    #[must_use]
    pub fn cluster(&self, markers: &[Marker], radius_miles: f64) -> Vec<Marker> {
        if markers.is_empty() {
            return Vec::new();
        }
        if self.max_individual == 0 || !radius_miles.is_finite() || radius_miles <= 0.0 {
            tracing::debug!(
                markers = markers.len(),
                radius_miles,
                max_individual = self.max_individual,
                "clustering disabled for this pass"
            );
            return markers.to_vec();
        }

        let radius_m = miles_to_meters(radius_miles);
        let mut pending: Vec<&Marker> = markers.iter().collect();
        let mut out = Vec::with_capacity(markers.len());
        let mut clusters = 0usize;

        while let Some((&seed, rest)) = pending.split_first() {
            let (near, far): (Vec<&Marker>, Vec<&Marker>) = rest
                .iter()
                .copied()
                .partition(|m| distance_meters(seed.coordinate, m.coordinate) <= radius_m);

            let group_len = near.len() + 1;
            if group_len > self.max_individual {
                let mut group = Vec::with_capacity(group_len);
                group.push(seed);
                group.extend(near);
                out.push(self.cluster_marker(&group));
                clusters += 1;
            } else {
                out.push(seed.clone());
                out.extend(near.into_iter().cloned());
            }

            pending = far;
        }

        tracing::debug!(
            input = markers.len(),
            output = out.len(),
            clusters,
            radius_miles,
            "clustering pass complete"
        );
        out
    }

    fn cluster_marker(&self, group: &[&Marker]) -> Marker {
        let id = match self.ids {
            ClusterIdStrategy::Fresh => format!("cluster-{}", uuid::Uuid::new_v4()),
            ClusterIdStrategy::Membership => membership_id(group),
        };
        Marker::cluster(id, mean_coordinate(group), group.len())
    }
}

/// Cluster `markers` with fresh cluster ids.
#[must_use]
pub fn cluster(markers: &[Marker], radius_miles: f64, max_individual: usize) -> Vec<Marker> {
    Clusterer::new(max_individual).cluster(markers, radius_miles)
}

#[allow(clippy::cast_precision_loss)]
fn mean_coordinate(group: &[&Marker]) -> Coordinate {
    let n = group.len() as f64;
    let (lat_sum, lon_sum) = group.iter().fold((0.0, 0.0), |(lat, lon), m| {
        (lat + m.coordinate.lat, lon + m.coordinate.lon)
    });
    Coordinate::new(lat_sum / n, lon_sum / n)
}

/// SHA-256 over the sorted member ids, NUL-separated. Hex-encoded.
fn membership_id(group: &[&Marker]) -> String {
    let mut ids: Vec<&str> = group.iter().map(|m| m.id.as_str()).collect();
    ids.sort_unstable();
    let digest = Sha256::digest(ids.join("\x00").as_bytes());
    format!("cluster-{digest:x}")
}

#[cfg(test)]
#[path = "cluster_test.rs"]
mod tests;
