//! `pinmap cluster`: one clustering pass over a sites file.

use std::path::PathBuf;

use anyhow::Context;
use pinmap_core::{AppConfig, Coordinate, Marker, Viewport};
use pinmap_engine::Clusterer;
use serde::Serialize;

#[derive(Debug)]
pub(crate) struct ClusterArgs {
    pub sites: PathBuf,
    pub center: Option<(f64, f64)>,
    pub span_lat: Option<f64>,
    pub span_lon: Option<f64>,
    pub max_individual: Option<usize>,
    pub stable_ids: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ClusterReport {
    pub viewport: Option<Viewport>,
    pub radius_miles: f64,
    pub site_count: usize,
    pub markers: Vec<Marker>,
}

pub(crate) fn run_cluster(config: &AppConfig, args: &ClusterArgs) -> anyhow::Result<()> {
    let file = pinmap_core::load_sites(&args.sites)
        .with_context(|| format!("loading sites from {}", args.sites.display()))?;
    let report = cluster_sites(config, args, &file.sites);

    tracing::info!(
        sites = report.site_count,
        markers = report.markers.len(),
        radius_miles = report.radius_miles,
        "clustered sites"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub(crate) fn cluster_sites(
    config: &AppConfig,
    args: &ClusterArgs,
    sites: &[pinmap_core::Site],
) -> ClusterReport {
    let viewport = args.center.map(|(lat, lon)| {
        let span_lat = args.span_lat.unwrap_or(config.default_span_degrees);
        let span_lon = args.span_lon.unwrap_or(span_lat);
        Viewport::new(Coordinate::new(lat, lon), span_lat, span_lon)
    });
    let radius_miles = config.cluster.radius.radius_for(viewport.as_ref());

    let mut settings = config.cluster.clone();
    if let Some(max_individual) = args.max_individual {
        settings.max_individual = max_individual;
    }
    settings.stable_cluster_ids |= args.stable_ids;
    let clusterer = Clusterer::from(&settings);

    let markers: Vec<Marker> = sites.iter().map(Marker::from_site).collect();
    ClusterReport {
        viewport,
        radius_miles,
        site_count: sites.len(),
        markers: clusterer.cluster(&markers, radius_miles),
    }
}
