//! `pinmap replay`: feed a scripted gesture sequence through a map session
//! and print every session output as a JSON line.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use pinmap_core::{AppConfig, Coordinate, Marker, SiteSource, Viewport};
use pinmap_engine::{
    spawn_session, RegionOrigin, RenderInstructions, SessionEvent, SessionHandle, SessionOutput,
    ViewportController,
};
use pinmap_source::{HttpSiteSource, StaticSiteSource};
use serde::Deserialize;
use tokio::sync::mpsc;

#[derive(Debug)]
pub(crate) enum SourceChoice {
    File(PathBuf),
    Url(String),
    Configured,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReplayScript {
    pub steps: Vec<Step>,
}

/// One scripted gesture.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub(crate) enum Step {
    Appear,
    Location(Coordinate),
    Region {
        center: Coordinate,
        span_lat: f64,
        span_lon: f64,
        #[serde(default)]
        origin: RegionOrigin,
    },
    SearchRadius {
        miles: f64,
    },
    ConfirmSearchArea,
    SubmitSearch(Coordinate),
    Tap {
        marker: String,
    },
    /// Tap the first cluster currently on the map, by id order.
    TapCluster,
    Wait {
        ms: u64,
    },
}

pub(crate) fn parse_script(content: &str) -> anyhow::Result<ReplayScript> {
    serde_yaml::from_str(content).context("parsing replay script")
}

/// Local mirror of what a rendering surface would show.
#[derive(Debug, Default)]
pub(crate) struct Surface {
    markers: BTreeMap<String, Marker>,
}

impl Surface {
    pub fn apply(&mut self, instructions: &RenderInstructions) {
        for id in &instructions.to_remove {
            self.markers.remove(id);
        }
        for marker in &instructions.to_add {
            self.markers.insert(marker.id.clone(), marker.clone());
        }
    }

    pub fn first_cluster(&self) -> Option<&str> {
        self.markers
            .values()
            .find(|m| m.is_cluster())
            .map(|m| m.id.as_str())
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }
}

pub(crate) async fn run_replay(
    config: &AppConfig,
    script_path: &Path,
    source: SourceChoice,
    settle_ms: u64,
) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(script_path)
        .with_context(|| format!("reading replay script {}", script_path.display()))?;
    let script = parse_script(&content)?;
    let controller = ViewportController::from_config(config);
    let settle = Duration::from_millis(settle_ms);

    match source {
        SourceChoice::File(path) => {
            let file = pinmap_core::load_sites(&path)
                .with_context(|| format!("loading sites from {}", path.display()))?;
            drive(controller, StaticSiteSource::from(file), &script.steps, settle).await
        }
        SourceChoice::Url(url) => {
            let source = HttpSiteSource::with_base_url(&config.source, &url)?;
            drive(controller, source, &script.steps, settle).await
        }
        SourceChoice::Configured => {
            let source = HttpSiteSource::new(&config.source)?;
            drive(controller, source, &script.steps, settle).await
        }
    }
}

async fn drive<S: SiteSource>(
    controller: ViewportController,
    source: S,
    steps: &[Step],
    settle: Duration,
) -> anyhow::Result<()> {
    let (handle, mut outputs) = spawn_session(controller, source);
    let mut surface = Surface::default();

    for (index, step) in steps.iter().enumerate() {
        tracing::debug!(index, ?step, "replaying step");
        if let Step::Wait { ms } = step {
            drain(&mut outputs, &mut surface, Duration::from_millis(*ms)).await?;
            continue;
        }
        send_step(&handle, step, &surface).await?;
        drain(&mut outputs, &mut surface, settle).await?;
    }

    let controller = handle.finish().await?;
    while let Some(output) = outputs.recv().await {
        emit(&output, &mut surface)?;
    }

    tracing::info!(
        steps = steps.len(),
        fetches = controller.latest_seq(),
        sites = controller.sites().len(),
        markers = surface.marker_count(),
        "replay finished"
    );
    Ok(())
}

async fn send_step(handle: &SessionHandle, step: &Step, surface: &Surface) -> anyhow::Result<()> {
    match step {
        Step::Appear => handle.send(SessionEvent::Appear).await?,
        Step::Location(location) => handle.location_updated(*location)?,
        Step::Region {
            center,
            span_lat,
            span_lon,
            origin,
        } => handle.region_changed(Viewport::new(*center, *span_lat, *span_lon), *origin)?,
        Step::SearchRadius { miles } => {
            handle.send(SessionEvent::SearchRadiusChanged(*miles)).await?;
        }
        Step::ConfirmSearchArea => handle.send(SessionEvent::ConfirmSearchArea).await?,
        Step::SubmitSearch(center) => handle.send(SessionEvent::SubmitSearch(*center)).await?,
        Step::Tap { marker } => {
            handle
                .send(SessionEvent::MarkerTapped(marker.clone()))
                .await?;
        }
        Step::TapCluster => match surface.first_cluster() {
            Some(id) => {
                handle
                    .send(SessionEvent::MarkerTapped(id.to_owned()))
                    .await?;
            }
            None => tracing::warn!("tap_cluster step skipped: no cluster on the map"),
        },
        Step::Wait { .. } => {}
    }
    Ok(())
}

/// Print outputs until none arrives for `settle`.
async fn drain(
    outputs: &mut mpsc::Receiver<SessionOutput>,
    surface: &mut Surface,
    settle: Duration,
) -> anyhow::Result<()> {
    while let Ok(Some(output)) = tokio::time::timeout(settle, outputs.recv()).await {
        emit(&output, surface)?;
    }
    Ok(())
}

fn emit(output: &SessionOutput, surface: &mut Surface) -> anyhow::Result<()> {
    if let SessionOutput::Frame(frame) = output {
        surface.apply(&frame.instructions);
    }
    println!("{}", serde_json::to_string(output)?);
    Ok(())
}
