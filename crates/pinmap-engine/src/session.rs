//! A running map session: one tokio task owns the [`ViewportController`]
//! (and with it the annotation baseline) and executes its effects.
//!
//! Region and location updates travel over `watch` channels, so a burst of
//! pan events collapses to the latest value. Discrete user actions travel
//! over an `mpsc` channel and are handled in order. Site fetches run on their
//! own tasks; issuing a new fetch aborts the previous one, and any result
//! that still slips through is dropped by the controller's sequence check.
//! A provider that panics is reported to the controller as a failed fetch.

use std::sync::Arc;

use pinmap_core::{Coordinate, Site, SiteSource, Viewport};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinError, JoinHandle};

use crate::viewport::{Effect, FetchRequest, Frame, RegionOrigin, ViewportController};

const EVENT_BUFFER: usize = 64;
const OUTPUT_BUFFER: usize = 64;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("map session is no longer running")]
    Closed,

    #[error("map session task failed: {0}")]
    Join(#[from] JoinError),
}

/// Discrete user actions, applied in the order they were sent.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Appear,
    SearchRadiusChanged(f64),
    ConfirmSearchArea,
    SubmitSearch(Coordinate),
    MarkerTapped(String),
}

/// What the rendering surface receives from a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "output", rename_all = "snake_case")]
pub enum SessionOutput {
    Frame(Frame),
    SiteSelected { site_id: String },
    ZoomInto(Viewport),
}

pub struct SessionHandle {
    regions: watch::Sender<Option<(Viewport, RegionOrigin)>>,
    locations: watch::Sender<Option<Coordinate>>,
    events: mpsc::Sender<SessionEvent>,
    task: JoinHandle<ViewportController>,
}

impl SessionHandle {
    /// Report the visible region. Unprocessed earlier regions are replaced.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the session task has exited.
    pub fn region_changed(
        &self,
        region: Viewport,
        origin: RegionOrigin,
    ) -> Result<(), SessionError> {
        self.regions
            .send(Some((region, origin)))
            .map_err(|_| SessionError::Closed)
    }

    /// Report a user location fix. Unprocessed earlier fixes are replaced.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the session task has exited.
    pub fn location_updated(&self, location: Coordinate) -> Result<(), SessionError> {
        self.locations
            .send(Some(location))
            .map_err(|_| SessionError::Closed)
    }

    /// Queue a discrete user action.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the session task has exited.
    pub async fn send(&self, event: SessionEvent) -> Result<(), SessionError> {
        self.events
            .send(event)
            .await
            .map_err(|_| SessionError::Closed)
    }

    /// Close all inputs, let the in-flight fetch (if any) land, and hand the
    /// controller back.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Join`] if the session task panicked.
    pub async fn finish(self) -> Result<ViewportController, SessionError> {
        let Self {
            regions,
            locations,
            events,
            task,
        } = self;
        drop(regions);
        drop(locations);
        drop(events);
        Ok(task.await?)
    }
}

/// Start a session driving `controller` against `source`.
///
/// Must be called from within a tokio runtime.
pub fn spawn_session<S: SiteSource>(
    controller: ViewportController,
    source: S,
) -> (SessionHandle, mpsc::Receiver<SessionOutput>) {
    let (regions_tx, regions_rx) = watch::channel(None);
    let (locations_tx, locations_rx) = watch::channel(None);
    let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
    let (output_tx, output_rx) = mpsc::channel(OUTPUT_BUFFER);

    let session = Session {
        controller,
        source: Arc::new(source),
        outputs: output_tx,
        in_flight: None,
    };
    let task = tokio::spawn(session.run(regions_rx, locations_rx, events_rx));

    let handle = SessionHandle {
        regions: regions_tx,
        locations: locations_tx,
        events: events_tx,
        task,
    };
    (handle, output_rx)
}

struct FetchOutcome {
    seq: u64,
    result: Result<Vec<Site>, String>,
}

struct Session<S> {
    controller: ViewportController,
    source: Arc<S>,
    outputs: mpsc::Sender<SessionOutput>,
    /// Sequence number and provider task of the fetch still outstanding.
    in_flight: Option<(u64, AbortHandle)>,
}

impl<S: SiteSource> Session<S> {
    async fn run(
        mut self,
        mut regions: watch::Receiver<Option<(Viewport, RegionOrigin)>>,
        mut locations: watch::Receiver<Option<Coordinate>>,
        mut events: mpsc::Receiver<SessionEvent>,
    ) -> ViewportController {
        let (results_tx, mut results) = mpsc::channel::<FetchOutcome>(EVENT_BUFFER);
        let mut regions_open = true;
        let mut locations_open = true;
        let mut events_open = true;

        tracing::debug!("map session started");

        loop {
            let effects = tokio::select! {
                biased;

                changed = regions.changed(), if regions_open => {
                    if changed.is_err() {
                        regions_open = false;
                        continue;
                    }
                    let latest = *regions.borrow_and_update();
                    match latest {
                        Some((region, origin)) => self.controller.region_changed(region, origin),
                        None => continue,
                    }
                }

                changed = locations.changed(), if locations_open => {
                    if changed.is_err() {
                        locations_open = false;
                        continue;
                    }
                    let latest = *locations.borrow_and_update();
                    match latest {
                        Some(location) => self.controller.location_updated(location),
                        None => continue,
                    }
                }

                event = events.recv(), if events_open => {
                    let Some(event) = event else {
                        events_open = false;
                        continue;
                    };
                    self.dispatch(event)
                }

                Some(outcome) = results.recv(), if self.in_flight.is_some() => {
                    if self.in_flight.as_ref().is_some_and(|(seq, _)| *seq == outcome.seq) {
                        self.in_flight = None;
                    }
                    self.controller.fetch_completed(outcome.seq, outcome.result)
                }

                else => break,
            };

            for effect in effects {
                self.execute(effect, &results_tx).await;
            }
        }

        tracing::debug!("map session finished");
        self.controller
    }

    fn dispatch(&mut self, event: SessionEvent) -> Vec<Effect> {
        match event {
            SessionEvent::Appear => self.controller.appear(),
            SessionEvent::SearchRadiusChanged(miles) => {
                self.controller.search_radius_changed(miles)
            }
            SessionEvent::ConfirmSearchArea => self.controller.confirm_search_area(),
            SessionEvent::SubmitSearch(center) => self.controller.submit_search(center),
            SessionEvent::MarkerTapped(id) => self.controller.marker_tapped(&id),
        }
    }

    async fn execute(&mut self, effect: Effect, results: &mpsc::Sender<FetchOutcome>) {
        let output = match effect {
            Effect::Render(frame) => SessionOutput::Frame(frame),
            Effect::SelectSite { site_id } => SessionOutput::SiteSelected { site_id },
            Effect::ZoomInto(region) => SessionOutput::ZoomInto(region),
            Effect::Fetch(request) => {
                self.start_fetch(request, results.clone());
                return;
            }
        };

        if self.outputs.send(output).await.is_err() {
            tracing::debug!("session output receiver dropped");
        }
    }

    fn start_fetch(&mut self, request: FetchRequest, results: mpsc::Sender<FetchOutcome>) {
        if let Some((superseded, provider)) = self.in_flight.take() {
            tracing::debug!(superseded, seq = request.seq, "aborting superseded site fetch");
            provider.abort();
        }

        let seq = request.seq;
        let source = Arc::clone(&self.source);
        let provider = tokio::spawn(async move {
            source
                .fetch_sites(&request.region, request.radius_miles)
                .await
                .map_err(|e| e.to_string())
        });
        self.in_flight = Some((seq, provider.abort_handle()));

        tokio::spawn(async move {
            let result = match provider.await {
                Ok(result) => result,
                Err(e) if e.is_cancelled() => {
                    tracing::debug!(seq, "site fetch cancelled");
                    return;
                }
                Err(e) => {
                    tracing::error!(seq, error = %e, "site provider panicked");
                    Err(format!("site provider failed: {e}"))
                }
            };
            if results.send(FetchOutcome { seq, result }).await.is_err() {
                tracing::debug!(seq, "session closed before fetch completed");
            }
        });
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
