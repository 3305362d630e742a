//! Zoom-driven clustering radius.

use crate::types::Viewport;

pub const DEFAULT_FLOOR_MILES: f64 = 0.3;
pub const DEFAULT_SCALE_FACTOR: f64 = 15.0;
pub const DEFAULT_FALLBACK_MILES: f64 = 10.0;

/// Maps the viewport's latitude span to a clustering radius in miles:
/// `max(floor_miles, span_lat * scale_factor)`.
///
/// Wider views cluster more aggressively. `fallback_miles` is used when no
/// viewport is known yet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusPolicy {
    pub floor_miles: f64,
    pub scale_factor: f64,
    pub fallback_miles: f64,
}

impl Default for RadiusPolicy {
    fn default() -> Self {
        Self {
            floor_miles: DEFAULT_FLOOR_MILES,
            scale_factor: DEFAULT_SCALE_FACTOR,
            fallback_miles: DEFAULT_FALLBACK_MILES,
        }
    }
}

impl RadiusPolicy {
    #[must_use]
    pub fn radius_for_span(&self, span_lat: f64) -> f64 {
        self.floor_miles.max(span_lat * self.scale_factor)
    }

    #[must_use]
    pub fn radius_for(&self, viewport: Option<&Viewport>) -> f64 {
        viewport.map_or(self.fallback_miles, |v| self.radius_for_span(v.span_lat))
    }
}
