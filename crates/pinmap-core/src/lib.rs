//! Shared model, geometry, and configuration for the pinmap workspace.

pub mod app_config;
pub mod config;
pub mod error;
pub mod geo;
pub mod radius;
pub mod sites;
pub mod source;
pub mod types;

pub use app_config::{AppConfig, ClusterSettings, SourceSettings};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::ConfigError;
pub use geo::{distance_meters, miles_to_meters, EARTH_RADIUS_M, METERS_PER_MILE};
pub use radius::RadiusPolicy;
pub use sites::{load_sites, parse_sites, SitesFile};
pub use source::SiteSource;
pub use types::{Coordinate, Marker, MarkerKind, RenderedAnnotation, Site, Viewport};
