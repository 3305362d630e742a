//! Clustering, annotation reconciliation, and viewport control for pinmap.

pub mod cluster;
pub mod reconcile;
pub mod session;
pub mod viewport;

pub use cluster::{cluster, ClusterIdStrategy, Clusterer, DEFAULT_MAX_INDIVIDUAL};
pub use reconcile::{
    reconcile, AnnotationBaseline, ReconcileError, Reconciliation, RenderInstructions,
};
pub use session::{spawn_session, SessionError, SessionEvent, SessionHandle, SessionOutput};
pub use viewport::{
    ControllerSettings, ControllerState, Effect, FetchRequest, Frame, Notice, RegionOrigin,
    ViewportController,
};
