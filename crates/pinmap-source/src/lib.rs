//! Site providers for pinmap: a REST client and an in-memory list.

pub mod error;
pub mod http;
pub(crate) mod retry;
pub mod static_source;

pub use error::SourceError;
pub use http::HttpSiteSource;
pub use static_source::StaticSiteSource;
