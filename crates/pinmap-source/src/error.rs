use thiserror::Error;

/// Errors returned by the HTTP site provider.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-2xx status.
    #[error("site provider returned HTTP {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// The response body could not be deserialized into a site list.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("no site provider URL configured (set PINMAP_SITES_URL)")]
    NotConfigured,
}
