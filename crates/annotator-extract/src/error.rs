//! Error types for source API access.

/// Errors from the source APIs.
///
/// Inside an extraction flow these stop the flow, which hands back what it
/// accumulated before the failure.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request path could not be resolved against the base URL.
    #[error("invalid request url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The request could not be sent or the response body not read.
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The source answered with a non-2xx status.
    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16, body: String },

    /// The response was not the JSON document the flow expected.
    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl TransportError {
    /// The URL of the request that failed.
    pub fn url(&self) -> &str {
        match self {
            Self::InvalidUrl { url, .. }
            | Self::Network { url, .. }
            | Self::Status { url, .. }
            | Self::Decode { url, .. } => url,
        }
    }
}
