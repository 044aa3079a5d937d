use thiserror::Error;

/// Errors from the dashboard API.
#[derive(Debug, Error)]
pub enum PostError {
    /// The configured dashboard URL cannot be used.
    #[error("invalid dashboard URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The request could not be sent or the response could not be read.
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The dashboard answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// The token response did not carry a token.
    #[error("no security token in response from {url}")]
    MissingToken { url: String },
}
