//! The authenticated transport the extraction flows read from.

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::Value;
use url::Url;

use crate::edgegrid::EdgeGridSigner;
use crate::error::TransportError;

/// Default timeout for one source API request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Something that can GET a JSON document from the source APIs.
///
/// `target` is either a path relative to the source base URL (with an
/// optional query) or an absolute URL, as found in pagination links.
pub trait EventSource {
    fn get_json(&self, target: &str) -> Result<Value, TransportError>;
}

impl<T: EventSource + ?Sized> EventSource for &T {
    fn get_json(&self, target: &str) -> Result<Value, TransportError> {
        (**self).get_json(target)
    }
}

/// Blocking HTTP implementation of [`EventSource`].
#[derive(Debug, Clone)]
pub struct HttpEventSource {
    client: reqwest::blocking::Client,
    base_url: Url,
    signer: Option<EdgeGridSigner>,
}

impl HttpEventSource {
    /// Creates a source rooted at `base_url`.
    ///
    /// A bare host name such as `akab-xxx.luna.akamaiapis.net` is treated as
    /// `https://<host>/`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidUrl`] for an unusable base URL and
    /// [`TransportError::Network`] if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        signer: Option<EdgeGridSigner>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let base_url = normalize_base_url(base_url)?;
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| TransportError::Network {
                url: base_url.to_string(),
                source,
            })?;
        Ok(Self {
            client,
            base_url,
            signer,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves a path or absolute link against the base URL.
    pub fn resolve(&self, target: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(target)
            .map_err(|source| TransportError::InvalidUrl {
                url: target.to_string(),
                source,
            })
    }
}

impl EventSource for HttpEventSource {
    fn get_json(&self, target: &str) -> Result<Value, TransportError> {
        let url = self.resolve(target)?;
        let mut request = self.client.get(url.clone()).header(ACCEPT, "application/json");
        if let Some(signer) = &self.signer {
            request = request.header(AUTHORIZATION, signer.authorization("GET", &url, b""));
        }

        tracing::debug!(%url, "GET");
        let response = request.send().map_err(|source| TransportError::Network {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().map_err(|source| TransportError::Network {
            url: url.to_string(),
            source,
        })?;
        serde_json::from_str(&body).map_err(|source| TransportError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

fn normalize_base_url(raw: &str) -> Result<Url, TransportError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let with_scheme = if trimmed.contains("://") {
        format!("{trimmed}/")
    } else {
        format!("https://{trimmed}/")
    };
    Url::parse(&with_scheme).map_err(|source| TransportError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}
