//! Blocking client for the mPulse dashboard API.

use std::fmt;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::annotation::Annotation;
use crate::error::PostError;
use crate::AnnotationSink;

pub const DEFAULT_DASHBOARD_URL: &str = "https://mpulse.soasta.com";

const TOKEN_PATH: &str = "concerto/services/rest/RepositoryService/v1/Tokens";
const ANNOTATION_PATH: &str = "concerto/mpulse/api/annotations/v1";
const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest<'a> {
    api_token: &'a str,
    tenant: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
}

/// A dashboard security token, valid for the rest of the run.
#[derive(Clone)]
pub struct SecurityToken(String);

impl SecurityToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecurityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecurityToken([REDACTED])")
    }
}

/// Talks to the token and annotation endpoints.
#[derive(Debug, Clone)]
pub struct MPulseClient {
    client: reqwest::blocking::Client,
    token_url: Url,
    annotation_url: Url,
}

impl MPulseClient {
    /// Creates a client for the dashboard at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`PostError::InvalidUrl`] when `base_url` is not an absolute
    /// URL and [`PostError::Network`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, PostError> {
        let invalid = |source| PostError::InvalidUrl {
            url: base_url.to_string(),
            source,
        };
        let base = Url::parse(&format!("{}/", base_url.trim().trim_end_matches('/')))
            .map_err(invalid)?;
        let token_url = base.join(TOKEN_PATH).map_err(invalid)?;
        let annotation_url = base.join(ANNOTATION_PATH).map_err(invalid)?;
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| PostError::Network {
                url: base.to_string(),
                source,
            })?;
        Ok(Self {
            client,
            token_url,
            annotation_url,
        })
    }

    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    pub fn annotation_url(&self) -> &Url {
        &self.annotation_url
    }

    /// Exchanges an API token for a security token.
    ///
    /// # Errors
    ///
    /// Fails on a transport error, a non-2xx response or a response without
    /// a token.
    pub fn issue_token(&self, api_token: &str, tenant: &str) -> Result<SecurityToken, PostError> {
        let url = self.token_url.to_string();
        tracing::info!(%url, tenant, "requesting dashboard security token");

        let response = self
            .client
            .put(self.token_url.clone())
            .json(&TokenRequest { api_token, tenant })
            .send()
            .map_err(|source| PostError::Network {
                url: url.clone(),
                source,
            })?;
        let response = check_status(&url, response)?;

        let body: TokenResponse = response.json().map_err(|source| PostError::Network {
            url: url.clone(),
            source,
        })?;
        match body.token.filter(|token| !token.is_empty()) {
            Some(token) => {
                tracing::info!("dashboard security token issued");
                Ok(SecurityToken(token))
            }
            None => Err(PostError::MissingToken { url }),
        }
    }

    /// Posts one annotation with an already issued token.
    ///
    /// # Errors
    ///
    /// Fails on a transport error or a non-2xx response.
    pub fn add_annotation(
        &self,
        token: &SecurityToken,
        annotation: &Annotation,
    ) -> Result<(), PostError> {
        let url = self.annotation_url.to_string();
        let response = self
            .client
            .post(self.annotation_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(AUTH_TOKEN_HEADER, token.as_str())
            .json(annotation)
            .send()
            .map_err(|source| PostError::Network {
                url: url.clone(),
                source,
            })?;
        check_status(&url, response)?;
        tracing::info!(title = %annotation.title, "annotation added");
        Ok(())
    }

    /// Binds the client to a token so it can serve as an [`AnnotationSink`].
    pub fn with_token(self, token: SecurityToken) -> AuthorizedClient {
        AuthorizedClient {
            client: self,
            token,
        }
    }
}

/// An [`MPulseClient`] holding a security token.
#[derive(Debug, Clone)]
pub struct AuthorizedClient {
    client: MPulseClient,
    token: SecurityToken,
}

impl AnnotationSink for AuthorizedClient {
    fn post(&mut self, annotation: &Annotation) -> Result<(), PostError> {
        self.client.add_annotation(&self.token, annotation)
    }
}

fn check_status(
    url: &str,
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, PostError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(PostError::Status {
        url: url.to_string(),
        status: status.as_u16(),
        body,
    })
}
