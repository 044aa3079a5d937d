//! `EG1-HMAC-SHA256` request signing for the source APIs.
//!
//! Every request carries an `Authorization` header built from the client
//! token, access token, a UTC timestamp and a one-time nonce, signed with a
//! key derived from the client secret:
//!
//! ```text
//! signing_key = base64(HMAC-SHA256(client_secret, timestamp))
//! data        = METHOD \t scheme \t host \t path?query \t headers \t content_hash \t auth_prefix
//! signature   = base64(HMAC-SHA256(signing_key, data))
//! ```

use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::fmt;
use url::Url;

const ALGORITHM: &str = "EG1-HMAC-SHA256";

/// Request bodies beyond this size are hashed only up to it.
const MAX_SIGNED_BODY_BYTES: usize = 128 * 1024;

/// API client credentials.
#[derive(Clone, Default)]
pub struct EdgeGridCredentials {
    pub client_token: String,
    pub client_secret: String,
    pub access_token: String,
}

impl fmt::Debug for EdgeGridCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EdgeGridCredentials")
            .field("client_token", &self.client_token)
            .field("client_secret", &"[REDACTED]")
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

impl EdgeGridCredentials {
    pub fn new(
        client_token: impl Into<String>,
        client_secret: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            client_token: client_token.into(),
            client_secret: client_secret.into(),
            access_token: access_token.into(),
        }
    }

    /// Returns `true` when all three values are present.
    pub fn is_complete(&self) -> bool {
        !self.client_token.is_empty()
            && !self.client_secret.is_empty()
            && !self.access_token.is_empty()
    }
}

/// Builds `Authorization` header values for outgoing requests.
#[derive(Debug, Clone)]
pub struct EdgeGridSigner {
    credentials: EdgeGridCredentials,
}

impl EdgeGridSigner {
    pub fn new(credentials: EdgeGridCredentials) -> Self {
        Self { credentials }
    }

    /// Signs a request with the current time and a fresh nonce.
    pub fn authorization(&self, method: &str, url: &Url, body: &[u8]) -> String {
        let nonce = uuid::Uuid::new_v4().to_string();
        self.authorization_at(method, url, body, Utc::now(), &nonce)
    }

    /// Signs a request with an explicit timestamp and nonce.
    pub fn authorization_at(
        &self,
        method: &str,
        url: &Url,
        body: &[u8],
        at: DateTime<Utc>,
        nonce: &str,
    ) -> String {
        let timestamp = at.format("%Y%m%dT%H:%M:%S+0000").to_string();
        let auth_prefix = format!(
            "{ALGORITHM} client_token={};access_token={};timestamp={timestamp};nonce={nonce};",
            self.credentials.client_token, self.credentials.access_token
        );

        let signing_key = hmac_base64(
            self.credentials.client_secret.as_bytes(),
            timestamp.as_bytes(),
        );
        let method = method.to_ascii_uppercase();
        let content_hash = if method == "POST" && !body.is_empty() {
            let signed = &body[..body.len().min(MAX_SIGNED_BODY_BYTES)];
            base64::engine::general_purpose::STANDARD.encode(Sha256::digest(signed))
        } else {
            String::new()
        };

        let host = host_with_port(url);
        let path = path_and_query(url);
        let data_to_sign = [
            method.as_str(),
            url.scheme(),
            host.as_str(),
            path.as_str(),
            "",
            content_hash.as_str(),
            auth_prefix.as_str(),
        ]
        .join("\t");

        let signature = hmac_base64(signing_key.as_bytes(), data_to_sign.as_bytes());
        format!("{auth_prefix}signature={signature}")
    }
}

fn hmac_base64(key: &[u8], message: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC key length is valid");
    mac.update(message);
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

fn host_with_port(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

fn path_and_query(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_string(),
    }
}
