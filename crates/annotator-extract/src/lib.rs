//! Event extraction from the source platform APIs.
//!
//! Two flows share one classification step:
//!
//! - **Event viewer**: `GET /event-viewer-api/v1/events[?start=…]`, following
//!   `rel == "next"` links until a page has none.
//! - **Content control**: a single `GET /eccu-api/v1/requests` returning the
//!   whole request history, filtered client-side by start time.
//!
//! Requests go through the [`EventSource`] trait. [`HttpEventSource`] is the
//! blocking HTTP implementation, signing each request with an
//! [`EdgeGridSigner`] when credentials are configured.
//!
//! Everything is sequential: one request is in flight at a time.

pub mod edgegrid;
pub mod error;
pub mod pipeline;
pub mod source;

pub use edgegrid::{EdgeGridCredentials, EdgeGridSigner};
pub use error::TransportError;
pub use pipeline::{
    Extraction, ExtractionStats, Extractor, CONTENT_CONTROL_PATH, EVENT_VIEWER_PATH,
};
pub use source::{EventSource, HttpEventSource, DEFAULT_REQUEST_TIMEOUT};
