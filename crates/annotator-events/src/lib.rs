//! Event model and selector table for the operational-event annotator.
//!
//! Raw JSON entries from the source event APIs are classified through a
//! [`SelectorTable`] keyed by event-definition ID. The table names the
//! [`EventKind`] to build and the [`Criteria`] the built record must match.
//!
//! # Variants
//!
//! | Kind | Source | Criteria policy |
//! |------|--------|-----------------|
//! | `GenericEventViewerEvent` | event viewer | always matches |
//! | `FastPurgeByCPCodeEvent` | event viewer | token is a substring of the purge request |
//! | `FastPurgeByUrlEvent` | event viewer | token is a substring of the purge request |
//! | `PropertyActivationEvent` | event viewer | token equals the property name |
//! | `EnhancedContentControlEvent` | content control | token is a substring of the property name |
//!
//! An empty criteria list matches every record of every kind.
//!
//! # Usage
//!
//! ```rust,ignore
//! use annotator_events::{SelectorTable, TimelineEvent};
//!
//! let selector = SelectorTable::load("events-selector.csv")?;
//! if let Some(entry) = selector.get("229233") {
//!     if let Some(event) = entry.select(&raw)? {
//!         println!("{}", event.annotation_title());
//!     }
//! }
//! ```

mod content_control;
mod criteria;
mod error;
mod event;
mod raw;
mod selector;
pub mod time;
mod viewer;

pub use content_control::ContentControlEvent;
pub use criteria::Criteria;
pub use error::{ParseError, SelectorError};
pub use event::{render_tags, Event, EventKind, ParseEventKindError, TimelineEvent, TOP_LEVEL_TAG};
pub use raw::definition_id_of;
pub use selector::{SelectorEntry, SelectorTable, CONTENT_CONTROL_DEFINITION_ID};
pub use viewer::{EventDatum, FastPurgeEvent, PropertyActivationEvent, PurgeTarget, ViewerEvent};
