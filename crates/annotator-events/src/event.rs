//! The closed set of event variants and their shared capability trait.

use serde_json::Value;

use crate::content_control::ContentControlEvent;
use crate::error::ParseError;
use crate::viewer::{FastPurgeEvent, PropertyActivationEvent, PurgeTarget, ViewerEvent};
use crate::Criteria;

/// Tag carried by every annotation, ahead of the variant-specific tag.
pub const TOP_LEVEL_TAG: &str = "Akamai";

/// Capabilities shared by every event record.
///
/// Extraction and dispatch only ever talk to events through this trait, so
/// neither needs to know which concrete variant it is holding.
pub trait TimelineEvent {
    /// The variant this record was built as.
    fn kind(&self) -> EventKind;

    /// Returns `true` when the record passes the configured criteria.
    fn matches_criteria(&self, criteria: &Criteria) -> bool;

    fn annotation_title(&self) -> String;

    /// Human-readable body, ending with the rendered tag list.
    fn annotation_text(&self) -> String;

    /// Start of the annotation, in epoch milliseconds.
    fn start_millis(&self) -> i64;

    /// End of the annotation, in epoch milliseconds, for events with a
    /// duration.
    fn end_millis(&self) -> Option<i64> {
        None
    }

    fn tags(&self) -> &'static [&'static str];
}

/// Renders tags as `#Tag1 #Tag2`.
pub fn render_tags(tags: &[&str]) -> String {
    tags.iter()
        .map(|tag| format!("#{tag}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Variant kinds a selector row can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    GenericEventViewer,
    FastPurgeByCpCode,
    FastPurgeByUrl,
    PropertyActivation,
    EnhancedContentControl,
}

type Constructor = fn(&Value) -> Result<Event, ParseError>;

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        Self::GenericEventViewer,
        Self::FastPurgeByCpCode,
        Self::FastPurgeByUrl,
        Self::PropertyActivation,
        Self::EnhancedContentControl,
    ];

    /// Canonical name used in selector files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GenericEventViewer => "GenericEventViewerEvent",
            Self::FastPurgeByCpCode => "FastPurgeByCPCodeEvent",
            Self::FastPurgeByUrl => "FastPurgeByUrlEvent",
            Self::PropertyActivation => "PropertyActivationEvent",
            Self::EnhancedContentControl => "EnhancedContentControlEvent",
        }
    }

    fn constructor(self) -> Constructor {
        match self {
            Self::GenericEventViewer => |raw| ViewerEvent::parse(raw).map(Event::Generic),
            Self::FastPurgeByCpCode => {
                |raw| FastPurgeEvent::parse(raw, PurgeTarget::CpCode).map(Event::FastPurge)
            }
            Self::FastPurgeByUrl => {
                |raw| FastPurgeEvent::parse(raw, PurgeTarget::Url).map(Event::FastPurge)
            }
            Self::PropertyActivation => {
                |raw| PropertyActivationEvent::parse(raw).map(Event::PropertyActivation)
            }
            Self::EnhancedContentControl => {
                |raw| ContentControlEvent::parse(raw).map(Event::ContentControl)
            }
        }
    }

    /// Builds and parses the record for this kind from a raw JSON entry.
    ///
    /// # Errors
    ///
    /// Returns the variant's [`ParseError`] when the entry does not have the
    /// expected shape.
    pub fn construct(self, raw: &Value) -> Result<Event, ParseError> {
        (self.constructor())(raw)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventKind {
    type Err = ParseEventKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GenericEventViewerEvent" => Ok(Self::GenericEventViewer),
            "FastPurgeByCPCodeEvent" => Ok(Self::FastPurgeByCpCode),
            "FastPurgeByUrlEvent" => Ok(Self::FastPurgeByUrl),
            "PropertyActivationEvent" | "PropertyManagerEvent" => Ok(Self::PropertyActivation),
            "EnhancedContentControlEvent" | "EccuEvent" => Ok(Self::EnhancedContentControl),
            _ => Err(ParseEventKindError(s.to_string())),
        }
    }
}

/// Error returned when a selector row names an unknown variant kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEventKindError(pub String);

impl std::fmt::Display for ParseEventKindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown event kind: {}", self.0)
    }
}

impl std::error::Error for ParseEventKindError {}

/// A parsed event of any supported variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Generic(ViewerEvent),
    FastPurge(FastPurgeEvent),
    PropertyActivation(PropertyActivationEvent),
    ContentControl(ContentControlEvent),
}

impl Event {
    fn inner(&self) -> &dyn TimelineEvent {
        match self {
            Self::Generic(event) => event,
            Self::FastPurge(event) => event,
            Self::PropertyActivation(event) => event,
            Self::ContentControl(event) => event,
        }
    }
}

impl TimelineEvent for Event {
    fn kind(&self) -> EventKind {
        self.inner().kind()
    }

    fn matches_criteria(&self, criteria: &Criteria) -> bool {
        self.inner().matches_criteria(criteria)
    }

    fn annotation_title(&self) -> String {
        self.inner().annotation_title()
    }

    fn annotation_text(&self) -> String {
        self.inner().annotation_text()
    }

    fn start_millis(&self) -> i64 {
        self.inner().start_millis()
    }

    fn end_millis(&self) -> Option<i64> {
        self.inner().end_millis()
    }

    fn tags(&self) -> &'static [&'static str] {
        self.inner().tags()
    }
}
