//! The annotation payload.

use annotator_events::TimelineEvent;
use serde::{Serialize, Serializer};

/// One dashboard annotation.
///
/// Timestamps are epoch milliseconds. On the wire they are sent as decimal
/// strings, which is what the annotation endpoint accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub title: String,
    #[serde(rename = "start", serialize_with = "millis_as_string")]
    pub start_millis: i64,
    pub text: String,
    #[serde(
        rename = "end",
        skip_serializing_if = "Option::is_none",
        serialize_with = "optional_millis_as_string"
    )]
    pub end_millis: Option<i64>,
}

impl Annotation {
    pub fn from_event(event: &(impl TimelineEvent + ?Sized)) -> Self {
        Self {
            title: event.annotation_title(),
            start_millis: event.start_millis(),
            text: event.annotation_text(),
            end_millis: event.end_millis(),
        }
    }
}

fn millis_as_string<S: Serializer>(millis: &i64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(millis)
}

fn optional_millis_as_string<S: Serializer>(
    millis: &Option<i64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match millis {
        Some(millis) => serializer.collect_str(millis),
        None => serializer.serialize_none(),
    }
}
