//! Enhanced content control (content invalidation) requests.

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ParseError;
use crate::event::{EventKind, TimelineEvent, TOP_LEVEL_TAG};
use crate::raw::{null_as_default, string_or_number};
use crate::time::parse_offset;
use crate::Criteria;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRequest {
    #[serde(deserialize_with = "string_or_number")]
    request_id: String,
    #[serde(default)]
    request_name: Option<String>,
    property_name: String,
    property_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    property_name_exact_match: bool,
    #[serde(default)]
    notes: Option<String>,
    status: String,
    #[serde(default)]
    status_message: Option<String>,
    #[serde(default)]
    extended_status_message: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    status_update_emails: Vec<String>,
    requestor: String,
    request_date: String,
    #[serde(default)]
    status_update_date: Option<String>,
}

/// One content-invalidation request.
///
/// Unlike event-viewer records these have a genuine duration: the request
/// date starts the annotation and the last status update ends it.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentControlEvent {
    pub request_id: String,
    pub request_name: Option<String>,
    pub property_name: String,
    pub property_type: String,
    pub property_name_exact_match: bool,
    pub notes: Option<String>,
    pub status: String,
    pub status_message: Option<String>,
    pub extended_status_message: Option<String>,
    pub status_update_emails: Vec<String>,
    pub requestor: String,
    pub event_time: DateTime<FixedOffset>,
    pub event_end_time: Option<DateTime<FixedOffset>>,
}

impl ContentControlEvent {
    /// Parses one entry of the `requests` array.
    ///
    /// # Errors
    ///
    /// Fails when a required field is absent or either date lacks an offset.
    pub fn parse(raw: &Value) -> Result<Self, ParseError> {
        let parsed = RawRequest::deserialize(raw)?;
        let event_time = parse_offset("requestDate", &parsed.request_date)?;
        let event_end_time = parsed
            .status_update_date
            .as_deref()
            .map(|raw| parse_offset("statusUpdateDate", raw))
            .transpose()?;
        Ok(Self {
            request_id: parsed.request_id,
            request_name: parsed.request_name.filter(|name| !name.is_empty()),
            property_name: parsed.property_name,
            property_type: parsed.property_type,
            property_name_exact_match: parsed.property_name_exact_match,
            notes: parsed.notes.filter(|notes| !notes.is_empty()),
            status: parsed.status,
            status_message: parsed.status_message,
            extended_status_message: parsed.extended_status_message,
            status_update_emails: parsed.status_update_emails,
            requestor: parsed.requestor,
            event_time,
            event_end_time,
        })
    }
}

impl TimelineEvent for ContentControlEvent {
    fn kind(&self) -> EventKind {
        EventKind::EnhancedContentControl
    }

    fn matches_criteria(&self, criteria: &Criteria) -> bool {
        criteria.any_substring_of(&self.property_name)
    }

    fn annotation_title(&self) -> String {
        match &self.request_name {
            Some(name) => format!("ECCU request {name}: {}", self.status),
            None => format!("ECCU request #{}: {}", self.request_id, self.status),
        }
    }

    fn annotation_text(&self) -> String {
        let exact = if self.property_name_exact_match {
            " (exact match)"
        } else {
            ""
        };
        let mut text = format!(
            "Content invalidation on {} {}{exact} requested by {}. Status: {}",
            self.property_type, self.property_name, self.requestor, self.status
        );
        if let Some(message) = &self.status_message {
            text.push_str(&format!(" ({message})"));
        }
        text.push('.');
        if let Some(notes) = &self.notes {
            text.push_str(&format!(" Notes: {notes}."));
        }
        text.push(' ');
        text.push_str(&crate::render_tags(self.tags()));
        text
    }

    fn start_millis(&self) -> i64 {
        self.event_time.timestamp_millis()
    }

    fn end_millis(&self) -> Option<i64> {
        self.event_end_time.map(|end| end.timestamp_millis())
    }

    fn tags(&self) -> &'static [&'static str] {
        &[TOP_LEVEL_TAG, "ECCU"]
    }
}
