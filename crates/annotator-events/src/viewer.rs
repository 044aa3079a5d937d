//! Event-viewer records: the generic event and its purge and activation
//! refinements.
//!
//! All three share [`ViewerEvent`] as their common part. The refinements pull
//! their extra fields out of the opaque key/value `eventData` sequence.

use chrono::{DateTime, Local};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ParseError;
use crate::event::{EventKind, TimelineEvent, TOP_LEVEL_TAG};
use crate::raw::{null_as_default, optional_string, string_or_number};
use crate::time::parse_utc_as_local;
use crate::Criteria;

const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %:z";

const KEY_PURGE_ACTION: &str = "Purge action";
const KEY_PURGE_NETWORK: &str = "Purge network";
const KEY_PURGE_REQUEST: &str = "Purge request";
const KEY_PURGE_RESPONSE: &str = "Purge response";

const KEY_PROPERTY_NAME: &str = "PROPERTY_NAME";
const KEY_PROPERTY_VERSION: &str = "PROPERTY_VERSION";
const KEY_USERNAME: &str = "USERNAME";

/// One entry of the opaque `eventData` sequence.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventDatum {
    pub key: String,
    #[serde(default, deserialize_with = "optional_string")]
    pub value: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawViewerEvent {
    #[serde(deserialize_with = "string_or_number")]
    event_id: String,
    event_time: String,
    event_type: RawEventType,
    username: String,
    #[serde(default, deserialize_with = "optional_string")]
    impersonator: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    event_data: Vec<EventDatum>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEventType {
    #[serde(deserialize_with = "string_or_number")]
    event_type_id: String,
    event_type_name: String,
    event_definition: RawEventDefinition,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEventDefinition {
    #[serde(deserialize_with = "string_or_number")]
    event_definition_id: String,
    event_name: String,
}

/// A generic event from the event-viewer API.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerEvent {
    pub event_id: String,
    /// Source UTC time, converted to the operator's local zone.
    pub event_time: DateTime<Local>,
    pub event_type_id: String,
    pub event_type_name: String,
    pub event_definition_id: String,
    pub event_name: String,
    pub username: String,
    pub impersonator: Option<String>,
    pub event_data: Vec<EventDatum>,
}

impl ViewerEvent {
    /// Parses the common event-viewer shape.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Json`] when a required field is missing or has
    /// the wrong type, and [`ParseError::Timestamp`] when `eventTime` is not a
    /// UTC timestamp.
    pub fn parse(raw: &Value) -> Result<Self, ParseError> {
        let parsed = RawViewerEvent::deserialize(raw)?;
        let event_time = parse_utc_as_local("eventTime", &parsed.event_time)?;
        Ok(Self {
            event_id: parsed.event_id,
            event_time,
            event_type_id: parsed.event_type.event_type_id,
            event_type_name: parsed.event_type.event_type_name,
            event_definition_id: parsed.event_type.event_definition.event_definition_id,
            event_name: parsed.event_type.event_definition.event_name,
            username: parsed.username,
            impersonator: parsed.impersonator,
            event_data: parsed.event_data,
        })
    }

    /// Looks up a value in the event data. Later entries shadow earlier ones.
    pub fn data(&self, key: &str) -> Option<&str> {
        self.event_data
            .iter()
            .rev()
            .find(|datum| datum.key == key)
            .and_then(|datum| datum.value.as_deref())
    }

    fn required(&self, key: &'static str) -> Result<String, ParseError> {
        self.data(key)
            .map(str::to_string)
            .ok_or(ParseError::MissingField(key))
    }

    fn optional(&self, key: &str) -> Option<String> {
        self.data(key).map(str::to_string)
    }

    fn display_time(&self) -> String {
        self.event_time.format(DISPLAY_TIME_FORMAT).to_string()
    }

    fn actor(&self) -> String {
        match &self.impersonator {
            Some(impersonator) if !impersonator.is_empty() => {
                format!("{} (impersonated by {impersonator})", self.username)
            }
            _ => self.username.clone(),
        }
    }
}

impl TimelineEvent for ViewerEvent {
    fn kind(&self) -> EventKind {
        EventKind::GenericEventViewer
    }

    fn matches_criteria(&self, _criteria: &Criteria) -> bool {
        true
    }

    fn annotation_title(&self) -> String {
        format!("{}: {}", self.event_type_name, self.event_name)
    }

    fn annotation_text(&self) -> String {
        format!(
            "{} by {} at {}. {}",
            self.event_name,
            self.actor(),
            self.display_time(),
            crate::render_tags(self.tags())
        )
    }

    fn start_millis(&self) -> i64 {
        self.event_time.timestamp_millis()
    }

    fn tags(&self) -> &'static [&'static str] {
        &[TOP_LEVEL_TAG, "EventViewer"]
    }
}

/// What a purge request addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeTarget {
    CpCode,
    Url,
}

impl PurgeTarget {
    fn label(self) -> &'static str {
        match self {
            Self::CpCode => "CP code",
            Self::Url => "URL",
        }
    }
}

/// A content purge, by CP code or by URL.
#[derive(Debug, Clone, PartialEq)]
pub struct FastPurgeEvent {
    pub base: ViewerEvent,
    pub target: PurgeTarget,
    pub purge_action: Option<String>,
    pub purge_network: Option<String>,
    pub purge_request: String,
    pub purge_response: Option<String>,
}

impl FastPurgeEvent {
    /// Parses a purge event. `Purge request` is required since it is what
    /// criteria are matched against.
    pub fn parse(raw: &Value, target: PurgeTarget) -> Result<Self, ParseError> {
        let base = ViewerEvent::parse(raw)?;
        Ok(Self {
            target,
            purge_action: base.optional(KEY_PURGE_ACTION),
            purge_network: base.optional(KEY_PURGE_NETWORK),
            purge_request: base.required(KEY_PURGE_REQUEST)?,
            purge_response: base.optional(KEY_PURGE_RESPONSE),
            base,
        })
    }
}

impl TimelineEvent for FastPurgeEvent {
    fn kind(&self) -> EventKind {
        match self.target {
            PurgeTarget::CpCode => EventKind::FastPurgeByCpCode,
            PurgeTarget::Url => EventKind::FastPurgeByUrl,
        }
    }

    fn matches_criteria(&self, criteria: &Criteria) -> bool {
        criteria.any_substring_of(&self.purge_request)
    }

    fn annotation_title(&self) -> String {
        let action = self.purge_action.as_deref().unwrap_or("purge");
        match &self.purge_network {
            Some(network) => format!(
                "Fast Purge by {}: {action} on {network}",
                self.target.label()
            ),
            None => format!("Fast Purge by {}: {action}", self.target.label()),
        }
    }

    fn annotation_text(&self) -> String {
        let mut text = format!(
            "{} requested by {} at {}.",
            self.purge_request,
            self.base.actor(),
            self.base.display_time()
        );
        if let Some(response) = &self.purge_response {
            text.push_str(&format!(" Response: {response}."));
        }
        text.push(' ');
        text.push_str(&crate::render_tags(self.tags()));
        text
    }

    fn start_millis(&self) -> i64 {
        self.base.start_millis()
    }

    fn tags(&self) -> &'static [&'static str] {
        match self.target {
            PurgeTarget::CpCode => &[TOP_LEVEL_TAG, "FastPurgeCPCode"],
            PurgeTarget::Url => &[TOP_LEVEL_TAG, "FastPurgeURL"],
        }
    }
}

/// A property configuration activation.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyActivationEvent {
    pub base: ViewerEvent,
    pub property_name: String,
    pub property_version: Option<String>,
    /// `USERNAME` from the event data when present, else the event's user.
    pub username: String,
}

impl PropertyActivationEvent {
    pub fn parse(raw: &Value) -> Result<Self, ParseError> {
        let base = ViewerEvent::parse(raw)?;
        Ok(Self {
            property_name: base.required(KEY_PROPERTY_NAME)?,
            property_version: base.optional(KEY_PROPERTY_VERSION),
            username: base
                .optional(KEY_USERNAME)
                .unwrap_or_else(|| base.username.clone()),
            base,
        })
    }
}

impl TimelineEvent for PropertyActivationEvent {
    fn kind(&self) -> EventKind {
        EventKind::PropertyActivation
    }

    fn matches_criteria(&self, criteria: &Criteria) -> bool {
        criteria.any_equal_to(&self.property_name)
    }

    fn annotation_title(&self) -> String {
        match &self.property_version {
            Some(version) => format!("Property activation: {} v{version}", self.property_name),
            None => format!("Property activation: {}", self.property_name),
        }
    }

    fn annotation_text(&self) -> String {
        let version = self
            .property_version
            .as_deref()
            .map(|v| format!(" version {v}"))
            .unwrap_or_default();
        format!(
            "{}{version} activated by {} at {}. {}",
            self.property_name,
            self.username,
            self.base.display_time(),
            crate::render_tags(self.tags())
        )
    }

    fn start_millis(&self) -> i64 {
        self.base.start_millis()
    }

    fn tags(&self) -> &'static [&'static str] {
        &[TOP_LEVEL_TAG, "PropertyActivation"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn viewer_json(definition_id: &str, data: Value) -> Value {
        json!({
            "eventId": "ev-1",
            "eventTime": "2019-03-26T10:42:55Z",
            "eventType": {
                "eventTypeId": 17,
                "eventTypeName": "Content Purge",
                "eventDefinition": {
                    "eventDefinitionId": definition_id,
                    "eventName": "Purge by CP code"
                }
            },
            "username": "jdoe",
            "impersonator": null,
            "eventData": data
        })
    }

    #[test]
    fn generic_event_parses_all_fields() {
        let raw = viewer_json("229233", json!([{"key": "a", "value": 1}]));
        let event = ViewerEvent::parse(&raw).unwrap();
        assert_eq!(event.event_id, "ev-1");
        assert_eq!(event.event_type_id, "17");
        assert_eq!(event.event_definition_id, "229233");
        assert_eq!(event.impersonator, None);
        assert_eq!(event.data("a"), Some("1"));
        assert_eq!(event.start_millis(), 1_553_596_975_000);
        assert_eq!(event.end_millis(), None);
    }

    #[test]
    fn generic_event_accepts_null_event_data() {
        let event = ViewerEvent::parse(&viewer_json("229233", Value::Null)).unwrap();
        assert!(event.event_data.is_empty());
        assert_eq!(event.data("a"), None);
    }

    #[test]
    fn purge_with_null_event_data_reports_missing_request() {
        let raw = viewer_json("229233", Value::Null);
        let err = FastPurgeEvent::parse(&raw, PurgeTarget::CpCode).unwrap_err();
        assert!(matches!(err, ParseError::MissingField("Purge request")));
    }

    #[test]
    fn generic_event_requires_username() {
        let mut raw = viewer_json("229233", json!([]));
        raw.as_object_mut().unwrap().remove("username");
        let err = ViewerEvent::parse(&raw).unwrap_err();
        assert!(matches!(err, ParseError::Json(_)));
    }

    #[test]
    fn generic_event_rejects_bad_time() {
        let mut raw = viewer_json("229233", json!([]));
        raw["eventTime"] = json!("26/03/2019 10:42");
        let err = ViewerEvent::parse(&raw).unwrap_err();
        assert!(matches!(err, ParseError::Timestamp { field: "eventTime", .. }));
    }

    #[test]
    fn purge_extracts_known_keys() {
        let raw = viewer_json(
            "229233",
            json!([
                {"key": "Purge action", "value": "invalidate"},
                {"key": "Purge network", "value": "production"},
                {"key": "Purge request", "value": "cpcode=12345"},
                {"key": "Purge response", "value": "201 Created"},
                {"key": "Unrelated", "value": "ignored"}
            ]),
        );
        let purge = FastPurgeEvent::parse(&raw, PurgeTarget::CpCode).unwrap();
        assert_eq!(purge.purge_action.as_deref(), Some("invalidate"));
        assert_eq!(purge.purge_network.as_deref(), Some("production"));
        assert_eq!(purge.purge_request, "cpcode=12345");
        assert_eq!(purge.purge_response.as_deref(), Some("201 Created"));
        assert_eq!(
            purge.annotation_title(),
            "Fast Purge by CP code: invalidate on production"
        );
        assert!(purge.annotation_text().ends_with("#Akamai #FastPurgeCPCode"));
        assert!(purge.annotation_text().starts_with("cpcode=12345 requested by jdoe"));
    }

    #[test]
    fn purge_without_request_fails() {
        let raw = viewer_json("229233", json!([{"key": "Purge action", "value": "delete"}]));
        let err = FastPurgeEvent::parse(&raw, PurgeTarget::Url).unwrap_err();
        assert!(matches!(err, ParseError::MissingField("Purge request")));
    }

    #[test]
    fn property_activation_prefers_data_username() {
        let raw = viewer_json(
            "238252",
            json!([
                {"key": "PROPERTY_NAME", "value": "www.example.com"},
                {"key": "PROPERTY_VERSION", "value": "42"},
                {"key": "USERNAME", "value": "release-bot"}
            ]),
        );
        let activation = PropertyActivationEvent::parse(&raw).unwrap();
        assert_eq!(activation.username, "release-bot");
        assert_eq!(activation.base.username, "jdoe");
        assert_eq!(
            activation.annotation_title(),
            "Property activation: www.example.com v42"
        );
        assert!(activation
            .annotation_text()
            .starts_with("www.example.com version 42 activated by release-bot"));
    }

    #[test]
    fn property_activation_matches_exact_name_only() {
        let raw = viewer_json("238252", json!([{"key": "PROPERTY_NAME", "value": "www.example.com"}]));
        let activation = PropertyActivationEvent::parse(&raw).unwrap();
        assert!(activation.matches_criteria(&Criteria::parse("")));
        assert!(activation.matches_criteria(&Criteria::parse("api.example.com;www.example.com")));
        assert!(!activation.matches_criteria(&Criteria::parse("example.com")));
        assert_eq!(activation.username, "jdoe");
    }

    #[test]
    fn impersonation_is_shown_in_text() {
        let mut raw = viewer_json("1", json!([]));
        raw["impersonator"] = json!("admin");
        let event = ViewerEvent::parse(&raw).unwrap();
        assert!(event
            .annotation_text()
            .starts_with("Purge by CP code by jdoe (impersonated by admin) at "));
        assert!(event.annotation_text().ends_with("#Akamai #EventViewer"));
    }
}
