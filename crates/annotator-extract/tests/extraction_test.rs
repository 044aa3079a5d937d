use std::cell::RefCell;
use std::collections::HashMap;

use annotator_events::{Event, EventKind, SelectorTable, TimelineEvent};
use annotator_extract::{EventSource, Extractor, TransportError};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

/// In-memory source answering from a fixed route table.
#[derive(Default)]
struct FakeSource {
    routes: HashMap<String, Result<Value, u16>>,
    requests: RefCell<Vec<String>>,
}

impl FakeSource {
    fn route(mut self, target: &str, body: Value) -> Self {
        self.routes.insert(target.to_string(), Ok(body));
        self
    }

    fn failing(mut self, target: &str, status: u16) -> Self {
        self.routes.insert(target.to_string(), Err(status));
        self
    }

    fn requested(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl EventSource for FakeSource {
    fn get_json(&self, target: &str) -> Result<Value, TransportError> {
        self.requests.borrow_mut().push(target.to_string());
        match self.routes.get(target) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(status)) => Err(TransportError::Status {
                url: target.to_string(),
                status: *status,
                body: String::new(),
            }),
            None => Err(TransportError::Status {
                url: target.to_string(),
                status: 404,
                body: String::new(),
            }),
        }
    }
}

fn viewer_event(id: &str, definition_id: &str, purge_request: &str) -> Value {
    json!({
        "eventId": id,
        "eventTime": "2019-03-26T10:42:55Z",
        "eventType": {
            "eventTypeId": "7",
            "eventTypeName": "Fast Purge",
            "eventDefinition": {"eventDefinitionId": definition_id, "eventName": "Purge"}
        },
        "username": "jdoe",
        "impersonator": null,
        "eventData": [
            {"key": "Purge action", "value": "invalidate"},
            {"key": "Purge network", "value": "production"},
            {"key": "Purge request", "value": purge_request}
        ]
    })
}

fn page(events: Vec<Value>, next: Option<&str>) -> Value {
    let links = match next {
        Some(href) => json!([{"rel": "self", "href": "/ignored"}, {"rel": "next", "href": href}]),
        None => json!([]),
    };
    json!({"events": events, "links": links})
}

fn eccu_request(id: u64, property: &str, request_date: &str) -> Value {
    json!({
        "requestId": id,
        "propertyName": property,
        "propertyType": "HOST_HEADER",
        "propertyNameExactMatch": false,
        "status": "SUCCEEDED",
        "requestor": "jdoe",
        "requestDate": request_date,
        "statusUpdateDate": "2019-03-28T00:00:00+00:00"
    })
}

fn purge_selector(criteria: &str) -> SelectorTable {
    let mut selector = SelectorTable::new();
    selector.insert("229233", EventKind::FastPurgeByCpCode, criteria);
    selector
}

fn event_ids(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .map(|event| match event {
            Event::Generic(e) => e.event_id.clone(),
            Event::FastPurge(e) => e.base.event_id.clone(),
            Event::PropertyActivation(e) => e.base.event_id.clone(),
            Event::ContentControl(e) => e.request_id.clone(),
        })
        .collect()
}

const FIRST_PAGE: &str = "/event-viewer-api/v1/events?start=2019-03-26T00:00:00Z";

fn start() -> Option<chrono::DateTime<Utc>> {
    Some(Utc.with_ymd_and_hms(2019, 3, 26, 0, 0, 0).unwrap())
}

// ── Event viewer flow ────────────────────────────────────────────────

#[test]
fn three_page_chain_is_concatenated_in_order() {
    let source = FakeSource::default()
        .route(
            FIRST_PAGE,
            page(
                vec![
                    viewer_event("p1-a", "229233", "cpcode=12345"),
                    viewer_event("p1-b", "229233", "cpcode=99999"),
                ],
                Some("/event-viewer-api/v1/events?page=2"),
            ),
        )
        .route(
            "/event-viewer-api/v1/events?page=2",
            page(
                vec![viewer_event("p2-a", "229233", "cpcode=67890")],
                Some("/event-viewer-api/v1/events?page=3"),
            ),
        )
        .route(
            "/event-viewer-api/v1/events?page=3",
            page(vec![viewer_event("p3-a", "229233", "cpcode=12345,67890")], None),
        );
    let selector = purge_selector("12345;67890");

    let extraction = Extractor::new(&source, &selector).viewer_events(start());

    assert!(extraction.is_complete());
    assert_eq!(event_ids(&extraction.events), ["p1-a", "p2-a", "p3-a"]);
    assert_eq!(extraction.stats.pages, 3);
    assert_eq!(extraction.stats.returned, 4);
    assert_eq!(extraction.stats.criteria_mismatch, 1);
    assert_eq!(source.requested().len(), 3);
}

#[test]
fn null_or_missing_links_end_pagination() {
    let source = FakeSource::default().route(
        "/event-viewer-api/v1/events",
        json!({"events": [viewer_event("only", "229233", "cpcode=1")], "links": null}),
    );
    let selector = purge_selector("");

    let extraction = Extractor::new(&source, &selector).viewer_events(None);

    assert_eq!(event_ids(&extraction.events), ["only"]);
    assert_eq!(source.requested(), ["/event-viewer-api/v1/events"]);
}

#[test]
fn unselected_definitions_are_never_returned() {
    let source = FakeSource::default().route(
        FIRST_PAGE,
        page(
            vec![
                viewer_event("kept", "229233", "cpcode=1"),
                viewer_event("other", "555555", "cpcode=1"),
            ],
            None,
        ),
    );
    let selector = purge_selector("");

    let extraction = Extractor::new(&source, &selector).viewer_events(start());

    assert_eq!(event_ids(&extraction.events), ["kept"]);
    assert_eq!(extraction.stats.unselected, 1);
}

#[test]
fn malformed_entry_is_skipped_and_page_continues() {
    let mut broken = viewer_event("broken", "229233", "cpcode=1");
    broken.as_object_mut().unwrap().remove("eventTime");
    let source = FakeSource::default().route(
        FIRST_PAGE,
        page(
            vec![
                viewer_event("first", "229233", "cpcode=1"),
                broken,
                json!({"eventId": "no-type"}),
                viewer_event("last", "229233", "cpcode=1"),
            ],
            None,
        ),
    );
    let selector = purge_selector("");

    let extraction = Extractor::new(&source, &selector).viewer_events(start());

    assert_eq!(event_ids(&extraction.events), ["first", "last"]);
    assert_eq!(extraction.stats.parse_failures, 2);
    assert!(extraction.is_complete());
}

#[test]
fn failed_page_returns_partial_results() {
    let source = FakeSource::default()
        .route(
            FIRST_PAGE,
            page(
                vec![viewer_event("p1", "229233", "cpcode=1")],
                Some("/event-viewer-api/v1/events?page=2"),
            ),
        )
        .failing("/event-viewer-api/v1/events?page=2", 503);
    let selector = purge_selector("");

    let extraction = Extractor::new(&source, &selector).viewer_events(start());

    assert_eq!(event_ids(&extraction.events), ["p1"]);
    assert!(matches!(
        extraction.aborted,
        Some(TransportError::Status { status: 503, .. })
    ));
}

#[test]
fn page_without_events_array_aborts_flow() {
    let source = FakeSource::default().route(FIRST_PAGE, json!({"links": []}));
    let selector = purge_selector("");

    let extraction = Extractor::new(&source, &selector).viewer_events(start());

    assert!(extraction.events.is_empty());
    assert!(matches!(extraction.aborted, Some(TransportError::Decode { .. })));
}

#[test]
fn rerun_yields_identical_sequence() {
    let source = FakeSource::default()
        .route(
            FIRST_PAGE,
            page(
                vec![
                    viewer_event("a", "229233", "cpcode=12345"),
                    viewer_event("b", "229233", "cpcode=67890"),
                ],
                Some("/event-viewer-api/v1/events?page=2"),
            ),
        )
        .route(
            "/event-viewer-api/v1/events?page=2",
            page(vec![viewer_event("c", "229233", "cpcode=12345")], None),
        );
    let selector = purge_selector("12345;67890");
    let extractor = Extractor::new(&source, &selector);

    let first = extractor.viewer_events(start());
    let second = extractor.viewer_events(start());

    assert_eq!(first.events, second.events);
    assert_eq!(first.stats, second.stats);
}

// ── Content-control flow ─────────────────────────────────────────────

fn eccu_selector(criteria: &str) -> SelectorTable {
    let mut selector = SelectorTable::new();
    selector.insert("000001", EventKind::EnhancedContentControl, criteria);
    selector
}

#[test]
fn requests_before_lower_bound_are_excluded() {
    let source = FakeSource::default().route(
        "/eccu-api/v1/requests",
        json!({"requests": [
            eccu_request(1, "images.example.com", "2019-03-25T23:59:59+00:00"),
            eccu_request(2, "images.example.com", "2019-03-26T00:00:00+00:00"),
            eccu_request(3, "www.example.com", "2019-03-27T09:43:55+00:00"),
        ]}),
    );
    let selector = eccu_selector("images");

    let extraction = Extractor::new(&source, &selector).content_control_events(start());

    assert_eq!(event_ids(&extraction.events), ["2"]);
    assert_eq!(extraction.stats.before_start, 1);
    assert_eq!(extraction.stats.criteria_mismatch, 1);
    assert_eq!(extraction.events[0].end_millis(), Some(1_553_731_200_000));
}

#[test]
fn content_control_skips_malformed_requests() {
    let mut broken = eccu_request(2, "images.example.com", "2019-03-27T00:00:00+00:00");
    broken["requestDate"] = json!("not a date");
    let source = FakeSource::default().route(
        "/eccu-api/v1/requests",
        json!({"requests": [
            eccu_request(1, "images.example.com", "2019-03-27T00:00:00+00:00"),
            broken,
            eccu_request(3, "images.example.com", "2019-03-27T00:00:00+00:00"),
        ]}),
    );
    let selector = eccu_selector("");

    let extraction = Extractor::new(&source, &selector).content_control_events(start());

    assert_eq!(event_ids(&extraction.events), ["1", "3"]);
    assert_eq!(extraction.stats.parse_failures, 1);
}

#[test]
fn content_control_without_selector_entry_makes_no_request() {
    let source = FakeSource::default();
    let selector = purge_selector("");

    let extraction = Extractor::new(&source, &selector).content_control_events(start());

    assert!(extraction.events.is_empty());
    assert!(extraction.is_complete());
    assert!(source.requested().is_empty());
}

#[test]
fn content_control_http_failure_is_reported() {
    let source = FakeSource::default().failing("/eccu-api/v1/requests", 401);
    let selector = eccu_selector("");

    let extraction = Extractor::new(&source, &selector).content_control_events(start());

    assert!(extraction.events.is_empty());
    let err = extraction.aborted.expect("flow should be aborted");
    assert_eq!(err.url(), "/eccu-api/v1/requests");
}
