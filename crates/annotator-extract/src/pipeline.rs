//! The two extraction flows.
//!
//! Both flows classify every raw entry through the selector table, build the
//! configured record, and keep it only when it passes the filters. A single
//! malformed entry is logged and skipped; a failed request stops the flow
//! and the events gathered so far are returned with the error.

use annotator_events::{
    definition_id_of, Event, SelectorTable, TimelineEvent, CONTENT_CONTROL_DEFINITION_ID,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::TransportError;
use crate::source::EventSource;

pub const EVENT_VIEWER_PATH: &str = "/event-viewer-api/v1/events";
pub const CONTENT_CONTROL_PATH: &str = "/eccu-api/v1/requests";

#[derive(Debug, Deserialize)]
struct ViewerPage {
    events: Vec<Value>,
    #[serde(default)]
    links: Option<Vec<Link>>,
}

#[derive(Debug, Deserialize)]
struct Link {
    rel: String,
    href: String,
}

#[derive(Debug, Deserialize)]
struct RequestsPage {
    requests: Vec<Value>,
}

/// Counters describing one extraction flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    /// Pages successfully fetched.
    pub pages: usize,
    /// Raw entries returned by the source.
    pub returned: usize,
    /// Entries whose definition ID has no selector entry.
    pub unselected: usize,
    /// Entries that failed to parse.
    pub parse_failures: usize,
    /// Content-control entries older than the lower bound.
    pub before_start: usize,
    /// Parsed entries rejected by the criteria.
    pub criteria_mismatch: usize,
    /// Entries kept.
    pub selected: usize,
}

/// The result of one flow: the selected events in source order, plus the
/// error that stopped the flow early, if any.
#[derive(Debug)]
pub struct Extraction {
    pub events: Vec<Event>,
    pub stats: ExtractionStats,
    pub aborted: Option<TransportError>,
}

impl Extraction {
    fn new() -> Self {
        Self {
            events: Vec::new(),
            stats: ExtractionStats::default(),
            aborted: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.aborted.is_none()
    }
}

/// Runs the extraction flows against one source and selector table.
#[derive(Debug)]
pub struct Extractor<'a, S> {
    source: S,
    selector: &'a SelectorTable,
}

impl<'a, S: EventSource> Extractor<'a, S> {
    pub fn new(source: S, selector: &'a SelectorTable) -> Self {
        Self { source, selector }
    }

    /// Pages through the event viewer from `start` until no `next` link
    /// remains.
    pub fn viewer_events(&self, start: Option<DateTime<Utc>>) -> Extraction {
        let mut extraction = Extraction::new();
        let mut target = match start {
            Some(start) => format!(
                "{EVENT_VIEWER_PATH}?start={}",
                start.to_rfc3339_opts(SecondsFormat::Secs, true)
            ),
            None => EVENT_VIEWER_PATH.to_string(),
        };

        loop {
            tracing::info!(url = %target, "requesting event viewer page");
            let page = match self.fetch::<ViewerPage>(&target) {
                Ok(page) => page,
                Err(e) => {
                    tracing::error!(error = %e, "event viewer extraction stopped");
                    extraction.aborted = Some(e);
                    break;
                }
            };
            extraction.stats.pages += 1;

            let before = extraction.events.len();
            self.select_viewer_entries(&page.events, &mut extraction);
            tracing::info!(
                returned = page.events.len(),
                selected = extraction.events.len() - before,
                "event viewer page processed"
            );

            match next_link(page.links.as_deref()) {
                Some(href) => target = href,
                None => break,
            }
        }

        log_total("event viewer", start, &extraction);
        extraction
    }

    /// Fetches all content-control requests and keeps those that started at
    /// or after `from`.
    ///
    /// The endpoint always returns the full request history, so the lower
    /// bound is applied here. Without a content-control selector entry no
    /// request is made.
    pub fn content_control_events(&self, from: Option<DateTime<Utc>>) -> Extraction {
        let mut extraction = Extraction::new();
        let Some(entry) = self.selector.content_control() else {
            tracing::info!(
                definition_id = CONTENT_CONTROL_DEFINITION_ID,
                "no content-control selector entry, skipping content-control requests"
            );
            return extraction;
        };

        tracing::info!(url = CONTENT_CONTROL_PATH, "requesting content-control requests");
        let page = match self.fetch::<RequestsPage>(CONTENT_CONTROL_PATH) {
            Ok(page) => page,
            Err(e) => {
                tracing::error!(error = %e, "content-control extraction stopped");
                extraction.aborted = Some(e);
                return extraction;
            }
        };
        extraction.stats.pages += 1;
        extraction.stats.returned += page.requests.len();
        tracing::info!(returned = page.requests.len(), "content-control requests returned");

        let lower_bound = from.map(|from| from.timestamp_millis());
        for (index, raw) in page.requests.iter().enumerate() {
            let event = match entry.kind.construct(raw) {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(index, error = %e, "skipping malformed content-control request");
                    extraction.stats.parse_failures += 1;
                    continue;
                }
            };
            if lower_bound.is_some_and(|bound| event.start_millis() < bound) {
                extraction.stats.before_start += 1;
                continue;
            }
            if !event.matches_criteria(&entry.criteria) {
                extraction.stats.criteria_mismatch += 1;
                continue;
            }
            extraction.stats.selected += 1;
            extraction.events.push(event);
        }

        log_total("content control", from, &extraction);
        extraction
    }

    fn select_viewer_entries(&self, entries: &[Value], extraction: &mut Extraction) {
        extraction.stats.returned += entries.len();
        for (index, raw) in entries.iter().enumerate() {
            let Some(definition_id) = definition_id_of(raw) else {
                tracing::warn!(index, "skipping event without a definition id");
                extraction.stats.parse_failures += 1;
                continue;
            };
            let Some(entry) = self.selector.get(&definition_id) else {
                extraction.stats.unselected += 1;
                continue;
            };
            match entry.select(raw) {
                Ok(Some(event)) => {
                    extraction.stats.selected += 1;
                    extraction.events.push(event);
                }
                Ok(None) => extraction.stats.criteria_mismatch += 1,
                Err(e) => {
                    tracing::warn!(
                        index,
                        definition_id = %definition_id,
                        kind = %entry.kind,
                        error = %e,
                        "skipping malformed event"
                    );
                    extraction.stats.parse_failures += 1;
                }
            }
        }
    }

    fn fetch<T: serde::de::DeserializeOwned>(&self, target: &str) -> Result<T, TransportError> {
        let body = self.source.get_json(target)?;
        serde_json::from_value(body).map_err(|source| TransportError::Decode {
            url: target.to_string(),
            source,
        })
    }
}

fn next_link(links: Option<&[Link]>) -> Option<String> {
    links?
        .iter()
        .rev()
        .find(|link| link.rel == "next")
        .map(|link| link.href.clone())
        .filter(|href| !href.is_empty())
}

fn log_total(flow: &str, bound: Option<DateTime<Utc>>, extraction: &Extraction) {
    let bound = bound
        .map(|b| b.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| "<none>".to_string());
    tracing::info!(
        flow,
        start = %bound,
        pages = extraction.stats.pages,
        returned = extraction.stats.returned,
        selected = extraction.stats.selected,
        parse_failures = extraction.stats.parse_failures,
        complete = extraction.is_complete(),
        "extraction finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(rel: &str, href: &str) -> Link {
        Link {
            rel: rel.to_string(),
            href: href.to_string(),
        }
    }

    #[test]
    fn next_link_picks_last_next_relation() {
        let links = [
            link("self", "/events?page=1"),
            link("next", "/events?page=2"),
            link("next", "/events?page=3"),
        ];
        assert_eq!(next_link(Some(&links[..])).as_deref(), Some("/events?page=3"));
    }

    #[test]
    fn no_next_link_ends_pagination() {
        assert_eq!(next_link(None), None);
        assert_eq!(next_link(Some(&[][..])), None);
        assert_eq!(next_link(Some(&[link("self", "/events")][..])), None);
        assert_eq!(next_link(Some(&[link("next", "")][..])), None);
    }

    #[test]
    fn page_links_may_be_null_or_absent() {
        let null: ViewerPage = serde_json::from_str(r#"{"events": [], "links": null}"#).unwrap();
        let absent: ViewerPage = serde_json::from_str(r#"{"events": []}"#).unwrap();
        assert!(null.links.is_none());
        assert!(absent.links.is_none());
    }
}
