//! One annotator run: load the selector, extract, dispatch.

use annotator_dispatch::{
    AnnotationSink, AuthorizedClient, DispatchReport, Dispatcher, MPulseClient, PostError,
};
use annotator_events::{Event, SelectorTable};
use annotator_extract::{EdgeGridSigner, EventSource, Extractor, HttpEventSource, TransportError};
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::cli::{RunSettings, SourceSelection};
use crate::config::ConfigError;

/// Errors that end a run before any annotation is posted.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot reach the event source: {0}")]
    Source(#[from] TransportError),

    #[error("cannot authenticate with the dashboard: {0}")]
    Dashboard(#[from] PostError),
}

/// What a run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Events that passed selection across all flows.
    pub selected: usize,
    /// Flows that stopped early on a transport error.
    pub incomplete_flows: usize,
    pub dispatch: DispatchReport,
}

/// Runs the configured flows and posts what they select.
///
/// # Errors
///
/// Fails when the selector file cannot be loaded, the source client cannot
/// be built, or (outside simulation) no dashboard token can be issued.
pub fn run(settings: &RunSettings) -> Result<RunSummary, RunError> {
    let selector = SelectorTable::load(&settings.selector_path).map_err(ConfigError::from)?;
    if selector.is_empty() {
        tracing::warn!(
            path = %settings.selector_path,
            "selector table is empty, nothing will be selected"
        );
    }

    let source = HttpEventSource::new(
        &settings.base_url,
        Some(EdgeGridSigner::new(settings.credentials.clone())),
        settings.timeout,
    )?;
    tracing::info!(
        base_url = %source.base_url(),
        client_token = %settings.credentials.client_token,
        from = ?settings.from,
        "source session created"
    );

    let mut dispatcher = if settings.simulate {
        tracing::info!("simulation mode: annotations will be logged, not posted");
        Dispatcher::<AuthorizedClient>::simulated()
    } else {
        let client = MPulseClient::new(&settings.dashboard_url, settings.timeout)?;
        let token = client.issue_token(&settings.api_token, &settings.tenant)?;
        Dispatcher::new(client.with_token(token), settings.post_delay)
    };

    let summary = execute(
        &source,
        &selector,
        settings.source,
        settings.from,
        &mut dispatcher,
    );
    Ok(summary)
}

/// Extracts from the selected flows, viewer first, then dispatches the
/// concatenated events in order.
pub fn execute<S: EventSource, K: AnnotationSink>(
    source: S,
    selector: &SelectorTable,
    selection: SourceSelection,
    from: Option<DateTime<Utc>>,
    dispatcher: &mut Dispatcher<K>,
) -> RunSummary {
    let extractor = Extractor::new(source, selector);
    let mut events: Vec<Event> = Vec::new();
    let mut summary = RunSummary::default();

    let mut flows = Vec::new();
    if selection.includes_viewer() {
        flows.push(extractor.viewer_events(from));
    }
    if selection.includes_content_control() {
        flows.push(extractor.content_control_events(from));
    }
    for extraction in flows {
        if let Some(e) = &extraction.aborted {
            tracing::warn!(
                error = %e,
                kept = extraction.events.len(),
                "continuing with partial results"
            );
            summary.incomplete_flows += 1;
        }
        events.extend(extraction.events);
    }
    summary.selected = events.len();
    tracing::info!(count = events.len(), "events selected for annotation");

    summary.dispatch = dispatcher.dispatch(&events);
    tracing::info!(
        selected = summary.selected,
        posted = summary.dispatch.posted,
        failed = summary.dispatch.failed,
        simulated = summary.dispatch.simulated,
        incomplete_flows = summary.incomplete_flows,
        "run finished"
    );
    summary
}
