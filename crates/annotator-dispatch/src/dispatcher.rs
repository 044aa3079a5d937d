//! The paced posting loop.

use std::time::Duration;

use annotator_events::time::format_millis_utc;
use annotator_events::TimelineEvent;

use crate::annotation::Annotation;
use crate::AnnotationSink;

/// Pause after each post unless configured otherwise.
pub const DEFAULT_POST_DELAY: Duration = Duration::from_secs(1);

/// Outcome counters of one dispatch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub posted: usize,
    pub failed: usize,
    pub simulated: usize,
}

impl DispatchReport {
    pub fn total(&self) -> usize {
        self.posted + self.failed + self.simulated
    }

    pub fn merge(&mut self, other: DispatchReport) {
        self.posted += other.posted;
        self.failed += other.failed;
        self.simulated += other.simulated;
    }
}

/// Posts annotations one at a time with a fixed pause after every attempt.
///
/// Without a sink the dispatcher only logs what it would have posted.
#[derive(Debug)]
pub struct Dispatcher<S> {
    sink: Option<S>,
    delay: Duration,
}

impl<S: AnnotationSink> Dispatcher<S> {
    pub fn new(sink: S, delay: Duration) -> Self {
        Self {
            sink: Some(sink),
            delay,
        }
    }

    /// A dry-run dispatcher: no posts and no pauses.
    pub fn simulated() -> Self {
        Self {
            sink: None,
            delay: Duration::ZERO,
        }
    }

    pub fn is_simulated(&self) -> bool {
        self.sink.is_none()
    }

    /// Converts each event into an annotation and posts it, in order.
    ///
    /// A failed post is logged and counted; the loop moves on to the next
    /// event after the usual pause.
    pub fn dispatch<E: TimelineEvent>(&mut self, events: &[E]) -> DispatchReport {
        let mut report = DispatchReport::default();
        for event in events {
            let annotation = Annotation::from_event(event);
            log_annotation(&annotation);

            let Some(sink) = self.sink.as_mut() else {
                report.simulated += 1;
                continue;
            };
            match sink.post(&annotation) {
                Ok(()) => report.posted += 1,
                Err(e) => {
                    tracing::error!(title = %annotation.title, error = %e, "annotation not added");
                    report.failed += 1;
                }
            }
            if !self.delay.is_zero() {
                std::thread::sleep(self.delay);
            }
        }
        report
    }
}

fn log_annotation(annotation: &Annotation) {
    tracing::debug!(
        title = %annotation.title,
        text = %annotation.text,
        start = annotation.start_millis,
        start_utc = %format_millis_utc(annotation.start_millis),
        end = ?annotation.end_millis,
        end_utc = ?annotation.end_millis.map(format_millis_utc),
        "annotation"
    );
}
