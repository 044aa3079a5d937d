//! Posting extracted events to the dashboard as annotations.
//!
//! [`Dispatcher`] walks the events in order, turns each into an
//! [`Annotation`] and hands it to an [`AnnotationSink`]. [`MPulseClient`]
//! issues the security token and, once bound to it, is the production sink.

pub mod annotation;
pub mod dispatcher;
pub mod error;
pub mod mpulse;

pub use annotation::Annotation;
pub use dispatcher::{DispatchReport, Dispatcher, DEFAULT_POST_DELAY};
pub use error::PostError;
pub use mpulse::{AuthorizedClient, MPulseClient, SecurityToken, DEFAULT_DASHBOARD_URL};

/// Receives annotations one at a time.
pub trait AnnotationSink {
    fn post(&mut self, annotation: &Annotation) -> Result<(), PostError>;
}

impl<T: AnnotationSink + ?Sized> AnnotationSink for &mut T {
    fn post(&mut self, annotation: &Annotation) -> Result<(), PostError> {
        (**self).post(annotation)
    }
}
