//! Error types for event parsing and selector loading.

use std::path::PathBuf;

/// Errors raised while turning one raw JSON entry into a typed event.
///
/// A `ParseError` only ever concerns a single entry. Extraction logs it and
/// moves on to the next entry.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The payload did not have the documented JSON shape.
    #[error("malformed event payload: {0}")]
    Json(#[from] serde_json::Error),

    /// A required key/value pair was absent from the event data.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// A timestamp did not match the expected format.
    #[error("timestamp `{value}` in `{field}` does not match the expected format")]
    Timestamp {
        /// Name of the JSON field holding the timestamp.
        field: &'static str,
        /// The raw value that failed to parse.
        value: String,
    },
}

/// Errors raised while loading the selector table.
#[derive(Debug, thiserror::Error)]
pub enum SelectorError {
    /// The selector file could not be opened or read.
    #[error("failed to read selector file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The selector source could not be read.
    #[error("selector read error: {0}")]
    Io(#[from] std::io::Error),

    /// A row could not be decoded as CSV.
    #[error("malformed selector row at line {line}: {source}")]
    Csv {
        line: usize,
        #[source]
        source: csv::Error,
    },

    /// A row did not carry both the definition ID and the variant kind.
    #[error("selector row at line {line} has {found} column(s), expected at least 2")]
    MissingColumns { line: usize, found: usize },
}
