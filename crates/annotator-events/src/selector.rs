//! The selector table: which event definitions to annotate, and how.
//!
//! The selector file is a small CSV with three columns:
//!
//! ```text
//! # definition id, variant kind, criteria
//! 229233,FastPurgeByCPCodeEvent,12345;67890
//! 238252,PropertyActivationEvent,www.example.com
//! 000001,EnhancedContentControlEvent,
//! ```
//!
//! Everything after a `#` is a comment. Blank lines are ignored. Rows naming
//! an unknown variant kind create no entry; they are logged and counted so
//! that a misspelt kind does not go unnoticed.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde_json::Value;

use crate::error::{ParseError, SelectorError};
use crate::event::{Event, EventKind, TimelineEvent};
use crate::Criteria;

/// Definition ID under which content-control requests are classified.
///
/// The content-control API carries no definition of its own, so every
/// request is looked up under this fixed key.
pub const CONTENT_CONTROL_DEFINITION_ID: &str = "000001";

/// What to build for one event definition and how to filter it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorEntry {
    pub kind: EventKind,
    pub criteria: Criteria,
}

impl SelectorEntry {
    /// Builds the configured record for `raw` and tests it against the
    /// criteria.
    ///
    /// Returns `Ok(None)` when the record parses but does not match.
    pub fn select(&self, raw: &Value) -> Result<Option<Event>, ParseError> {
        let event = self.kind.construct(raw)?;
        Ok(event.matches_criteria(&self.criteria).then_some(event))
    }
}

/// Mapping from event-definition ID to [`SelectorEntry`].
#[derive(Debug, Clone, Default)]
pub struct SelectorTable {
    entries: HashMap<String, SelectorEntry>,
    unrecognized: Vec<String>,
}

impl SelectorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a selector file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError`] when the file cannot be read or a row is
    /// malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SelectorError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| SelectorError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_reader(file)?;
        tracing::info!(
            path = %path.display(),
            entries = table.len(),
            unrecognized = table.unrecognized.len(),
            "loaded events selector"
        );
        Ok(table)
    }

    /// Parses selector rows from any reader.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, SelectorError> {
        let mut contents = String::new();
        reader.read_to_string(&mut contents)?;

        let mut table = Self::new();
        for (index, line) in contents.lines().enumerate() {
            let line_no = index + 1;
            let content = decomment(line);
            if content.is_empty() {
                continue;
            }

            let record = parse_row(content, line_no)?;
            if record.len() < 2 {
                return Err(SelectorError::MissingColumns {
                    line: line_no,
                    found: record.len(),
                });
            }

            let definition_id = &record[0];
            let kind_name = &record[1];
            let criteria = record.get(2).unwrap_or("");

            match kind_name.parse::<EventKind>() {
                Ok(kind) => {
                    if let Some(previous) = table.insert(definition_id, kind, criteria) {
                        tracing::warn!(
                            line = line_no,
                            definition_id,
                            replaced = %previous.kind,
                            "duplicate definition id in selector, last row wins"
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!(line = line_no, definition_id, error = %e, "skipping selector row");
                    table.unrecognized.push(kind_name.to_string());
                }
            }
        }
        Ok(table)
    }

    /// Registers an entry, returning the one it replaced.
    pub fn insert(
        &mut self,
        definition_id: impl Into<String>,
        kind: EventKind,
        criteria: &str,
    ) -> Option<SelectorEntry> {
        self.entries.insert(
            definition_id.into(),
            SelectorEntry {
                kind,
                criteria: Criteria::parse(criteria),
            },
        )
    }

    pub fn get(&self, definition_id: &str) -> Option<&SelectorEntry> {
        self.entries.get(definition_id)
    }

    /// The entry used for content-control requests, if configured.
    pub fn content_control(&self) -> Option<&SelectorEntry> {
        self.get(CONTENT_CONTROL_DEFINITION_ID)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Kind names from rows that were skipped because the kind is unknown.
    pub fn unrecognized_kinds(&self) -> &[String] {
        &self.unrecognized
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SelectorEntry)> {
        self.entries.iter().map(|(id, entry)| (id.as_str(), entry))
    }
}

fn decomment(line: &str) -> &str {
    line.split('#').next().unwrap_or("").trim()
}

fn parse_row(content: &str, line: usize) -> Result<csv::StringRecord, SelectorError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    match reader.records().next() {
        Some(record) => record.map_err(|source| SelectorError::Csv { line, source }),
        None => Ok(csv::StringRecord::new()),
    }
}
