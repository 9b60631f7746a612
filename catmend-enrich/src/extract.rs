//! Pass 1: identifier extraction
//!
//! Streams the source store once in document order and collects, per
//! record, the identifier subfield values (tag 020, code `a`). A record
//! qualifies for enrichment only when it carries exactly one identifier of
//! valid syntax; records with several identifiers are counted as warnings
//! and excluded, invalid syntax is counted and excluded. Each record is
//! released before the next one is read.

use catmend_common::marc::RecordReader;
use catmend_common::{Record, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::isbn;

/// Tag and subfield code carrying the book identifier.
pub const IDENTIFIER_TAG: &str = "020";
pub const IDENTIFIER_CODE: char = 'a';

/// Result of the extraction pass.
#[derive(Debug, Default)]
pub struct ExtractOutcome {
    /// Total records seen in the store.
    pub total_records: u64,
    /// Records that qualified for enrichment (exactly one valid identifier).
    pub candidate_records: u64,
    /// Records excluded for exposing more than one identifier subfield.
    pub multi_identifier_warnings: u64,
    /// Records excluded for a single identifier of invalid syntax.
    pub invalid_identifier_syntax: u64,
    /// Normalized identifier -> first-seen record ordinal (0-based).
    pub identifier_positions: HashMap<String, u64>,
}

/// The single candidate identifier of a record, if it has exactly one.
///
/// Returns `Err(count)` when the record exposes zero or several candidates;
/// the caller decides how to count the routing.
pub fn single_identifier(record: &Record) -> std::result::Result<String, usize> {
    let candidates = record.subfield_values(IDENTIFIER_TAG, IDENTIFIER_CODE);
    match candidates.len() {
        1 => Ok(isbn::normalize(candidates[0])),
        n => Err(n),
    }
}

/// Stream `path` once and build the identifier map.
pub fn extract_identifiers(path: &Path) -> Result<ExtractOutcome> {
    let mut reader = RecordReader::open(path)?;
    let mut outcome = ExtractOutcome::default();

    while let Some(record) = reader.next_record()? {
        let ordinal = outcome.total_records;
        outcome.total_records += 1;

        match single_identifier(&record) {
            Ok(normalized) => {
                if isbn::is_valid(&normalized) {
                    outcome.candidate_records += 1;
                    // First-seen wins; later duplicates reuse the cached
                    // metadata in Pass 3.
                    outcome
                        .identifier_positions
                        .entry(normalized)
                        .or_insert(ordinal);
                } else {
                    outcome.invalid_identifier_syntax += 1;
                    debug!(
                        record = ordinal,
                        identifier = %normalized,
                        "Identifier with invalid syntax, record excluded from enrichment"
                    );
                }
            }
            Err(0) => {}
            Err(_) => {
                outcome.multi_identifier_warnings += 1;
                warn!(
                    record = ordinal,
                    id = record.control_value("001").unwrap_or("?"),
                    "Record with multiple identifiers skipped"
                );
            }
        }
    }

    info!(
        total = outcome.total_records,
        candidates = outcome.candidate_records,
        unique_identifiers = outcome.identifier_positions.len(),
        multi_identifier = outcome.multi_identifier_warnings,
        invalid_syntax = outcome.invalid_identifier_syntax,
        "Identifier extraction complete"
    );

    Ok(outcome)
}
