//! Identifier audit
//!
//! Read-only check of a store: how many records carry identifiers, how
//! many of those are syntactically broken, and how many reference
//! identifiers the external source does not know. Unlike enrichment, the
//! audit considers every identifier subfield, including records with
//! several.

use crate::extract::{IDENTIFIER_CODE, IDENTIFIER_TAG};
use crate::fetch::{FetchClient, MetadataSource};
use crate::isbn;
use crate::types::FetchOutcome;
use catmend_common::marc::RecordReader;
use catmend_common::{Record, Result};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Default, Clone, Serialize)]
pub struct AuditReport {
    /// Records carrying at least one identifier subfield.
    pub records_with_identifier: u64,
    /// Records with at least one syntactically invalid identifier.
    pub invalid_syntax: u64,
    /// Records whose valid identifiers include one the source does not
    /// know (only counted for records whose syntax is fully valid).
    pub unknown_to_source: u64,
    /// Distinct syntactically valid identifiers seen.
    pub unique_valid: u64,
    pub cancelled: bool,
}

impl AuditReport {
    pub fn all_correct(&self) -> bool {
        self.invalid_syntax == 0 && self.unknown_to_source == 0
    }
}

/// Identifier values of one record, split into valid (normalized) and a
/// syntax flag.
fn record_identifiers(record: &Record) -> (Vec<String>, bool) {
    let mut valid = Vec::new();
    let mut syntax_ok = true;
    for raw in record.subfield_values(IDENTIFIER_TAG, IDENTIFIER_CODE) {
        let normalized = isbn::normalize(raw);
        if isbn::is_valid(&normalized) {
            valid.push(normalized);
        } else {
            syntax_ok = false;
        }
    }
    (valid, syntax_ok)
}

/// Audit `input` against the metadata source.
///
/// Two streaming passes: the first collects all unique valid identifiers,
/// which are then checked for existence concurrently; the second counts
/// the records referencing unknown identifiers. Identifiers left unchecked
/// after a cancellation are treated as known, so a cancelled audit never
/// reports false unknowns.
pub async fn audit_store<S: MetadataSource + 'static>(
    input: &Path,
    client: Arc<FetchClient<S>>,
    workers: usize,
    cancel: CancellationToken,
) -> Result<AuditReport> {
    let mut report = AuditReport::default();

    // First pass: collect unique valid identifiers
    let mut unique_valid: HashSet<String> = HashSet::new();
    let mut reader = RecordReader::open(input)?;
    while let Some(record) = reader.next_record()? {
        let (valid, syntax_ok) = record_identifiers(&record);
        if valid.is_empty() && syntax_ok {
            continue;
        }
        report.records_with_identifier += 1;
        if !syntax_ok {
            report.invalid_syntax += 1;
        }
        unique_valid.extend(valid);
    }
    report.unique_valid = unique_valid.len() as u64;
    info!(
        records = report.records_with_identifier,
        unique_identifiers = report.unique_valid,
        "Audit extraction complete, checking against source"
    );

    // Existence checks, bounded concurrency
    let known: HashMap<String, bool> = stream::iter(unique_valid.into_iter().map(|identifier| {
        let client = Arc::clone(&client);
        let cancel = cancel.clone();
        async move {
            if cancel.is_cancelled() {
                return (identifier, true);
            }
            let exists = matches!(
                client.resolve(&identifier, &cancel).await.outcome(),
                FetchOutcome::Found(_)
            );
            (identifier, exists)
        }
    }))
    .buffer_unordered(workers.max(1))
    .collect()
    .await;

    // Second pass: count records referencing unknown identifiers
    let mut reader = RecordReader::open(input)?;
    while let Some(record) = reader.next_record()? {
        let (valid, syntax_ok) = record_identifiers(&record);
        if valid.is_empty() && syntax_ok {
            continue;
        }
        if syntax_ok && valid.iter().any(|i| !known.get(i).copied().unwrap_or(false)) {
            report.unknown_to_source += 1;
        }
    }

    report.cancelled = cancel.is_cancelled();
    info!(
        invalid_syntax = report.invalid_syntax,
        unknown = report.unknown_to_source,
        "Audit complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use catmend_common::{DataField, Field, Subfield};

    fn record_with_identifiers(values: &[&str]) -> Record {
        Record {
            leader: None,
            fields: vec![Field::Data(DataField {
                tag: "020".to_string(),
                ind1: " ".to_string(),
                ind2: " ".to_string(),
                subfields: values
                    .iter()
                    .map(|v| Subfield {
                        code: 'a',
                        value: v.to_string(),
                    })
                    .collect(),
            })],
        }
    }

    #[test]
    fn test_record_identifiers_splits_valid_and_invalid() {
        let record = record_with_identifiers(&["3-453-35061-8", "1234567890"]);
        let (valid, syntax_ok) = record_identifiers(&record);
        assert_eq!(valid, vec!["3453350618".to_string()]);
        assert!(!syntax_ok);
    }

    #[test]
    fn test_record_without_identifiers() {
        let record = record_with_identifiers(&[]);
        let (valid, syntax_ok) = record_identifiers(&record);
        assert!(valid.is_empty());
        assert!(syntax_ok);
    }
}
