//! Pass 3: streaming rewrite
//!
//! Re-streams the source store in document order and serializes every
//! record to the output, enriched where a cached lookup produced metadata.
//! One record is held in memory at a time; the outcome map is the only
//! structure that scales with the number of unique identifiers.

use crate::extract;
use crate::reconcile::{ReconcileEngine, FIELD_SPECS};
use crate::stats::{ProgressCallback, RunStats};
use crate::types::{Decision, FetchOutcome, FieldKey};
use catmend_common::marc::{RecordReader, RecordWriter};
use catmend_common::{Record, Result};
use std::collections::HashMap;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// What the rewrite pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RewriteSummary {
    pub records_read: u64,
    pub records_written: u64,
    pub records_modified: u64,
}

/// Rewrite `input` to `output`, applying reconciliation decisions for
/// records whose identifier has a cached `Found` outcome. Every other
/// record is serialized verbatim; output order and count always match the
/// input.
///
/// Cancellation is honored between records: once observed, the remaining
/// records pass through unmodified so the output store stays complete.
///
/// `progress` fires after every reconciled record, so skip counters that
/// only move during this pass reach the caller before the final report.
pub fn rewrite_stream(
    input: &Path,
    output: &Path,
    outcomes: &HashMap<String, FetchOutcome>,
    engine: &ReconcileEngine,
    stats: &mut RunStats,
    progress: Option<&ProgressCallback>,
    total: u64,
    cancel: &CancellationToken,
) -> Result<RewriteSummary> {
    let mut reader = RecordReader::open(input)?;
    let mut writer = RecordWriter::create(output)?;
    let mut summary = RewriteSummary::default();
    let mut cancelled_logged = false;

    while let Some(mut record) = reader.next_record()? {
        summary.records_read += 1;

        if cancel.is_cancelled() {
            if !cancelled_logged {
                info!(
                    records_done = summary.records_written,
                    "Cancellation observed, remaining records pass through unmodified"
                );
                cancelled_logged = true;
            }
        } else if let Some(meta) = lookup_metadata(&record, outcomes) {
            let verdict = engine.reconcile(&record, &meta);
            let applied = apply_decisions(&mut record, &verdict.decisions);
            if applied.iter().any(|(_, a)| *a) {
                summary.records_modified += 1;
            }
            stats.record_verdict(&verdict, &applied);
            if let Some(progress) = progress {
                progress(stats.snapshot(total));
            }
        }

        writer.write_record(&record)?;
        summary.records_written += 1;
    }

    writer.finish()?;
    info!(
        read = summary.records_read,
        written = summary.records_written,
        modified = summary.records_modified,
        "Rewrite pass complete"
    );
    Ok(summary)
}

/// Cached metadata for this record's single identifier, if any.
fn lookup_metadata(
    record: &Record,
    outcomes: &HashMap<String, FetchOutcome>,
) -> Option<crate::types::MetadataRecord> {
    let identifier = extract::single_identifier(record).ok()?;
    match outcomes.get(&identifier) {
        Some(FetchOutcome::Found(meta)) => Some(meta.clone()),
        _ => None,
    }
}

/// Apply every mutating decision in place. A decision whose target
/// subfield slot does not exist is skipped; the slot is never synthesized.
fn apply_decisions(
    record: &mut Record,
    decisions: &[(FieldKey, Decision)],
) -> Vec<(FieldKey, bool)> {
    decisions
        .iter()
        .map(|(key, decision)| {
            let applied = match decision.new_value() {
                Some(new_value) => {
                    let spec = FIELD_SPECS
                        .iter()
                        .find(|s| s.key == *key)
                        .copied();
                    match spec {
                        Some(spec) => {
                            let written = spec.apply_value(record, new_value);
                            if written {
                                debug!(field = key.as_str(), value = new_value, "Subfield rewritten");
                            } else {
                                debug!(
                                    field = key.as_str(),
                                    "No subfield slot for decision, left unchanged"
                                );
                            }
                            written
                        }
                        None => false,
                    }
                }
                None => false,
            };
            (*key, applied)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::Thresholds;
    use crate::types::MetadataRecord;
    use catmend_common::{DataField, Field, Subfield};

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<collection xmlns="http://www.loc.gov/MARC21/slim">
  <record>
    <controlfield tag="001">1</controlfield>
    <datafield tag="020" ind1=" " ind2=" ">
      <subfield code="a">3453350618</subfield>
    </datafield>
    <datafield tag="245" ind1="0" ind2="0">
      <subfield code="a">Das Lied von Eis und Feuer</subfield>
    </datafield>
    <datafield tag="260" ind1=" " ind2=" ">
      <subfield code="b"></subfield>
    </datafield>
  </record>
  <record>
    <controlfield tag="001">2</controlfield>
    <datafield tag="245" ind1="0" ind2="0">
      <subfield code="a">Ohne Identifikator</subfield>
    </datafield>
  </record>
</collection>
"#;

    fn found(meta: MetadataRecord) -> HashMap<String, FetchOutcome> {
        let mut map = HashMap::new();
        map.insert("3453350618".to_string(), FetchOutcome::Found(meta));
        map
    }

    #[test]
    fn test_rewrite_fills_and_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.xml");
        let output = dir.path().join("out.xml");
        std::fs::write(&input, SAMPLE).unwrap();

        let outcomes = found(MetadataRecord {
            title: Some("Das Lied von Eis und Feuer".to_string()),
            publisher: Some("Blanvalet".to_string()),
            ..Default::default()
        });
        let engine = ReconcileEngine::new(Thresholds::default());
        let mut stats = RunStats::new();
        let summary = rewrite_stream(
            &input,
            &output,
            &outcomes,
            &engine,
            &mut stats,
            None,
            1,
            &CancellationToken::new(),
        )
        .unwrap();

        assert_eq!(summary.records_read, 2);
        assert_eq!(summary.records_written, 2);
        assert_eq!(summary.records_modified, 1);

        let mut reader = RecordReader::open(&output).unwrap();
        let first = reader.next_record().unwrap().unwrap();
        assert_eq!(first.control_value("001"), Some("1"));
        assert_eq!(first.first_subfield("260", 'b'), Some("Blanvalet"));
        let second = reader.next_record().unwrap().unwrap();
        assert_eq!(second.control_value("001"), Some("2"));
        assert_eq!(second.first_subfield("245", 'a'), Some("Ohne Identifikator"));
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn test_cancelled_pass_copies_records_through() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.xml");
        let output = dir.path().join("out.xml");
        std::fs::write(&input, SAMPLE).unwrap();

        let outcomes = found(MetadataRecord {
            publisher: Some("Blanvalet".to_string()),
            ..Default::default()
        });
        let engine = ReconcileEngine::new(Thresholds::default());
        let mut stats = RunStats::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let summary =
            rewrite_stream(&input, &output, &outcomes, &engine, &mut stats, None, 1, &cancel)
                .unwrap();

        assert_eq!(summary.records_written, 2);
        assert_eq!(summary.records_modified, 0);

        let mut reader = RecordReader::open(&output).unwrap();
        let first = reader.next_record().unwrap().unwrap();
        assert_eq!(first.first_subfield("260", 'b'), None);
    }

    #[test]
    fn test_missing_slot_downgrades_to_unchanged() {
        let mut record = Record {
            leader: None,
            fields: vec![Field::Data(DataField {
                tag: "245".to_string(),
                ind1: "0".to_string(),
                ind2: "0".to_string(),
                subfields: vec![Subfield {
                    code: 'a',
                    value: "Titel".to_string(),
                }],
            })],
        };
        let decisions = vec![(FieldKey::Year, Decision::Filled("1999".to_string()))];
        let applied = apply_decisions(&mut record, &decisions);
        assert_eq!(applied, vec![(FieldKey::Year, false)]);
        // record untouched
        assert_eq!(record.fields.len(), 1);
    }
}
