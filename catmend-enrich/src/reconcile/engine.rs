//! Per-record reconciliation engine
//!
//! Produces a decision per field key by comparing the record's current
//! values against the fetched metadata. A record whose comparable fields
//! disagree too broadly is assumed to describe a different publication
//! (wrong identifier on the record) and is skipped wholesale rather than
//! "corrected" into the wrong book.

use crate::reconcile::author::{compare_author, AuthorComparison};
use crate::reconcile::fields::{FieldSpec, FIELD_SPECS};
use crate::reconcile::similarity::{is_abbreviation, similarity};
use crate::types::{Decision, FieldKey, MetadataRecord};
use catmend_common::Record;
use serde::Deserialize;
use tracing::debug;

/// Similarity cut-offs, all in `[0, 1]`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Below this a comparable field pair counts as a conflict.
    pub conflict: f64,
    /// Corrections apply only inside the open interval
    /// (`correction_low`, `correction_high`).
    pub correction_low: f64,
    pub correction_high: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            conflict: 0.4,
            correction_low: 0.6,
            correction_high: 0.7,
        }
    }
}

/// All decisions for one record, plus the conflict-check outcome.
#[derive(Debug, Clone)]
pub struct RecordVerdict {
    pub decisions: Vec<(FieldKey, Decision)>,
    pub conflict_skipped: bool,
    pub comparable: usize,
}

impl RecordVerdict {
    pub fn has_changes(&self) -> bool {
        self.decisions.iter().any(|(_, d)| d.new_value().is_some())
    }
}

pub struct ReconcileEngine {
    thresholds: Thresholds,
}

impl ReconcileEngine {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// Decide what to do with each field of `record` given `meta`.
    pub fn reconcile(&self, record: &Record, meta: &MetadataRecord) -> RecordVerdict {
        let pairs: Vec<(FieldSpec, Option<String>, Option<String>)> = FIELD_SPECS
            .iter()
            .map(|spec| {
                (
                    *spec,
                    spec.extract_value(record),
                    meta.value_for(spec.key),
                )
            })
            .collect();

        let comparable: Vec<&(FieldSpec, Option<String>, Option<String>)> = pairs
            .iter()
            .filter(|(_, existing, incoming)| existing.is_some() && incoming.is_some())
            .collect();

        let conflicts = comparable
            .iter()
            .filter(|(spec, existing, incoming)| {
                // both sides present by construction
                let (Some(existing), Some(incoming)) = (existing, incoming) else {
                    return false;
                };
                self.is_conflict(spec.key, existing, incoming)
            })
            .count();

        // Majority disagreement: leave the whole record alone.
        if conflicts * 2 > comparable.len() {
            debug!(
                conflicts,
                comparable = comparable.len(),
                "Record skipped, metadata disagrees with too many fields"
            );
            let decisions = pairs
                .iter()
                .map(|(spec, existing, incoming)| {
                    let decision = if existing.is_some() && incoming.is_some() {
                        Decision::ConflictSkipped
                    } else {
                        Decision::Unchanged
                    };
                    (spec.key, decision)
                })
                .collect();
            return RecordVerdict {
                decisions,
                conflict_skipped: true,
                comparable: comparable.len(),
            };
        }

        let decisions = pairs
            .iter()
            .map(|(spec, existing, incoming)| {
                (
                    spec.key,
                    self.decide(spec.key, existing.as_deref(), incoming.as_deref()),
                )
            })
            .collect();

        RecordVerdict {
            decisions,
            conflict_skipped: false,
            comparable: comparable.len(),
        }
    }

    /// Whether a comparable field pair disagrees hard enough to count as a
    /// conflict. Abbreviations and author-format differences are expected
    /// and never conflicts.
    fn is_conflict(&self, key: FieldKey, existing: &str, incoming: &str) -> bool {
        if existing.to_lowercase() == incoming.to_lowercase() {
            return false;
        }
        // Author values only compare through the name-aware form; a raw
        // trailing-dot check would relate any abbreviated name to any
        // source author.
        if key == FieldKey::Authors {
            return compare_author(existing, incoming) == AuthorComparison::Unrelated
                && similarity(existing, incoming) < self.thresholds.conflict;
        }
        if is_abbreviation(existing, incoming) {
            return false;
        }
        similarity(existing, incoming) < self.thresholds.conflict
    }

    /// Per-field decision ladder for a record that passed the conflict
    /// check.
    fn decide(&self, key: FieldKey, existing: Option<&str>, incoming: Option<&str>) -> Decision {
        let Some(incoming) = incoming else {
            return Decision::Unchanged;
        };
        let Some(existing) = existing else {
            return Decision::Filled(incoming.to_string());
        };
        if existing.to_lowercase() == incoming.to_lowercase() {
            return Decision::Unchanged;
        }

        if key == FieldKey::Authors {
            match compare_author(existing, incoming) {
                AuthorComparison::Complete => return Decision::Unchanged,
                AuthorComparison::Expand(new) | AuthorComparison::Restructure(new) => {
                    return Decision::AbbreviationExpanded {
                        old: existing.to_string(),
                        new,
                    };
                }
                // unrelated names never take the raw abbreviation branch
                AuthorComparison::Unrelated => return self.correction(existing, incoming),
            }
        }

        if is_abbreviation(existing, incoming) {
            return Decision::AbbreviationExpanded {
                old: existing.to_string(),
                new: incoming.to_string(),
            };
        }

        self.correction(existing, incoming)
    }

    /// Correction window: replace only when the values are close enough to
    /// be a typo but not close enough to be a variant spelling.
    fn correction(&self, existing: &str, incoming: &str) -> Decision {
        let score = similarity(existing, incoming);
        if score > self.thresholds.correction_low && score < self.thresholds.correction_high {
            return Decision::Corrected {
                old: existing.to_string(),
                new: incoming.to_string(),
                similarity: score,
            };
        }
        Decision::Unchanged
    }
}
