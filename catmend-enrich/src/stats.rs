//! Run statistics and reporting
//!
//! Counters are accumulated single-threaded (the pipeline folds worker
//! results in one place), snapshotted for progress reporting, and frozen
//! into a serializable [`RunReport`] at the end of the run. The JSON form
//! of the report is the handoff to external stats tooling.

use crate::fetch::FetchResolution;
use crate::reconcile::RecordVerdict;
use crate::types::{Decision, FetchOutcome, FieldKey};
use catmend_common::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Per-field breakdown of what reconciliation saw and did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FieldStats {
    pub empty_before: u64,
    pub filled_after: u64,
    pub had_abbreviation: u64,
    pub abbreviation_replaced: u64,
    pub potentially_incorrect: u64,
    pub corrected: u64,
    pub conflicts: u64,
}

/// Point-in-time progress, cheap to copy into a callback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub processed: u64,
    pub successful: u64,
    pub failed: u64,
    pub not_found: u64,
    pub conflicts_skipped: u64,
    pub retry_buckets: BTreeMap<u32, u64>,
    pub total: u64,
}

/// Non-blocking progress hook, invoked once per completed identifier.
pub type ProgressCallback = std::sync::Arc<dyn Fn(ProgressSnapshot) + Send + Sync>;

/// Mutable accumulator for one run.
#[derive(Debug)]
pub struct RunStats {
    pub total_records: u64,
    pub candidate_records: u64,
    pub multi_identifier_warnings: u64,
    pub invalid_identifier_syntax: u64,
    pub processed: u64,
    pub successful: u64,
    pub failed: u64,
    pub not_found: u64,
    pub conflicts_skipped: u64,
    pub retry_buckets: BTreeMap<u32, u64>,
    pub field_stats: BTreeMap<FieldKey, FieldStats>,
    started: Instant,
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            total_records: 0,
            candidate_records: 0,
            multi_identifier_warnings: 0,
            invalid_identifier_syntax: 0,
            processed: 0,
            successful: 0,
            failed: 0,
            not_found: 0,
            conflicts_skipped: 0,
            retry_buckets: BTreeMap::new(),
            field_stats: FieldKey::ALL.iter().map(|k| (*k, FieldStats::default())).collect(),
            started: Instant::now(),
        }
    }

    /// Account one settled identifier lookup.
    pub fn record_resolution(&mut self, resolution: &FetchResolution) {
        self.processed += 1;
        *self
            .retry_buckets
            .entry(resolution.attempt_bucket())
            .or_insert(0) += 1;
        match resolution.outcome() {
            FetchOutcome::Found(_) => self.successful += 1,
            FetchOutcome::NotFound => self.not_found += 1,
            FetchOutcome::TransientError(_) | FetchOutcome::PermanentError => self.failed += 1,
        }
    }

    /// Account one reconciled record. `applied` tells, per field, whether
    /// the decision's replacement actually landed in a subfield (a missing
    /// slot downgrades a write to no-op).
    pub fn record_verdict(&mut self, verdict: &RecordVerdict, applied: &[(FieldKey, bool)]) {
        if verdict.conflict_skipped {
            self.conflicts_skipped += 1;
        }
        for (key, decision) in &verdict.decisions {
            let was_applied = applied
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, a)| *a)
                .unwrap_or(false);
            let stats = self.field_stats.entry(*key).or_default();
            match decision {
                Decision::Unchanged => {}
                Decision::Filled(_) => {
                    stats.empty_before += 1;
                    if was_applied {
                        stats.filled_after += 1;
                    }
                }
                Decision::AbbreviationExpanded { .. } => {
                    stats.had_abbreviation += 1;
                    if was_applied {
                        stats.abbreviation_replaced += 1;
                    }
                }
                Decision::Corrected { .. } => {
                    stats.potentially_incorrect += 1;
                    if was_applied {
                        stats.corrected += 1;
                    }
                }
                Decision::ConflictSkipped => {
                    stats.conflicts += 1;
                }
            }
        }
    }

    pub fn snapshot(&self, total: u64) -> ProgressSnapshot {
        ProgressSnapshot {
            processed: self.processed,
            successful: self.successful,
            failed: self.failed,
            not_found: self.not_found,
            conflicts_skipped: self.conflicts_skipped,
            retry_buckets: self.retry_buckets.clone(),
            total,
        }
    }

    /// Freeze into the final report.
    pub fn into_report(self, cancelled: bool) -> RunReport {
        let elapsed_secs = self.started.elapsed().as_secs_f64();
        RunReport {
            total_records: self.total_records,
            candidate_records: self.candidate_records,
            processed: self.processed,
            successful: self.successful,
            failed: self.failed,
            not_found: self.not_found,
            conflicts_skipped: self.conflicts_skipped,
            multi_identifier_warnings: self.multi_identifier_warnings,
            invalid_identifier_syntax: self.invalid_identifier_syntax,
            retry_buckets: self.retry_buckets,
            field_stats: self.field_stats,
            cancelled,
            elapsed_secs,
            generated_at: Utc::now(),
        }
    }
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable end-of-run report.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub total_records: u64,
    pub candidate_records: u64,
    pub processed: u64,
    pub successful: u64,
    pub failed: u64,
    pub not_found: u64,
    pub conflicts_skipped: u64,
    pub multi_identifier_warnings: u64,
    pub invalid_identifier_syntax: u64,
    pub retry_buckets: BTreeMap<u32, u64>,
    pub field_stats: BTreeMap<FieldKey, FieldStats>,
    pub cancelled: bool,
    pub elapsed_secs: f64,
    pub generated_at: DateTime<Utc>,
}

impl RunReport {
    /// Fraction of processed identifiers that produced metadata.
    pub fn success_rate(&self) -> f64 {
        if self.processed == 0 {
            0.0
        } else {
            self.successful as f64 / self.processed as f64
        }
    }

    /// Processed identifiers per second over the whole run.
    pub fn throughput(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            0.0
        } else {
            self.processed as f64 / self.elapsed_secs
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Internal(format!("Failed to serialize report: {}", e)))?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "Run report written");
        Ok(())
    }
}
