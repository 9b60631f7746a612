//! Three-pass enrichment pipeline
//!
//! Pass 1 streams the store and collects candidate identifiers. Pass 2
//! resolves each unique identifier against the metadata source with a
//! bounded worker pool, populating the run cache. Pass 3 re-streams the
//! store and rewrites it with the reconciled values. File passes are
//! sequential; only Pass 2 fans out.

use crate::config::EnrichConfig;
use crate::extract;
use crate::fetch::{FetchClient, FetchResolution, MetadataCache, MetadataSource, RateGate};
use crate::reconcile::ReconcileEngine;
use crate::rewrite::{self, RewriteSummary};
use crate::stats::{ProgressCallback, RunReport, RunStats};
use catmend_common::Result;
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct EnrichmentPipeline<S: MetadataSource> {
    client: Arc<FetchClient<S>>,
    cache: Arc<MetadataCache>,
    engine: ReconcileEngine,
    workers: usize,
    progress: Option<ProgressCallback>,
}

impl<S: MetadataSource + 'static> EnrichmentPipeline<S> {
    pub fn new(source: S, config: &EnrichConfig) -> Self {
        let gate = RateGate::new(config.min_request_interval());
        let client = FetchClient::new(source, gate, config.retry_policy());
        Self {
            client: Arc::new(client),
            cache: Arc::new(MetadataCache::new()),
            engine: ReconcileEngine::new(config.thresholds),
            workers: config.workers.max(1),
            progress: None,
        }
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Run all three passes. Cancellation stops new lookups and turns the
    /// remainder into a pass-through copy; the report carries a
    /// `cancelled` flag with the partial statistics.
    pub async fn run(
        &self,
        input: &Path,
        output: &Path,
        cancel: CancellationToken,
    ) -> Result<RunReport> {
        let mut stats = RunStats::new();

        // Pass 1: sequential identifier extraction
        let extraction = extract::extract_identifiers(input)?;
        stats.total_records = extraction.total_records;
        stats.candidate_records = extraction.candidate_records;
        stats.multi_identifier_warnings = extraction.multi_identifier_warnings;
        stats.invalid_identifier_syntax = extraction.invalid_identifier_syntax;

        // Document order keeps lookup logs aligned with the store.
        let mut identifiers: Vec<(String, u64)> =
            extraction.identifier_positions.into_iter().collect();
        identifiers.sort_by_key(|(_, ordinal)| *ordinal);
        let total = identifiers.len() as u64;
        info!(
            total_records = stats.total_records,
            unique_identifiers = total,
            "Extraction pass complete"
        );

        // Pass 2: bounded-concurrency fetch into the run cache
        let mut lookups = stream::iter(identifiers.into_iter().map(|(identifier, _)| {
            let client = Arc::clone(&self.client);
            let cache = Arc::clone(&self.cache);
            let cancel = cancel.clone();
            async move {
                if cancel.is_cancelled() {
                    return None;
                }
                if let Some(outcome) = cache.get(&identifier).await {
                    return Some(FetchResolution::Resolved { outcome, attempt: 0 });
                }
                let resolution = client.resolve(&identifier, &cancel).await;
                cache.insert_if_absent(&identifier, resolution.outcome()).await;
                Some(resolution)
            }
        }))
        .buffer_unordered(self.workers);

        while let Some(completed) = lookups.next().await {
            if let Some(resolution) = completed {
                stats.record_resolution(&resolution);
                if let Some(progress) = &self.progress {
                    progress(stats.snapshot(total));
                }
            }
        }
        drop(lookups);
        info!(
            processed = stats.processed,
            successful = stats.successful,
            not_found = stats.not_found,
            failed = stats.failed,
            cache_entries = self.cache.len().await,
            "Fetch pass complete"
        );

        // Pass 3: sequential rewrite from the cache snapshot
        let outcomes = self.cache.snapshot().await;
        let summary: RewriteSummary = rewrite::rewrite_stream(
            input,
            output,
            &outcomes,
            &self.engine,
            &mut stats,
            self.progress.as_ref(),
            total,
            &cancel,
        )?;
        debug_assert_eq!(summary.records_read, summary.records_written);

        let cancelled = cancel.is_cancelled();
        Ok(stats.into_report(cancelled))
    }
}
