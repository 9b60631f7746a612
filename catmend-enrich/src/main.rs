//! catmend - catalog metadata reconciliation
//!
//! Subcommands:
//! - `enrich`: three-pass enrichment of a MARC21 store against the
//!   metadata source, writing an enriched copy and an optional JSON report
//! - `audit`: read-only identifier check of a store
//! - `count`: offline record counts

use anyhow::{Context, Result};
use catmend_common::marc::count_matching;
use catmend_enrich::audit;
use catmend_enrich::config::EnrichConfig;
use catmend_enrich::extract::{IDENTIFIER_CODE, IDENTIFIER_TAG};
use catmend_enrich::fetch::{FetchClient, GoogleBooksClient, RateGate};
use catmend_enrich::pipeline::EnrichmentPipeline;
use catmend_enrich::stats::ProgressSnapshot;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "catmend", version, about = "Catalog metadata reconciliation")]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, env = "CATMEND_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Enrich a store and write the result to a new file
    Enrich {
        /// Source MARC21 XML file
        input: PathBuf,
        /// Enriched output file
        output: PathBuf,
        /// Write the run report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
        /// Concurrent fetch workers (overrides the config file)
        #[arg(long, env = "CATMEND_WORKERS")]
        workers: Option<usize>,
        /// Minimum milliseconds between requests (overrides the config file)
        #[arg(long, env = "CATMEND_INTERVAL_MS")]
        interval_ms: Option<u64>,
    },
    /// Check identifier syntax and existence without modifying the store
    Audit {
        /// Source MARC21 XML file
        input: PathBuf,
        /// Concurrent fetch workers (overrides the config file)
        #[arg(long, env = "CATMEND_WORKERS")]
        workers: Option<usize>,
    },
    /// Count records, offline: total, with identifier, with language code
    Count {
        /// Source MARC21 XML file
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let mut config = EnrichConfig::load(cli.config.as_deref())
        .context("Failed to load configuration")?;

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing in-flight work");
            ctrl_c_token.cancel();
        }
    });

    match cli.command {
        Command::Enrich {
            input,
            output,
            report,
            workers,
            interval_ms,
        } => {
            if let Some(workers) = workers {
                config.workers = workers;
            }
            if let Some(interval_ms) = interval_ms {
                config.min_request_interval_ms = interval_ms;
            }
            info!(
                input = %input.display(),
                output = %output.display(),
                workers = config.workers,
                "Starting enrichment"
            );

            let source = GoogleBooksClient::new(&config.user_agent, config.request_timeout())
                .context("Failed to build metadata source client")?;
            let pipeline = EnrichmentPipeline::new(source, &config)
                .with_progress(Arc::new(log_progress));

            let run_report = pipeline.run(&input, &output, cancel).await?;

            if let Some(path) = report {
                run_report.write_json(&path)?;
            }
            info!(
                processed = run_report.processed,
                successful = run_report.successful,
                not_found = run_report.not_found,
                failed = run_report.failed,
                conflicts_skipped = run_report.conflicts_skipped,
                success_rate = %format!("{:.1}%", run_report.success_rate() * 100.0),
                elapsed_secs = %format!("{:.1}", run_report.elapsed_secs),
                throughput = %format!("{:.1}/s", run_report.throughput()),
                "Enrichment finished"
            );
            if run_report.cancelled {
                warn!("Run was cancelled; the output is a partial enrichment");
            }
        }
        Command::Audit { input, workers } => {
            if let Some(workers) = workers {
                config.workers = workers;
            }
            info!(input = %input.display(), "Starting audit");

            let source = GoogleBooksClient::new(&config.user_agent, config.request_timeout())
                .context("Failed to build metadata source client")?;
            let client = Arc::new(FetchClient::new(
                source,
                RateGate::new(config.min_request_interval()),
                config.retry_policy(),
            ));

            let report = audit::audit_store(&input, client, config.workers, cancel).await?;

            if report.all_correct() {
                info!(
                    records = report.records_with_identifier,
                    "All records with identifiers are correct"
                );
            } else {
                error!(
                    records = report.records_with_identifier,
                    invalid_syntax = report.invalid_syntax,
                    unknown_to_source = report.unknown_to_source,
                    "Audit found problems"
                );
            }
        }
        Command::Count { input } => {
            let (total, with_identifier) = count_matching(&input, |r| {
                !r.subfield_values(IDENTIFIER_TAG, IDENTIFIER_CODE)
                    .is_empty()
            })?;
            let (_, with_language) = count_matching(&input, |r| r.language_code().is_some())?;
            info!(total, with_identifier, with_language, "Store counts");
        }
    }

    Ok(())
}

/// Progress hook for the enrichment pass; logs every 50 identifiers and at
/// the end.
fn log_progress(snapshot: ProgressSnapshot) {
    if snapshot.processed % 50 == 0 || snapshot.processed == snapshot.total {
        info!(
            processed = snapshot.processed,
            total = snapshot.total,
            successful = snapshot.successful,
            not_found = snapshot.not_found,
            failed = snapshot.failed,
            "Lookup progress"
        );
    }
}
