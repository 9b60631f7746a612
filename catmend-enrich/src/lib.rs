//! catmend-enrich - Metadata Reconciliation Pipeline
//!
//! Reconciles the descriptive fields of a MARC21 catalog (title, authors,
//! publisher, year) against an authoritative external metadata source keyed
//! by ISBN, in three streaming passes:
//!
//! 1. Identifier extraction (sequential, bounded memory)
//! 2. Rate-limited, cached, concurrent metadata fetch
//! 3. Streaming rewrite of the full store in original order

pub mod audit;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod isbn;
pub mod pipeline;
pub mod reconcile;
pub mod rewrite;
pub mod stats;
pub mod types;

pub use config::EnrichConfig;
pub use error::{FetchError, FetchErrorKind};
pub use pipeline::EnrichmentPipeline;
pub use stats::{FieldStats, ProgressSnapshot, RunReport};
pub use types::{Decision, FetchOutcome, FieldKey, MetadataRecord};
