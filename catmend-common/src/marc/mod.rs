//! MARC21 record model and streaming MARC-XML I/O
//!
//! The record store is a MARCXML (`MARC21/slim`) collection of unbounded
//! size. The reader and writer are streaming: one record is materialized at
//! a time, independent of store size.

pub mod reader;
pub mod record;
pub mod writer;

pub use reader::RecordReader;
pub use record::{ControlField, DataField, Field, Record, Subfield};
pub use writer::RecordWriter;

use crate::Result;
use std::path::Path;

/// MARC21/slim XML namespace
pub const MARC_NAMESPACE: &str = "http://www.loc.gov/MARC21/slim";

/// Count total records and those matching `predicate` in a single streaming
/// pass over `path`.
pub fn count_matching<P>(path: &Path, mut predicate: P) -> Result<(u64, u64)>
where
    P: FnMut(&Record) -> bool,
{
    let mut reader = RecordReader::open(path)?;
    let mut total = 0u64;
    let mut matching = 0u64;

    while let Some(record) = reader.next_record()? {
        total += 1;
        if predicate(&record) {
            matching += 1;
        }
    }

    Ok((total, matching))
}
