//! Reconciliation of record fields against fetched metadata

pub mod author;
pub mod engine;
pub mod fields;
pub mod similarity;

pub use author::{compare_author, AuthorComparison};
pub use engine::{ReconcileEngine, RecordVerdict, Thresholds};
pub use fields::{FieldSpec, FIELD_SPECS};
pub use similarity::{is_abbreviation, similarity};
