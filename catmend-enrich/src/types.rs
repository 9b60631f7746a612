//! Core pipeline types

use crate::error::FetchErrorKind;
use serde::{Deserialize, Serialize};

/// The closed set of reconciled field keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FieldKey {
    Title,
    Authors,
    Publisher,
    Year,
}

impl FieldKey {
    pub const ALL: [FieldKey; 4] = [
        FieldKey::Title,
        FieldKey::Authors,
        FieldKey::Publisher,
        FieldKey::Year,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::Title => "Title",
            FieldKey::Authors => "Authors",
            FieldKey::Publisher => "Publisher",
            FieldKey::Year => "Year",
        }
    }
}

/// Canonical metadata for one identifier, as returned by the external
/// source. Absent/empty means "the source has no opinion" - never failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub publisher: Option<String>,
    pub year: Option<String>,
}

impl MetadataRecord {
    /// Value for a field key; the author list denormalizes to a joined
    /// string before comparison, matching the source's display convention.
    pub fn value_for(&self, key: FieldKey) -> Option<String> {
        let value = match key {
            FieldKey::Title => self.title.clone(),
            FieldKey::Authors => {
                if self.authors.is_empty() {
                    None
                } else {
                    Some(self.authors.join(", "))
                }
            }
            FieldKey::Publisher => self.publisher.clone(),
            FieldKey::Year => self.year.clone(),
        };
        value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        FieldKey::ALL.iter().all(|k| self.value_for(*k).is_none())
    }
}

/// Outcome of a metadata lookup for one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The source returned metadata.
    Found(MetadataRecord),
    /// The source explicitly said "no result".
    NotFound,
    /// Retries were cut short (cancellation) with a transient failure
    /// outstanding.
    TransientError(FetchErrorKind),
    /// All attempts errored.
    PermanentError,
}

/// Per-field reconciliation decision.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Unchanged,
    Filled(String),
    AbbreviationExpanded {
        old: String,
        new: String,
    },
    Corrected {
        old: String,
        new: String,
        similarity: f64,
    },
    ConflictSkipped,
}

impl Decision {
    /// The replacement value carried by a mutating decision, if any.
    pub fn new_value(&self) -> Option<&str> {
        match self {
            Decision::Filled(v) => Some(v),
            Decision::AbbreviationExpanded { new, .. } => Some(new),
            Decision::Corrected { new, .. } => Some(new),
            Decision::Unchanged | Decision::ConflictSkipped => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authors_denormalize_to_joined_string() {
        let meta = MetadataRecord {
            authors: vec!["Karen Hardy Bystedt".to_string(), "Rainer Wick".to_string()],
            ..Default::default()
        };
        assert_eq!(
            meta.value_for(FieldKey::Authors),
            Some("Karen Hardy Bystedt, Rainer Wick".to_string())
        );
    }

    #[test]
    fn test_empty_values_mean_no_opinion() {
        let meta = MetadataRecord {
            title: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(meta.value_for(FieldKey::Title), None);
        assert!(meta.is_empty());
    }
}
