//! Author name format reconciliation
//!
//! Catalog records carry personal names as `"Last, First"`; the external
//! source delivers `"First Last"`. Comparing the raw strings would flag
//! every author as a conflict, so the two forms are aligned structurally
//! before any similarity test.

use crate::reconcile::similarity::is_abbreviation;

/// Structural relation between a record author value and a source author
/// value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorComparison {
    /// Same person, record form already complete.
    Complete,
    /// Same person, record first name abbreviated; carries the expanded
    /// `"Last, First"` replacement.
    Expand(String),
    /// Record value had no `"Last, First"` structure; carries the value
    /// synthesized from the source name.
    Restructure(String),
    /// Different last names, or one side not parseable as a person name.
    Unrelated,
}

impl AuthorComparison {
    /// The replacement value, for the comparisons that carry one.
    pub fn replacement(&self) -> Option<&str> {
        match self {
            AuthorComparison::Expand(v) | AuthorComparison::Restructure(v) => Some(v),
            AuthorComparison::Complete | AuthorComparison::Unrelated => None,
        }
    }
}

/// Compare a record author (`"Last, First"`) against a source author
/// (`"First Last"`).
pub fn compare_author(record_value: &str, source_value: &str) -> AuthorComparison {
    let record_value = record_value.trim();
    let source_value = source_value.trim();
    if record_value.is_empty() || source_value.is_empty() {
        return AuthorComparison::Unrelated;
    }

    let source_parts: Vec<&str> = source_value.split_whitespace().collect();

    let Some((record_last, record_first)) = record_value.split_once(',') else {
        // No inverted form on the record side; rebuild it from the source
        // name when that one splits into first and last parts.
        if source_parts.len() >= 2 {
            let last = source_parts[source_parts.len() - 1];
            let first = source_parts[..source_parts.len() - 1].join(" ");
            return AuthorComparison::Restructure(format!("{}, {}", last, first));
        }
        return AuthorComparison::Unrelated;
    };

    let record_last = record_last.trim();
    let record_first = record_first.trim();

    if source_parts.len() < 2 {
        return AuthorComparison::Unrelated;
    }
    let source_last = source_parts[source_parts.len() - 1];
    let source_first = source_parts[..source_parts.len() - 1].join(" ");

    if record_last.to_lowercase() != source_last.to_lowercase() {
        return AuthorComparison::Unrelated;
    }

    let abbreviated =
        record_first.contains('.') || is_abbreviation(record_first, &source_first);
    if abbreviated {
        AuthorComparison::Expand(format!("{}, {}", record_last, source_first))
    } else {
        AuthorComparison::Complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_abbreviated_first_name_is_expanded() {
        assert_eq!(
            compare_author("Mustermann, Max", "Maximilian Mustermann"),
            AuthorComparison::Expand("Mustermann, Maximilian".to_string())
        );
    }

    #[test]
    fn test_dot_abbreviated_first_name_is_expanded() {
        assert_eq!(
            compare_author("Mustermann, M.", "Maximilian Mustermann"),
            AuthorComparison::Expand("Mustermann, Maximilian".to_string())
        );
        assert_eq!(
            compare_author("Lessing, G. E.", "Gotthold Ephraim Lessing"),
            AuthorComparison::Expand("Lessing, Gotthold Ephraim".to_string())
        );
    }

    #[test]
    fn test_complete_first_name_is_left_alone() {
        assert_eq!(
            compare_author("Mustermann, Maximilian", "Maximilian Mustermann"),
            AuthorComparison::Complete
        );
        // One character short of the full form is still "complete"
        assert_eq!(
            compare_author("Müller, Robert", "Robert Müller"),
            AuthorComparison::Complete
        );
    }

    #[test]
    fn test_near_full_prefix_is_not_expanded() {
        assert_eq!(
            compare_author("Müller, Rober", "Robert Müller"),
            AuthorComparison::Complete
        );
        assert_eq!(
            compare_author("Müller, Rob", "Robert Müller"),
            AuthorComparison::Expand("Müller, Robert".to_string())
        );
    }

    #[test]
    fn test_different_last_names_are_unrelated() {
        assert_eq!(
            compare_author("Wick, Rainer", "Karen Hardy Bystedt"),
            AuthorComparison::Unrelated
        );
    }

    #[test]
    fn test_missing_comma_restructures_from_source() {
        assert_eq!(
            compare_author("Rainer Wick", "Rainer Wick"),
            AuthorComparison::Restructure("Wick, Rainer".to_string())
        );
    }

    #[test]
    fn test_multi_part_first_names_join() {
        assert_eq!(
            compare_author("Bystedt, K.", "Karen Hardy Bystedt"),
            AuthorComparison::Expand("Bystedt, Karen Hardy".to_string())
        );
    }

    #[test]
    fn test_single_token_source_is_unrelated() {
        assert_eq!(compare_author("Homer", "Homer"), AuthorComparison::Unrelated);
    }
}
