//! String similarity and abbreviation detection

/// Normalized Levenshtein similarity in `[0, 1]`.
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// Whether `value` reads as an abbreviation of `full`.
///
/// Rules, in order: empty or case-insensitively equal values are not
/// abbreviations; two purely numeric values are not (a year is never an
/// abbreviation of another year); a trailing `.` always is; otherwise
/// `value` must be a strictly shorter case-insensitive prefix of `full`
/// covering at most 60% of its length, so "Rob"/"Robert" counts but
/// "Rober"/"Robert" does not.
pub fn is_abbreviation(value: &str, full: &str) -> bool {
    let v = value.trim();
    let f = full.trim();
    if v.is_empty() || f.is_empty() {
        return false;
    }

    let v_lower = v.to_lowercase();
    let f_lower = f.to_lowercase();
    if v_lower == f_lower {
        return false;
    }

    let numeric = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if numeric(v) && numeric(f) {
        return false;
    }

    if v.ends_with('.') {
        return true;
    }

    let v_len = v.chars().count();
    let f_len = f.chars().count();
    if v_len < f_len && f_lower.starts_with(&v_lower) {
        return v_len as f64 / f_len.max(1) as f64 <= 0.6;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_dot_is_always_an_abbreviation() {
        assert!(is_abbreviation("M.", "Maximilian"));
        assert!(is_abbreviation("G. E.", "Gotthold Ephraim"));
    }

    #[test]
    fn test_short_prefix_is_an_abbreviation() {
        // 3/10 and 3/6 are within the 0.6 ratio
        assert!(is_abbreviation("Max", "Maximilian"));
        assert!(is_abbreviation("Rob", "Robert"));
    }

    #[test]
    fn test_long_prefix_is_not_an_abbreviation() {
        // 5/6 > 0.6: too close to the full form to call it abbreviated
        assert!(!is_abbreviation("Rober", "Robert"));
    }

    #[test]
    fn test_equal_values_are_not_abbreviations() {
        assert!(!is_abbreviation("Maximilian", "Maximilian"));
        assert!(!is_abbreviation("maximilian", "MAXIMILIAN"));
    }

    #[test]
    fn test_numeric_values_are_never_abbreviations() {
        assert!(!is_abbreviation("19", "1999"));
    }

    #[test]
    fn test_empty_values_are_not_abbreviations() {
        assert!(!is_abbreviation("", "Maximilian"));
        assert!(!is_abbreviation("Max", ""));
    }

    #[test]
    fn test_non_prefix_is_not_an_abbreviation() {
        assert!(!is_abbreviation("Mix", "Maximilian"));
    }

    #[test]
    fn test_similarity_range() {
        assert!((similarity("abc", "abc") - 1.0).abs() < f64::EPSILON);
        assert!(similarity("abc", "xyz") < 0.001);
        let s = similarity("Heyne", "Heyn");
        assert!(s > 0.7 && s < 1.0);
    }
}
