//! ISBN normalization and checksum validation
//!
//! ISBN-10: ten characters, digits with an optional trailing `X` (value 10);
//! the weighted sum `Σ value[i]·(10-i)` must be divisible by 11.
//! ISBN-13: thirteen digits with an EAN-13 check digit.

/// Canonicalize a raw identifier: strip hyphens and spaces, uppercase `x`.
pub fn normalize(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| *c != '-' && *c != ' ')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Checksum-validate a normalized ISBN-10.
pub fn is_valid_isbn10(isbn: &str) -> bool {
    if isbn.chars().count() != 10 {
        return false;
    }
    let mut total = 0u32;
    for (i, c) in isbn.chars().enumerate() {
        let value = if c == 'X' && i == 9 {
            10
        } else if let Some(d) = c.to_digit(10) {
            d
        } else {
            return false;
        };
        total += value * (10 - i as u32);
    }
    total % 11 == 0
}

/// Checksum-validate a normalized ISBN-13.
pub fn is_valid_isbn13(isbn: &str) -> bool {
    if isbn.len() != 13 || !isbn.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let digits: Vec<u32> = isbn.chars().filter_map(|c| c.to_digit(10)).collect();
    let total: u32 = digits[..12]
        .iter()
        .enumerate()
        .map(|(i, d)| d * if i % 2 == 0 { 1 } else { 3 })
        .sum();
    let check = (10 - (total % 10)) % 10;
    check == digits[12]
}

/// Whether a normalized identifier is a syntactically valid ISBN of either
/// form.
pub fn is_valid(isbn: &str) -> bool {
    match isbn.len() {
        10 => is_valid_isbn10(isbn),
        13 => is_valid_isbn13(isbn),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_separators() {
        assert_eq!(normalize("3-453-35061-8"), "3453350618");
        assert_eq!(normalize(" 978 3 16 148410 0 "), "9783161484100");
        assert_eq!(normalize("123456789x"), "123456789X");
    }

    #[test]
    fn test_isbn10_checksum() {
        assert!(is_valid_isbn10("3453350618"));
        assert!(!is_valid_isbn10("1234567890"));
        assert!(is_valid_isbn10("097522980X"));
        assert!(!is_valid_isbn10("097522980Y"));
        assert!(!is_valid_isbn10("34533506"));
    }

    #[test]
    fn test_isbn10_x_only_valid_in_last_position() {
        assert!(!is_valid_isbn10("X453350618"));
    }

    #[test]
    fn test_isbn13_checksum() {
        assert!(is_valid_isbn13("9780306406157"));
        assert!(!is_valid_isbn13("9780306406158"));
        assert!(!is_valid_isbn13("978030640615"));
        assert!(!is_valid_isbn13("978030640615X"));
    }

    #[test]
    fn test_is_valid_dispatches_on_length() {
        assert!(is_valid("3453350618"));
        assert!(is_valid("9780306406157"));
        assert!(!is_valid("12345"));
    }
}
