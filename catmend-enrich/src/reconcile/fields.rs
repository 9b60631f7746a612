//! Field key to MARC location mapping
//!
//! The reconciled keys map onto fixed tag/subfield locations. Title is the
//! one key whose record-side value spans two subfields (245 $a/$b combined
//! for comparison) while only $a is ever mutated.

use crate::types::FieldKey;
use catmend_common::Record;

/// One reconciled key and the MARC subfield it lives in.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub key: FieldKey,
    pub tag: &'static str,
    pub code: char,
}

pub const FIELD_SPECS: [FieldSpec; 4] = [
    FieldSpec {
        key: FieldKey::Title,
        tag: "245",
        code: 'a',
    },
    FieldSpec {
        key: FieldKey::Authors,
        tag: "100",
        code: 'a',
    },
    FieldSpec {
        key: FieldKey::Publisher,
        tag: "260",
        code: 'b',
    },
    FieldSpec {
        key: FieldKey::Year,
        tag: "260",
        code: 'c',
    },
];

impl FieldSpec {
    /// Record-side comparison value, trimmed; `None` when the subfield is
    /// absent or blank.
    ///
    /// For Title the value is `"{245$a minus trailing ':'} - {245$b}"` when a
    /// subtitle subfield is present, matching how the source reports
    /// combined titles.
    pub fn extract_value(&self, record: &Record) -> Option<String> {
        if self.key == FieldKey::Title {
            let main = record.first_subfield(self.tag, 'a')?;
            let main = main.trim_end_matches(':').trim();
            if main.is_empty() {
                return None;
            }
            return Some(match record.first_subfield(self.tag, 'b') {
                Some(subtitle) => format!("{} - {}", main, subtitle),
                None => main.to_string(),
            });
        }
        record
            .first_subfield(self.tag, self.code)
            .map(|v| v.to_string())
    }

    /// Overwrite the mapped subfield in place. Returns `false` when the
    /// record has no such subfield slot; a missing slot is never created.
    ///
    /// For Title, when the record carries a 245$b subtitle that the incoming
    /// value already embeds as a `" - {subtitle}"` suffix, only the main-title
    /// part goes into $a. Writing the combined string would duplicate the
    /// subtitle and make a second run see a changed title again.
    pub fn apply_value(&self, record: &mut Record, new_value: &str) -> bool {
        let value = if self.key == FieldKey::Title {
            match record.first_subfield(self.tag, 'b') {
                Some(subtitle) => {
                    let suffix = format!(" - {}", subtitle);
                    new_value.strip_suffix(&suffix).unwrap_or(new_value)
                }
                None => new_value,
            }
            .to_string()
        } else {
            new_value.to_string()
        };
        match record.first_subfield_mut(self.tag, self.code) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catmend_common::{DataField, Field, Subfield};

    fn record_with(tag: &str, subfields: Vec<(char, &str)>) -> Record {
        Record {
            leader: None,
            fields: vec![Field::Data(DataField {
                tag: tag.to_string(),
                ind1: " ".to_string(),
                ind2: " ".to_string(),
                subfields: subfields
                    .into_iter()
                    .map(|(code, value)| Subfield {
                        code,
                        value: value.to_string(),
                    })
                    .collect(),
            })],
        }
    }

    fn spec(key: FieldKey) -> FieldSpec {
        *FIELD_SPECS.iter().find(|s| s.key == key).unwrap()
    }

    #[test]
    fn test_title_combines_main_and_subtitle() {
        let record = record_with(
            "245",
            vec![
                ('a', "Roter Stern über Deutschland :"),
                ('b', "sowjetische Truppen in der DDR"),
            ],
        );
        assert_eq!(
            spec(FieldKey::Title).extract_value(&record),
            Some("Roter Stern über Deutschland - sowjetische Truppen in der DDR".to_string())
        );
    }

    #[test]
    fn test_title_without_subtitle() {
        let record = record_with("245", vec![('a', "Der Prozess")]);
        assert_eq!(
            spec(FieldKey::Title).extract_value(&record),
            Some("Der Prozess".to_string())
        );
    }

    #[test]
    fn test_title_apply_touches_only_main_subfield() {
        let mut record = record_with("245", vec![('a', "Alt"), ('b', "Untertitel")]);
        assert!(spec(FieldKey::Title).apply_value(&mut record, "Neu"));
        assert_eq!(record.first_subfield("245", 'a'), Some("Neu"));
        assert_eq!(record.first_subfield("245", 'b'), Some("Untertitel"));
    }

    #[test]
    fn test_title_apply_strips_embedded_subtitle() {
        let mut record = record_with("245", vec![('a', ""), ('b', "Ein Grundriss")]);
        let title = spec(FieldKey::Title);
        assert!(title.apply_value(&mut record, "Geschichte Europas - Ein Grundriss"));
        assert_eq!(record.first_subfield("245", 'a'), Some("Geschichte Europas"));
        assert_eq!(record.first_subfield("245", 'b'), Some("Ein Grundriss"));

        // The rewritten record now compares equal to the incoming value
        assert_eq!(
            title.extract_value(&record),
            Some("Geschichte Europas - Ein Grundriss".to_string())
        );
    }

    #[test]
    fn test_title_apply_keeps_value_without_subtitle_suffix() {
        let mut record = record_with("245", vec![('a', "Alt"), ('b', "Untertitel")]);
        assert!(spec(FieldKey::Title).apply_value(&mut record, "Ganz neuer Titel"));
        assert_eq!(record.first_subfield("245", 'a'), Some("Ganz neuer Titel"));
        assert_eq!(record.first_subfield("245", 'b'), Some("Untertitel"));
    }

    #[test]
    fn test_apply_refuses_to_create_missing_slot() {
        let mut record = record_with("260", vec![('b', "Heyne")]);
        assert!(!spec(FieldKey::Year).apply_value(&mut record, "1999"));
        assert_eq!(record.first_subfield("260", 'b'), Some("Heyne"));
    }

    #[test]
    fn test_blank_subfield_extracts_as_none() {
        let record = record_with("260", vec![('b', "  ")]);
        assert_eq!(spec(FieldKey::Publisher).extract_value(&record), None);
    }
}
