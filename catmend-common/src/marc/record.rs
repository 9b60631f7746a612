//! In-memory MARC21 record model
//!
//! A record is an ordered sequence of fields. Data fields carry coded,
//! repeatable subfields; control fields carry a single fixed-format text
//! blob. Field and subfield order is preserved exactly on output, even when
//! unrelated fields are modified.

/// One catalog entry composed of tagged fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    /// 24-character leader, when present in the source.
    pub leader: Option<String>,
    /// Control and data fields in document order.
    pub fields: Vec<Field>,
}

/// A control field or a data field, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Control(ControlField),
    Data(DataField),
}

/// Fixed-format field (e.g. 008); positions are semantically fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlField {
    pub tag: String,
    pub value: String,
}

/// Coded repeatable field with two single-character indicators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataField {
    pub tag: String,
    pub ind1: String,
    pub ind2: String,
    pub subfields: Vec<Subfield>,
}

/// Coded sub-value within a data field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subfield {
    pub code: char,
    pub value: String,
}

impl Record {
    /// First control field value for `tag`.
    pub fn control_value(&self, tag: &str) -> Option<&str> {
        self.fields.iter().find_map(|f| match f {
            Field::Control(cf) if cf.tag == tag => Some(cf.value.as_str()),
            _ => None,
        })
    }

    /// Language code from 008 positions 35-37, if the field is long enough.
    pub fn language_code(&self) -> Option<&str> {
        let value = self.control_value("008")?;
        let code = value.get(35..38)?;
        let trimmed = code.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(code)
        }
    }

    /// All non-empty `tag`/`code` subfield values, trimmed, in order.
    pub fn subfield_values(&self, tag: &str, code: char) -> Vec<&str> {
        self.fields
            .iter()
            .filter_map(|f| match f {
                Field::Data(df) if df.tag == tag => Some(df),
                _ => None,
            })
            .flat_map(|df| df.subfields.iter())
            .filter(|sf| sf.code == code)
            .map(|sf| sf.value.trim())
            .filter(|v| !v.is_empty())
            .collect()
    }

    /// First `tag`/`code` subfield value, trimmed, if present and non-empty.
    pub fn first_subfield(&self, tag: &str, code: char) -> Option<&str> {
        self.fields
            .iter()
            .filter_map(|f| match f {
                Field::Data(df) if df.tag == tag => Some(df),
                _ => None,
            })
            .flat_map(|df| df.subfields.iter())
            .find(|sf| sf.code == code)
            .map(|sf| sf.value.trim())
            .filter(|v| !v.is_empty())
    }

    /// Whether a `tag`/`code` subfield slot exists at all (possibly empty).
    pub fn has_subfield(&self, tag: &str, code: char) -> bool {
        self.fields.iter().any(|f| match f {
            Field::Data(df) if df.tag == tag => df.subfields.iter().any(|sf| sf.code == code),
            _ => false,
        })
    }

    /// Mutable access to the first `tag`/`code` subfield value.
    ///
    /// Returns `None` when no such subfield slot exists; a missing slot is
    /// never synthesized.
    pub fn first_subfield_mut(&mut self, tag: &str, code: char) -> Option<&mut String> {
        self.fields
            .iter_mut()
            .filter_map(|f| match f {
                Field::Data(df) if df.tag == tag => Some(df),
                _ => None,
            })
            .flat_map(|df| df.subfields.iter_mut())
            .find(|sf| sf.code == code)
            .map(|sf| &mut sf.value)
    }
}
