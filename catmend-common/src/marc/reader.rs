//! Streaming MARC-XML reader
//!
//! Pull-parses a MARC21/slim collection one record at a time. The reader
//! never holds more than the record currently being parsed, so memory use is
//! independent of store size. Fields with a malformed shape (e.g. a missing
//! `tag` attribute) are skipped with a warning and never abort the stream.

use crate::marc::record::{ControlField, DataField, Field, Record, Subfield};
use crate::{Error, Result};
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::warn;

/// Streaming reader over a MARC-XML record store.
pub struct RecordReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
}

impl RecordReader<BufReader<File>> {
    /// Open the record store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: Reader::from_reader(inner),
            buf: Vec::new(),
        }
    }

    fn read_event(&mut self) -> Result<Event<'_>> {
        self.buf.clear();
        Ok(self.reader.read_event_into(&mut self.buf)?)
    }

    /// Advance to the next record. Returns `Ok(None)` at end of stream.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        loop {
            self.buf.clear();
            let event = self.reader.read_event_into(&mut self.buf)?;

            match event {
                Event::Start(ref e) if e.local_name().as_ref() == b"record" => {
                    let record = self.parse_record()?;
                    return Ok(Some(record));
                }
                Event::Eof => return Ok(None),
                _ => {}
            }
        }
    }

    fn parse_record(&mut self) -> Result<Record> {
        let mut record = Record::default();

        loop {
            self.buf.clear();
            let event = self.reader.read_event_into(&mut self.buf)?;

            match event {
                Event::Start(e) if e.local_name().as_ref() == b"leader" => {
                    record.leader = Some(self.read_text(b"leader")?);
                }
                Event::Start(e) if e.local_name().as_ref() == b"controlfield" => {
                    let tag = attribute(&e, b"tag");
                    let value = self.read_text(b"controlfield")?;
                    match tag {
                        Some(tag) => {
                            record.fields.push(Field::Control(ControlField { tag, value }));
                        }
                        None => warn!("Skipping controlfield without tag attribute"),
                    }
                }
                Event::Start(e) if e.local_name().as_ref() == b"datafield" => {
                    let tag = attribute(&e, b"tag");
                    let ind1 = attribute(&e, b"ind1").unwrap_or_else(|| " ".to_string());
                    let ind2 = attribute(&e, b"ind2").unwrap_or_else(|| " ".to_string());
                    match tag {
                        Some(tag) => {
                            let field = self.parse_datafield(tag, ind1, ind2)?;
                            record.fields.push(Field::Data(field));
                        }
                        None => {
                            warn!("Skipping datafield without tag attribute");
                            self.skip_element(b"datafield")?;
                        }
                    }
                }
                Event::Empty(e) if e.local_name().as_ref() == b"controlfield" => {
                    match attribute(&e, b"tag") {
                        Some(tag) => {
                            record.fields.push(Field::Control(ControlField {
                                tag,
                                value: String::new(),
                            }));
                        }
                        None => warn!("Skipping controlfield without tag attribute"),
                    }
                }
                Event::Empty(e) if e.local_name().as_ref() == b"datafield" => {
                    let ind1 = attribute(&e, b"ind1").unwrap_or_else(|| " ".to_string());
                    let ind2 = attribute(&e, b"ind2").unwrap_or_else(|| " ".to_string());
                    match attribute(&e, b"tag") {
                        Some(tag) => {
                            record.fields.push(Field::Data(DataField {
                                tag,
                                ind1,
                                ind2,
                                subfields: Vec::new(),
                            }));
                        }
                        None => warn!("Skipping datafield without tag attribute"),
                    }
                }
                Event::Start(e) => {
                    let name = e.local_name().as_ref().to_vec();
                    warn!(
                        element = %String::from_utf8_lossy(&name),
                        "Skipping unexpected element inside record"
                    );
                    self.skip_element(&name)?;
                }
                Event::End(e) if e.local_name().as_ref() == b"record" => {
                    return Ok(record);
                }
                Event::Eof => {
                    return Err(Error::Xml(
                        "unexpected end of stream inside record".to_string(),
                    ));
                }
                _ => {}
            }
        }
    }

    fn parse_datafield(&mut self, tag: String, ind1: String, ind2: String) -> Result<DataField> {
        let mut subfields = Vec::new();

        loop {
            self.buf.clear();
            let event = self.reader.read_event_into(&mut self.buf)?;

            match event {
                Event::Start(e) if e.local_name().as_ref() == b"subfield" => {
                    let code = attribute(&e, b"code")
                        .and_then(|c| c.chars().next())
                        .unwrap_or(' ');
                    let value = self.read_text(b"subfield")?;
                    subfields.push(Subfield { code, value });
                }
                Event::Empty(e) if e.local_name().as_ref() == b"subfield" => {
                    let code = attribute(&e, b"code")
                        .and_then(|c| c.chars().next())
                        .unwrap_or(' ');
                    subfields.push(Subfield {
                        code,
                        value: String::new(),
                    });
                }
                Event::End(e) if e.local_name().as_ref() == b"datafield" => {
                    return Ok(DataField {
                        tag,
                        ind1,
                        ind2,
                        subfields,
                    });
                }
                Event::Eof => {
                    return Err(Error::Xml(
                        "unexpected end of stream inside datafield".to_string(),
                    ));
                }
                _ => {}
            }
        }
    }

    /// Accumulate character data until the closing tag named `end`.
    fn read_text(&mut self, end: &[u8]) -> Result<String> {
        let mut text = String::new();

        loop {
            match self.read_event()? {
                Event::Text(t) => {
                    let chunk = t.xml_content().map_err(|e| Error::Xml(e.to_string()))?;
                    text.push_str(&chunk);
                }
                Event::GeneralRef(r) => match r.resolve_char_ref()? {
                    Some(ch) => text.push(ch),
                    None => {
                        let name = r.decode().map_err(|e| Error::Xml(e.to_string()))?;
                        match resolve_predefined_entity(&name) {
                            Some(expanded) => text.push_str(expanded),
                            None => {
                                return Err(Error::Xml(format!(
                                    "unknown entity reference &{name};"
                                )));
                            }
                        }
                    }
                },
                Event::CData(t) => {
                    text.push_str(&String::from_utf8_lossy(&t.into_inner()));
                }
                Event::End(e) if e.local_name().as_ref() == end => {
                    return Ok(text);
                }
                Event::Eof => {
                    return Err(Error::Xml(format!(
                        "unexpected end of stream inside <{}>",
                        String::from_utf8_lossy(end)
                    )));
                }
                _ => {}
            }
        }
    }

    /// Consume events until the closing tag of `name`, tracking nesting.
    fn skip_element(&mut self, name: &[u8]) -> Result<()> {
        let mut depth = 1usize;

        loop {
            match self.read_event()? {
                Event::Start(e) if e.local_name().as_ref() == name => depth += 1,
                Event::End(e) if e.local_name().as_ref() == name => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Event::Eof => {
                    return Err(Error::Xml(format!(
                        "unexpected end of stream inside <{}>",
                        String::from_utf8_lossy(name)
                    )));
                }
                _ => {}
            }
        }
    }
}

/// Fetch an attribute by local name, namespace prefixes ignored.
fn attribute(start: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    start
        .attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name)
        .and_then(|a| match a.unescape_value() {
            Ok(v) => Some(v.into_owned()),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable attribute value");
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<collection xmlns:marc="http://www.loc.gov/MARC21/slim">
  <record>
    <leader>00000nam a2200000 c 4500</leader>
    <controlfield tag="001">990001</controlfield>
    <datafield tag="020" ind1=" " ind2=" ">
      <subfield code="a">3-453-35061-8</subfield>
    </datafield>
    <datafield tag="245" ind1="0" ind2="0">
      <subfield code="a">Ein Titel &amp; mehr</subfield>
    </datafield>
  </record>
  <record>
    <controlfield tag="001">990002</controlfield>
  </record>
</collection>
"#;

    #[test]
    fn test_reads_records_in_order() {
        let mut reader = RecordReader::new(Cursor::new(SAMPLE));

        let first = reader.next_record().unwrap().unwrap();
        assert_eq!(first.control_value("001"), Some("990001"));
        assert_eq!(first.leader.as_deref(), Some("00000nam a2200000 c 4500"));
        assert_eq!(first.subfield_values("020", 'a'), vec!["3-453-35061-8"]);
        assert_eq!(first.first_subfield("245", 'a'), Some("Ein Titel & mehr"));

        let second = reader.next_record().unwrap().unwrap();
        assert_eq!(second.control_value("001"), Some("990002"));

        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn test_namespace_prefixed_elements() {
        let xml = r#"<marc:collection xmlns:marc="http://www.loc.gov/MARC21/slim">
  <marc:record>
    <marc:datafield tag="100" ind1="1" ind2=" ">
      <marc:subfield code="a">Mustermann, Max</marc:subfield>
    </marc:datafield>
  </marc:record>
</marc:collection>"#;

        let mut reader = RecordReader::new(Cursor::new(xml));
        let record = reader.next_record().unwrap().unwrap();
        assert_eq!(record.first_subfield("100", 'a'), Some("Mustermann, Max"));
    }

    #[test]
    fn test_field_without_tag_is_skipped() {
        let xml = r#"<collection>
  <record>
    <datafield ind1=" " ind2=" ">
      <subfield code="a">orphan</subfield>
    </datafield>
    <datafield tag="245" ind1="0" ind2="0">
      <subfield code="a">Kept</subfield>
    </datafield>
  </record>
</collection>"#;

        let mut reader = RecordReader::new(Cursor::new(xml));
        let record = reader.next_record().unwrap().unwrap();
        assert_eq!(record.fields.len(), 1);
        assert_eq!(record.first_subfield("245", 'a'), Some("Kept"));
    }

    #[test]
    fn test_entity_references_in_subfield_text() {
        let xml = r#"<collection>
  <record>
    <datafield tag="245" ind1="0" ind2="0">
      <subfield code="a">Krieg &amp; Frieden</subfield>
      <subfield code="b">&#220;ber K&#xF6;nige &lt;und&gt; Kaiser</subfield>
    </datafield>
  </record>
</collection>"#;

        let mut reader = RecordReader::new(Cursor::new(xml));
        let record = reader.next_record().unwrap().unwrap();
        assert_eq!(record.first_subfield("245", 'a'), Some("Krieg & Frieden"));
        assert_eq!(
            record.first_subfield("245", 'b'),
            Some("Über Könige <und> Kaiser")
        );
    }

    #[test]
    fn test_self_closing_fields_are_kept() {
        let xml = r#"<collection>
  <record>
    <controlfield tag="003"/>
    <datafield tag="260" ind1=" " ind2=" "/>
    <datafield tag="245" ind1="0" ind2="0">
      <subfield code="a">Titel</subfield>
    </datafield>
  </record>
</collection>"#;

        let mut reader = RecordReader::new(Cursor::new(xml));
        let record = reader.next_record().unwrap().unwrap();
        assert_eq!(record.fields.len(), 3);
        assert_eq!(record.control_value("003"), Some(""));
        assert!(matches!(
            &record.fields[1],
            Field::Data(df) if df.tag == "260" && df.subfields.is_empty()
        ));
        assert_eq!(record.first_subfield("245", 'a'), Some("Titel"));
    }

    #[test]
    fn test_empty_subfield_element() {
        let xml = r#"<collection>
  <record>
    <datafield tag="260" ind1=" " ind2=" ">
      <subfield code="b"/>
    </datafield>
  </record>
</collection>"#;

        let mut reader = RecordReader::new(Cursor::new(xml));
        let record = reader.next_record().unwrap().unwrap();
        assert!(record.has_subfield("260", 'b'));
        assert_eq!(record.first_subfield("260", 'b'), None);
    }
}
