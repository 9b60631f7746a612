//! Streaming MARC-XML writer
//!
//! Writes a MARC21/slim collection incrementally. Each record is serialized
//! into an in-memory buffer first and committed to the underlying stream
//! with a single write, so an I/O failure never leaves a partially-written
//! record behind.

use crate::marc::record::{Field, Record};
use crate::marc::MARC_NAMESPACE;
use crate::{Error, Result};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Streaming writer for a MARC-XML record store.
pub struct RecordWriter<W: Write> {
    out: W,
    records_written: u64,
}

impl RecordWriter<BufWriter<File>> {
    /// Create the output store at `path`, truncating any existing file.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write> RecordWriter<W> {
    /// Wrap `out` and emit the XML declaration and collection opening tag.
    pub fn new(mut out: W) -> Result<Self> {
        out.write_all(b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n")?;
        out.write_all(
            format!("<collection xmlns=\"{}\">\n", MARC_NAMESPACE).as_bytes(),
        )?;
        Ok(Self {
            out,
            records_written: 0,
        })
    }

    /// Serialize one record and commit it with a single write.
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        let bytes = serialize_record(record)?;
        self.out.write_all(&bytes)?;
        self.records_written += 1;
        Ok(())
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Close the collection element and flush the stream.
    pub fn finish(mut self) -> Result<()> {
        self.out.write_all(b"</collection>\n")?;
        self.out.flush()?;
        Ok(())
    }
}

/// Serialize a single record to pretty-printed MARC-XML bytes.
fn serialize_record(record: &Record) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer
        .write_event(Event::Start(BytesStart::new("record")))
        .map_err(|e| Error::Xml(e.to_string()))?;

    if let Some(leader) = &record.leader {
        write_text_element(&mut writer, BytesStart::new("leader"), "leader", leader)?;
    }

    for field in &record.fields {
        match field {
            Field::Control(cf) => {
                let mut start = BytesStart::new("controlfield");
                start.push_attribute(("tag", cf.tag.as_str()));
                write_text_element(&mut writer, start, "controlfield", &cf.value)?;
            }
            Field::Data(df) => {
                let mut start = BytesStart::new("datafield");
                start.push_attribute(("tag", df.tag.as_str()));
                start.push_attribute(("ind1", df.ind1.as_str()));
                start.push_attribute(("ind2", df.ind2.as_str()));
                writer
                    .write_event(Event::Start(start))
                    .map_err(|e| Error::Xml(e.to_string()))?;

                for sf in &df.subfields {
                    let code = sf.code.to_string();
                    let mut start = BytesStart::new("subfield");
                    start.push_attribute(("code", code.as_str()));
                    write_text_element(&mut writer, start, "subfield", &sf.value)?;
                }

                writer
                    .write_event(Event::End(BytesEnd::new("datafield")))
                    .map_err(|e| Error::Xml(e.to_string()))?;
            }
        }
    }

    writer
        .write_event(Event::End(BytesEnd::new("record")))
        .map_err(|e| Error::Xml(e.to_string()))?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

fn write_text_element(
    writer: &mut Writer<Vec<u8>>,
    start: BytesStart<'_>,
    name: &str,
    text: &str,
) -> Result<()> {
    writer
        .write_event(Event::Start(start))
        .map_err(|e| Error::Xml(e.to_string()))?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(|e| Error::Xml(e.to_string()))?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(|e| Error::Xml(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marc::reader::RecordReader;
    use crate::marc::record::{ControlField, DataField, Subfield};
    use std::io::Cursor;

    fn sample_record() -> Record {
        Record {
            leader: Some("00000nam a2200000 c 4500".to_string()),
            fields: vec![
                Field::Control(ControlField {
                    tag: "001".to_string(),
                    value: "990001".to_string(),
                }),
                Field::Data(DataField {
                    tag: "245".to_string(),
                    ind1: "0".to_string(),
                    ind2: "0".to_string(),
                    subfields: vec![Subfield {
                        code: 'a',
                        value: "Titel & Untertitel".to_string(),
                    }],
                }),
            ],
        }
    }

    #[test]
    fn test_write_then_read_roundtrip() {
        let mut out = Vec::new();
        {
            let mut writer = RecordWriter::new(&mut out).unwrap();
            writer.write_record(&sample_record()).unwrap();
            assert_eq!(writer.records_written(), 1);
            writer.finish().unwrap();
        }

        let xml = String::from_utf8(out).unwrap();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<collection"));
        assert!(xml.trim_end().ends_with("</collection>"));
        // Text is escaped on output
        assert!(xml.contains("Titel &amp; Untertitel"));

        let mut reader = RecordReader::new(Cursor::new(xml));
        let record = reader.next_record().unwrap().unwrap();
        assert_eq!(record, sample_record());
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn test_record_order_is_preserved() {
        let mut out = Vec::new();
        {
            let mut writer = RecordWriter::new(&mut out).unwrap();
            for id in ["a", "b", "c"] {
                let record = Record {
                    leader: None,
                    fields: vec![Field::Control(ControlField {
                        tag: "001".to_string(),
                        value: id.to_string(),
                    })],
                };
                writer.write_record(&record).unwrap();
            }
            writer.finish().unwrap();
        }

        let mut reader = RecordReader::new(Cursor::new(out));
        let mut ids = Vec::new();
        while let Some(record) = reader.next_record().unwrap() {
            ids.push(record.control_value("001").unwrap().to_string());
        }
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
