//! MARCXML serialization and deserialization of MARC records.
//!
//! This module provides conversion between MARC records and standard MARCXML format,
//! as defined by the Library of Congress (<https://www.loc.gov/standards/marcxml/>).
//!
//! Output conforms to LOC's MARCXML schema: `tag`, `ind1`, `ind2` and `code`
//! are serialized as XML **attributes**, and each `<record>` element carries the
//! `xmlns="http://www.loc.gov/MARC21/slim"` namespace declaration.
//!
//! For deserialization, elements and attributes are matched by local name, so
//! unprefixed, default-namespace (`<record xmlns="...">`) and prefixed
//! (`<marc:record xmlns:marc="...">`) forms are all accepted. Records may sit
//! inside a `<collection>` or any other wrapper; [`MarcxmlReader`] streams them
//! one at a time.
//!
//! # Examples
//!
//! ```
//! use marc_codec::{DataField, MarcxmlReader, MarcxmlWriter, Record};
//!
//! # fn main() -> marc_codec::Result<()> {
//! let mut record = Record::new();
//! record.add_data_field(DataField::new("245", '1', '0')?.with_subfield('a', "Title"));
//!
//! let mut writer = MarcxmlWriter::new(Vec::new());
//! writer.write_record(&record)?;
//! let xml = writer.into_inner()?;
//!
//! let restored = MarcxmlReader::new(xml.as_slice()).read_record()?.expect("one record");
//! assert!(restored.equals_ignoring_leader(&record));
//! # Ok(())
//! # }
//! ```

use crate::error::{MarcError, Result};
use crate::formats::{FormatReader, FormatWriter};
use crate::leader::Leader;
use crate::record::{indicator_from_str, DataField, Record};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::fmt;
use std::io::{BufReader, BufWriter, Read, Write};

/// The MARCXML namespace URI.
pub const MARCXML_NS: &str = "http://www.loc.gov/MARC21/slim";

const RECORD: &[u8] = b"record";
const LEADER: &[u8] = b"leader";
const CONTROLFIELD: &[u8] = b"controlfield";
const DATAFIELD: &[u8] = b"datafield";
const SUBFIELD: &[u8] = b"subfield";

/// Element whose text content is being collected.
enum Capture {
    Leader,
    Control(String),
    Subfield(char),
}

/// Streaming MARCXML reader.
pub struct MarcxmlReader<R: Read> {
    reader: Reader<BufReader<R>>,
    records_read: usize,
}

impl<R: Read> MarcxmlReader<R> {
    /// Create a new MARCXML reader.
    pub fn new(reader: R) -> Self {
        let mut reader = Reader::from_reader(BufReader::new(reader));
        reader.trim_text(false);
        MarcxmlReader {
            reader,
            records_read: 0,
        }
    }

    /// Read the next `record` element.
    ///
    /// Anything before the next `record` element (declarations, a collection
    /// wrapper, comments) is skipped.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::XmlStructural`] for malformed markup, a missing
    /// `tag` or `code` attribute, or input ending inside a record.
    pub fn read_record(&mut self) -> Result<Option<Record>> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let record = match self.reader.read_event_into(&mut buf)? {
                Event::Start(e) if e.local_name().as_ref() == RECORD => self.parse_record()?,
                Event::Empty(e) if e.local_name().as_ref() == RECORD => Record::new(),
                Event::Eof => return Ok(None),
                _ => continue,
            };
            self.records_read += 1;
            log::trace!(
                "decoded xml record #{} at byte {}",
                self.records_read,
                self.reader.buffer_position()
            );
            return Ok(Some(record));
        }
    }

    /// Decode the body of a record whose start tag has been consumed.
    fn parse_record(&mut self) -> Result<Record> {
        let mut record = Record::new();
        let mut buf = Vec::new();
        let mut field: Option<DataField> = None;
        let mut capture: Option<Capture> = None;
        let mut text = String::new();

        loop {
            buf.clear();
            match self.reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    if let Some(next) = open_element(&e, &mut field)? {
                        capture = Some(next);
                        text.clear();
                    }
                }
                Event::Empty(e) => {
                    let empty = open_element(&e, &mut field)?;
                    close_element(&mut record, &mut field, empty, String::new())?;
                    if e.local_name().as_ref() == DATAFIELD {
                        close_datafield(&mut record, &mut field);
                    }
                }
                Event::Text(e) => {
                    if capture.is_some() {
                        text.push_str(&e.unescape()?);
                    }
                }
                Event::CData(e) => {
                    if capture.is_some() {
                        text.push_str(&String::from_utf8_lossy(&e));
                    }
                }
                Event::End(e) => match e.local_name().as_ref() {
                    RECORD => {
                        close_datafield(&mut record, &mut field);
                        return Ok(record);
                    }
                    DATAFIELD => close_datafield(&mut record, &mut field),
                    LEADER | CONTROLFIELD | SUBFIELD => {
                        close_element(&mut record, &mut field, capture.take(), std::mem::take(&mut text))?;
                    }
                    _ => {}
                },
                Event::Eof => {
                    return Err(MarcError::XmlStructural(format!(
                        "input ended inside a record at byte {}",
                        self.reader.buffer_position()
                    )));
                }
                _ => {}
            }
        }
    }
}

/// Handle a start tag. Returns what text to capture, if any; a `datafield`
/// opens `field` instead.
fn open_element(e: &BytesStart<'_>, field: &mut Option<DataField>) -> Result<Option<Capture>> {
    let capture = match e.local_name().as_ref() {
        LEADER => Some(Capture::Leader),
        CONTROLFIELD => Some(Capture::Control(required_attribute(e, "controlfield", "tag")?)),
        DATAFIELD => {
            let tag = required_attribute(e, "datafield", "tag")?;
            let ind1 = attribute(e, b"ind1")?.map_or(' ', |v| indicator_from_str(&v));
            let ind2 = attribute(e, b"ind2")?.map_or(' ', |v| indicator_from_str(&v));
            *field = Some(DataField::new(tag, ind1, ind2)?);
            None
        }
        SUBFIELD => {
            let code = required_attribute(e, "subfield", "code")?;
            let code = code.chars().next().ok_or_else(|| {
                MarcError::XmlStructural("subfield has an empty code attribute".to_string())
            })?;
            Some(Capture::Subfield(code))
        }
        _ => None,
    };
    Ok(capture)
}

/// Store the text collected for a leader, control field or subfield.
fn close_element(
    record: &mut Record,
    field: &mut Option<DataField>,
    capture: Option<Capture>,
    text: String,
) -> Result<()> {
    match capture {
        Some(Capture::Leader) => {
            let leader = Leader::from_bytes(text.as_bytes()).unwrap_or_else(|_| Leader::from_partial(&text));
            record.set_leader(leader);
        }
        Some(Capture::Control(tag)) => record.add_control_field(&tag, text)?,
        Some(Capture::Subfield(code)) => {
            if let Some(field) = field.as_mut() {
                field.add_subfield(code, text);
            }
        }
        None => {}
    }
    Ok(())
}

fn close_datafield(record: &mut Record, field: &mut Option<DataField>) {
    if let Some(field) = field.take() {
        record.add_data_field(field);
    }
}

fn required_attribute(e: &BytesStart<'_>, element: &str, name: &str) -> Result<String> {
    attribute(e, name.as_bytes())?.ok_or_else(|| {
        MarcError::XmlStructural(format!("{element} element without a {name} attribute"))
    })
}

/// Unescaped value of the attribute with local name `name`.
fn attribute(e: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| MarcError::XmlStructural(err.to_string()))?;
        if attr.key.local_name().as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

impl<R: Read> fmt::Debug for MarcxmlReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarcxmlReader")
            .field("records_read", &self.records_read)
            .finish_non_exhaustive()
    }
}

impl<R: Read> FormatReader for MarcxmlReader<R> {
    fn read_record(&mut self) -> Result<Option<Record>> {
        MarcxmlReader::read_record(self)
    }

    fn records_read(&self) -> Option<usize> {
        Some(self.records_read)
    }
}

/// MARCXML writer emitting one namespaced `<record>` element per record.
///
/// No XML declaration or `<collection>` wrapper is written; each record is
/// followed by a line break.
#[derive(Debug)]
pub struct MarcxmlWriter<W: Write> {
    writer: BufWriter<W>,
    records_written: usize,
}

impl<W: Write> MarcxmlWriter<W> {
    /// Create a new MARCXML writer.
    pub fn new(writer: W) -> Self {
        MarcxmlWriter {
            writer: BufWriter::new(writer),
            records_written: 0,
        }
    }

    /// Write a single record.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::InvalidField`] if a value contains a control
    /// character XML 1.0 cannot carry, or an I/O error. Nothing is written
    /// when encoding fails.
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        let mut xml = record_to_marcxml(record)?;
        xml.push('\n');
        self.writer.write_all(xml.as_bytes())?;
        self.records_written += 1;
        log::trace!("encoded xml record #{}", self.records_written);
        Ok(())
    }

    /// Flush buffered output to the destination.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination cannot be flushed.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Number of records written so far.
    #[must_use]
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Flush and return the underlying destination.
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush fails.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| MarcError::Io(e.into_error()))
    }
}

impl<W: Write + std::fmt::Debug> FormatWriter for MarcxmlWriter<W> {
    fn write_record(&mut self, record: &Record) -> Result<()> {
        MarcxmlWriter::write_record(self, record)
    }

    fn flush(&mut self) -> Result<()> {
        MarcxmlWriter::flush(self)
    }

    fn records_written(&self) -> Option<usize> {
        Some(self.records_written)
    }
}

/// Serialize a record to a MARCXML `<record>` element.
///
/// # Errors
///
/// Returns [`MarcError::InvalidField`] if a tag or value contains a control
/// character that XML 1.0 cannot represent.
pub fn record_to_marcxml(record: &Record) -> Result<String> {
    let mut writer = Writer::new(Vec::new());

    let mut root = BytesStart::new("record");
    root.push_attribute(("xmlns", MARCXML_NS));
    writer.write_event(Event::Start(root))?;

    if let Some(leader) = record.leader() {
        write_text_element(&mut writer, BytesStart::new("leader"), leader.as_str())?;
    }

    for field in record.control_fields() {
        check_xml_text(field.tag())?;
        let mut start = BytesStart::new("controlfield");
        start.push_attribute(("tag", field.tag()));
        write_text_element(&mut writer, start, field.value())?;
    }

    for field in record.data_fields() {
        let ind1 = field.indicator1().to_string();
        let ind2 = field.indicator2().to_string();
        check_xml_text(field.tag())?;
        check_xml_text(&ind1)?;
        check_xml_text(&ind2)?;

        let mut start = BytesStart::new("datafield");
        start.push_attribute(("tag", field.tag()));
        start.push_attribute(("ind1", ind1.as_str()));
        start.push_attribute(("ind2", ind2.as_str()));
        writer.write_event(Event::Start(start))?;

        for subfield in field.subfields() {
            let code = subfield.code.to_string();
            check_xml_text(&code)?;
            let mut start = BytesStart::new("subfield");
            start.push_attribute(("code", code.as_str()));
            write_text_element(&mut writer, start, &subfield.value)?;
        }

        writer.write_event(Event::End(BytesEnd::new("datafield")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("record")))?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| MarcError::XmlStructural(format!("writer produced invalid UTF-8: {e}")))
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, start: BytesStart<'_>, text: &str) -> Result<()> {
    check_xml_text(text)?;
    let end = start.to_end().into_owned();
    writer.write_event(Event::Start(start))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(end))?;
    Ok(())
}

/// XML 1.0 allows no C0 control characters besides tab, LF and CR.
fn check_xml_text(text: &str) -> Result<()> {
    match text.chars().find(|&c| c < ' ' && !matches!(c, '\t' | '\n' | '\r')) {
        Some(c) => Err(MarcError::InvalidField(format!(
            "control character {c:?} cannot be written as XML"
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(xml: &str) -> Result<Vec<Record>> {
        MarcxmlReader::new(xml.as_bytes()).read_all()
    }

    fn read_one(xml: &str) -> Result<Record> {
        Ok(MarcxmlReader::new(xml.as_bytes()).read_record()?.unwrap())
    }

    fn sample_record() -> Record {
        let mut record = Record::with_leader(Leader::from_partial("     c"));
        record.add_control_field("001", "0010463").unwrap();
        record.add_data_field(
            DataField::new("245", '1', '0')
                .unwrap()
                .with_subfield('a', "I begynnelsen skapte Gud")
                .with_subfield('b', "dikt & salmer"),
        );
        record
    }

    #[test]
    fn test_record_to_marcxml_output_format() {
        let xml = record_to_marcxml(&sample_record()).unwrap();
        assert_eq!(
            xml,
            concat!(
                r#"<record xmlns="http://www.loc.gov/MARC21/slim">"#,
                "<leader>     c   a2200000   4500</leader>",
                r#"<controlfield tag="001">0010463</controlfield>"#,
                r#"<datafield tag="245" ind1="1" ind2="0">"#,
                r#"<subfield code="a">I begynnelsen skapte Gud</subfield>"#,
                r#"<subfield code="b">dikt &amp; salmer</subfield>"#,
                "</datafield></record>"
            )
        );
    }

    #[test]
    fn test_marcxml_roundtrip() {
        let original = sample_record();
        let mut writer = MarcxmlWriter::new(Vec::new());
        writer.write_record(&original).unwrap();
        writer.write_record(&original).unwrap();
        let xml = writer.into_inner().unwrap();

        let records = MarcxmlReader::new(xml.as_slice()).read_all().unwrap();
        assert_eq!(records.len(), 2);
        for record in &records {
            assert!(record.equals_including_leader(&original));
        }
    }

    #[test]
    fn test_parse_standard_marcxml_no_namespace() {
        let record = read_one(
            r#"<record><leader>01142cam  2200301 a 4500</leader><controlfield tag="001">123</controlfield></record>"#,
        )
        .unwrap();
        assert_eq!(record.leader().unwrap().as_str(), "01142cam  2200301 a 4500");
        assert_eq!(record.control_field("001").unwrap().value(), "123");
    }

    #[test]
    fn test_parse_marcxml_with_prefix_namespace() {
        let record = read_one(
            r#"<marc:record xmlns:marc="http://www.loc.gov/MARC21/slim">
                 <marc:datafield marc:tag="650" ind1=" " ind2="0">
                   <marc:subfield code="a">Hymns</marc:subfield>
                 </marc:datafield>
               </marc:record>"#,
        )
        .unwrap();
        let field = &record.data_fields()[0];
        assert_eq!(field.tag(), "650");
        assert_eq!(field.indicator2(), '0');
        assert_eq!(field.subfield('a'), Some("Hymns"));
    }

    #[test]
    fn test_parse_marcxml_collection() {
        let records = read_all(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <!-- two records -->
            <collection xmlns="http://www.loc.gov/MARC21/slim">
              <record><controlfield tag="001">1</controlfield></record>
              <record><controlfield tag="001">2</controlfield></record>
            </collection>"#,
        )
        .unwrap();
        let ids: Vec<&str> = records
            .iter()
            .map(|r| r.control_field("001").unwrap().value())
            .collect();
        assert_eq!(ids, ["1", "2"]);
    }

    #[test]
    fn test_missing_indicators_default_to_blank() {
        let record = read_one(
            r#"<record><datafield tag="500"><subfield code="a">Note</subfield></datafield></record>"#,
        )
        .unwrap();
        let field = &record.data_fields()[0];
        assert_eq!(field.indicator1(), ' ');
        assert_eq!(field.indicator2(), ' ');
    }

    #[test]
    fn test_text_not_trimmed() {
        let record = read_one(
            r#"<record><datafield tag="500" ind1=" " ind2=" "><subfield code="a">  padded </subfield></datafield></record>"#,
        )
        .unwrap();
        assert_eq!(record.data_fields()[0].subfield('a'), Some("  padded "));
    }

    #[test]
    fn test_short_leader_uses_template() {
        let record = read_one("<record><leader>     n</leader></record>").unwrap();
        assert_eq!(record.leader().unwrap().as_str(), "     n   a2200000   4500");
    }

    #[test]
    fn test_missing_tag_attribute() {
        let err = read_one("<record><controlfield>1</controlfield></record>").unwrap_err();
        assert!(matches!(err, MarcError::XmlStructural(_)), "got {err:?}");
    }

    #[test]
    fn test_missing_code_attribute() {
        let err = read_one(
            r#"<record><datafield tag="245" ind1="1" ind2="0"><subfield>x</subfield></datafield></record>"#,
        )
        .unwrap_err();
        assert!(matches!(err, MarcError::XmlStructural(_)), "got {err:?}");
    }

    #[test]
    fn test_eof_inside_record() {
        let err = read_one(r#"<record><controlfield tag="001">1</controlfield>"#).unwrap_err();
        assert!(matches!(err, MarcError::XmlStructural(_)), "got {err:?}");
    }

    #[test]
    fn test_mismatched_end_tag() {
        let err = read_one(r#"<record><leader>x</controlfield></record>"#).unwrap_err();
        assert!(matches!(err, MarcError::XmlStructural(_)), "got {err:?}");
    }

    #[test]
    fn test_unknown_elements_skipped() {
        let record = read_one(
            r#"<record><note>ignored</note><controlfield tag="003">NO-OsDA</controlfield></record>"#,
        )
        .unwrap();
        assert_eq!(record.control_fields().len(), 1);
        assert_eq!(record.control_field("003").unwrap().value(), "NO-OsDA");
    }

    #[test]
    fn test_empty_elements() {
        let record = read_one(
            r#"<record><controlfield tag="005"/><datafield tag="500" ind1=" " ind2=" "/></record>"#,
        )
        .unwrap();
        assert_eq!(record.control_field("005").unwrap().value(), "");
        assert_eq!(record.data_fields().len(), 1);
        assert!(record.data_fields()[0].subfields().is_empty());

        assert!(read_one("<record/>").unwrap().is_empty());
    }

    #[test]
    fn test_no_record_returns_none() {
        assert!(read_all("<collection/>").unwrap().is_empty());
        assert!(read_all("").unwrap().is_empty());
    }

    #[test]
    fn test_control_character_rejected() {
        let mut record = Record::new();
        record.add_control_field("001", "a\u{1}b").unwrap();
        let mut writer = MarcxmlWriter::new(Vec::new());
        assert!(matches!(
            writer.write_record(&record),
            Err(MarcError::InvalidField(_))
        ));
        assert!(writer.into_inner().unwrap().is_empty());
    }
}
