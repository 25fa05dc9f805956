//! Writing line-mode MARC records.
//!
//! Output per record: `*000<leader>` when the record has a leader (or has
//! no content at all, in which case the template leader is written), one
//! `*<tag><value>` line per control field, one `*<tag><ind1><ind2>$<code><value>...`
//! line per data field, then a `^` line.

use crate::error::{MarcError, Result};
use crate::formats::FormatWriter;
use crate::leader::Leader;
use crate::line_reader::LEADER_TAG;
use crate::record::Record;
use std::io::{BufWriter, Write};

/// Writer for line-mode MARC.
///
/// ```
/// use marc_codec::{DataField, LineMarcWriter, Record};
///
/// # fn main() -> marc_codec::Result<()> {
/// let mut record = Record::new();
/// record.add_control_field("001", "0010463")?;
/// record.add_data_field(DataField::new("260", ' ', ' ')?.with_subfield('a', "Oslo"));
///
/// let mut writer = LineMarcWriter::new(Vec::new());
/// writer.write_record(&record)?;
/// let text = String::from_utf8(writer.into_inner()?).unwrap();
/// assert_eq!(text, "*0010010463\n*260  $aOslo\n^\n");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct LineMarcWriter<W: Write> {
    writer: BufWriter<W>,
    records_written: usize,
}

impl<W: Write> LineMarcWriter<W> {
    /// Create a new line-mode writer.
    pub fn new(writer: W) -> Self {
        LineMarcWriter {
            writer: BufWriter::new(writer),
            records_written: 0,
        }
    }

    /// Write a single record.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::InvalidField`] if a tag is not three digits, the
    /// leader or a value contains a line break, a subfield value contains `$`, or an
    /// indicator or subfield code is a line break. Nothing is written in that
    /// case.
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        let text = encode_record(record)?;
        self.writer.write_all(text.as_bytes())?;
        self.records_written += 1;
        log::trace!("encoded line record #{}", self.records_written);
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

impl<W: Write + std::fmt::Debug> FormatWriter for LineMarcWriter<W> {
    fn write_record(&mut self, record: &Record) -> Result<()> {
        LineMarcWriter::write_record(self, record)
    }

    fn flush(&mut self) -> Result<()> {
        LineMarcWriter::flush(self)
    }

    fn records_written(&self) -> Option<usize> {
        Some(self.records_written)
    }
}

/// Render one record as line-mode text, terminator line included.
///
/// # Errors
///
/// Same conditions as [`LineMarcWriter::write_record`].
pub fn encode_record(record: &Record) -> Result<String> {
    let mut out = String::new();

    match record.leader() {
        Some(leader) => {
            check_line(LEADER_TAG, leader.as_str())?;
            push_line(&mut out, LEADER_TAG, leader.as_str());
        }
        // A bare terminator line is skipped on reading, so a record with
        // nothing in it keeps a leader line to survive the round trip.
        None if record.is_empty() => {
            push_line(&mut out, LEADER_TAG, Leader::default().as_str());
        }
        None => {}
    }

    for field in record.control_fields() {
        check_tag(field.tag())?;
        if field.tag() == LEADER_TAG {
            return Err(MarcError::InvalidField(format!(
                "control field {LEADER_TAG} would be read back as the leader"
            )));
        }
        check_line(field.tag(), field.value())?;
        push_line(&mut out, field.tag(), field.value());
    }

    for field in record.data_fields() {
        check_tag(field.tag())?;
        out.push('*');
        out.push_str(field.tag());
        for indicator in [field.indicator1(), field.indicator2()] {
            if matches!(indicator, '\n' | '\r') {
                return Err(MarcError::InvalidField(format!(
                    "indicator {indicator:?} in field {} cannot be written as a line",
                    field.tag()
                )));
            }
            out.push(indicator);
        }
        for subfield in field.subfields() {
            if matches!(subfield.code, '\n' | '\r') {
                return Err(MarcError::InvalidField(format!(
                    "subfield code {:?} in field {} cannot be written as a line",
                    subfield.code,
                    field.tag()
                )));
            }
            check_line(field.tag(), &subfield.value)?;
            if subfield.value.contains('$') {
                return Err(MarcError::InvalidField(format!(
                    "subfield ${} of field {} contains '$'",
                    subfield.code,
                    field.tag()
                )));
            }
            out.push('$');
            out.push(subfield.code);
            out.push_str(&subfield.value);
        }
        out.push('\n');
    }

    out.push_str("^\n");
    Ok(out)
}

/// Line-mode tags are three ASCII digits.
fn check_tag(tag: &str) -> Result<()> {
    if tag.len() == 3 && tag.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(MarcError::InvalidField(format!(
            "tag {tag:?} cannot be written in line mode"
        )))
    }
}

fn check_line(tag: &str, value: &str) -> Result<()> {
    if value.contains(['\n', '\r']) {
        return Err(MarcError::InvalidField(format!(
            "value of field {tag} contains a line break"
        )));
    }
    Ok(())
}

fn push_line(out: &mut String, tag: &str, value: &str) {
    out.push('*');
    out.push_str(tag);
    out.push_str(value);
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_reader::LineMarcReader;
    use crate::record::DataField;

    fn sample_record() -> Record {
        let mut record = Record::with_leader(Leader::from_partial("     c"));
        record.add_control_field("001", "0010463").unwrap();
        record.add_data_field(
            DataField::new("100", ' ', '0')
                .unwrap()
                .with_subfield('a', "Karlén, Barbro")
                .with_subfield('d', "1954-"),
        );
        record
    }

    #[test]
    fn test_encode_layout() {
        let text = encode_record(&sample_record()).unwrap();
        assert_eq!(
            text,
            "*000     c   a2200000   4500\n*0010010463\n*100 0$aKarlén, Barbro$d1954-\n^\n"
        );
    }

    #[test]
    fn test_no_leader_line_without_leader() {
        let mut record = sample_record();
        record.clear_leader();
        let text = encode_record(&record).unwrap();
        assert!(text.starts_with("*0010010463\n"));
    }

    #[test]
    fn test_round_trip() {
        let original = sample_record();
        let mut writer = LineMarcWriter::new(Vec::new());
        writer.write_record(&original).unwrap();
        writer.write_record(&original).unwrap();
        let bytes = writer.into_inner().unwrap();

        let mut reader = LineMarcReader::new(bytes.as_slice());
        for _ in 0..2 {
            let decoded = reader.read_record().unwrap().unwrap();
            assert!(decoded.equals_including_leader(&original));
        }
        assert!(reader.read_record().unwrap().is_none());
    }

    #[test]
    fn test_literal_caret_round_trip() {
        let mut record = Record::new();
        record.add_data_field(
            DataField::new("245", '1', '0')
                .unwrap()
                .with_subfield('a', "x^y"),
        );
        let text = encode_record(&record).unwrap();
        let decoded = LineMarcReader::new(text.as_bytes())
            .read_record()
            .unwrap()
            .unwrap();
        assert_eq!(decoded.data_fields()[0].subfield('a'), Some("x^y"));
    }

    #[test]
    fn test_line_break_in_leader_rejected() {
        let mut record = sample_record();
        record.set_leader(Leader::from_bytes(b"00000nam a2200000\n^ 4500").unwrap());
        let mut writer = LineMarcWriter::new(Vec::new());

        assert!(matches!(
            writer.write_record(&record),
            Err(MarcError::InvalidField(_))
        ));
        assert!(writer.into_inner().unwrap().is_empty());
    }

    #[test]
    fn test_empty_record_survives_round_trip() {
        let text = encode_record(&Record::new()).unwrap();
        assert_eq!(text, "*00000000    a2200000   4500\n^\n");

        let doubled = format!("{text}{text}");
        let mut reader = LineMarcReader::new(doubled.as_bytes());
        for _ in 0..2 {
            let record = reader.read_record().unwrap().unwrap();
            assert!(record.control_fields().is_empty());
            assert!(record.data_fields().is_empty());
        }
        assert!(reader.read_record().unwrap().is_none());
    }

    #[test]
    fn test_dollar_in_subfield_rejected() {
        let mut record = Record::new();
        record.add_data_field(DataField::new("020", ' ', ' ').unwrap().with_subfield('c', "$12"));
        let mut writer = LineMarcWriter::new(Vec::new());

        assert!(matches!(
            writer.write_record(&record),
            Err(MarcError::InvalidField(_))
        ));
        assert!(writer.into_inner().unwrap().is_empty());
    }

    #[test]
    fn test_line_break_rejected() {
        let mut record = Record::new();
        record.add_control_field("001", "a\nb").unwrap();
        assert!(matches!(
            encode_record(&record),
            Err(MarcError::InvalidField(_))
        ));
    }

    #[test]
    fn test_non_numeric_tag_rejected() {
        let mut record = Record::new();
        record.add_data_field(DataField::new("FMT", ' ', ' ').unwrap().with_subfield('a', "BK"));
        assert!(matches!(
            encode_record(&record),
            Err(MarcError::InvalidField(_))
        ));
    }

    #[test]
    fn test_control_field_000_rejected() {
        let mut record = Record::new();
        record.add_control_field("000", "x").unwrap();
        assert!(matches!(
            encode_record(&record),
            Err(MarcError::InvalidField(_))
        ));
    }

    #[test]
    fn test_dollar_in_control_field_allowed() {
        let mut record = Record::new();
        record.add_control_field("001", "$100").unwrap();
        let text = encode_record(&record).unwrap();
        let decoded = LineMarcReader::new(text.as_bytes())
            .read_record()
            .unwrap()
            .unwrap();
        assert_eq!(decoded.control_field("001").unwrap().value(), "$100");
    }
}
