//! Writing MARC records to binary format.
//!
//! This module provides [`MarcWriter`] for serializing [`Record`] instances
//! to ISO 2709 binary format that can be written to any destination implementing
//! [`std::io::Write`].
//!
//! # Examples
//!
//! Writing to a buffer:
//!
//! ```
//! use marc_codec::{DataField, MarcWriter, Record};
//!
//! # fn main() -> marc_codec::Result<()> {
//! let mut writer = MarcWriter::new(Vec::new());
//!
//! let mut record = Record::new();
//! record.add_control_field("001", "12345")?;
//! record.add_data_field(DataField::new("245", '1', '0')?.with_subfield('a', "Title"));
//!
//! writer.write_record(&record)?;
//! let bytes = writer.into_inner()?;
//! assert_eq!(bytes.last(), Some(&0x1D));
//! # Ok(())
//! # }
//! ```

use crate::error::{MarcError, Result};
use crate::formats::FormatWriter;
use crate::leader::LEADER_LEN;
use crate::reader::{FIELD_TERMINATOR, RECORD_TERMINATOR, SUBFIELD_DELIMITER};
use crate::record::Record;
use std::io::{BufWriter, Write};

/// Largest record the 5-digit leader length can express.
pub const MAX_RECORD_LEN: usize = 99_999;

/// Largest field the 4-digit directory length can express.
pub const MAX_FIELD_LEN: usize = 9_999;

/// Writer for ISO 2709 binary MARC format.
///
/// Each record is encoded completely in memory before any byte reaches the
/// destination, so a record that cannot be encoded leaves the output as it was.
/// Output is buffered; call [`flush`](Self::flush) when done.
#[derive(Debug)]
pub struct MarcWriter<W: Write> {
    writer: BufWriter<W>,
    records_written: usize,
}

impl<W: Write> MarcWriter<W> {
    /// Create a new MARC writer.
    pub fn new(writer: W) -> Self {
        MarcWriter {
            writer: BufWriter::new(writer),
            records_written: 0,
        }
    }

    /// Write a single MARC record.
    ///
    /// The leader is taken from the record (or the default template when it
    /// has none) with the record length and base address recomputed.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::SizeOverflow`] if the record or one of its fields
    /// is too large for the length fields, [`MarcError::InvalidField`] if a
    /// tag, indicator or subfield code is not ASCII or a value contains a
    /// structural byte, or an I/O error.
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        let bytes = encode_record(record)?;
        self.writer.write_all(&bytes)?;
        self.records_written += 1;
        log::trace!(
            "encoded binary record #{} ({} bytes)",
            self.records_written,
            bytes.len()
        );
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

    /// Get the number of records written so far.
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

impl<W: Write + std::fmt::Debug> FormatWriter for MarcWriter<W> {
    fn write_record(&mut self, record: &Record) -> Result<()> {
        MarcWriter::write_record(self, record)
    }

    fn flush(&mut self) -> Result<()> {
        MarcWriter::flush(self)
    }

    fn records_written(&self) -> Option<usize> {
        Some(self.records_written)
    }
}

/// Encode one record as a complete ISO 2709 byte sequence.
///
/// Control fields are laid out first, then data fields, each in record order.
///
/// # Errors
///
/// Same conditions as [`MarcWriter::write_record`], I/O aside.
pub fn encode_record(record: &Record) -> Result<Vec<u8>> {
    let mut directory = Vec::new();
    let mut data_area = Vec::new();

    for field in record.control_fields() {
        let start = data_area.len();
        push_value(&mut data_area, field.tag(), field.value())?;
        data_area.push(FIELD_TERMINATOR);
        push_entry(&mut directory, field.tag(), data_area.len() - start, start)?;
    }

    for field in record.data_fields() {
        let start = data_area.len();
        push_ascii(&mut data_area, field.tag(), field.indicator1(), "indicator")?;
        push_ascii(&mut data_area, field.tag(), field.indicator2(), "indicator")?;
        for subfield in field.subfields() {
            data_area.push(SUBFIELD_DELIMITER);
            push_ascii(&mut data_area, field.tag(), subfield.code, "subfield code")?;
            push_value(&mut data_area, field.tag(), &subfield.value)?;
        }
        data_area.push(FIELD_TERMINATOR);
        push_entry(&mut directory, field.tag(), data_area.len() - start, start)?;
    }

    directory.push(FIELD_TERMINATOR);

    let base_address = LEADER_LEN + directory.len();
    let record_length = base_address + data_area.len() + 1;
    if record_length > MAX_RECORD_LEN {
        return Err(MarcError::SizeOverflow {
            size: record_length,
            limit: MAX_RECORD_LEN,
        });
    }

    let leader = record
        .leader()
        .copied()
        .unwrap_or_default()
        .with_lengths(record_length, base_address);

    let mut bytes = Vec::with_capacity(record_length);
    bytes.extend_from_slice(leader.as_bytes());
    bytes.extend_from_slice(&directory);
    bytes.extend_from_slice(&data_area);
    bytes.push(RECORD_TERMINATOR);
    Ok(bytes)
}

fn push_entry(directory: &mut Vec<u8>, tag: &str, length: usize, start: usize) -> Result<()> {
    if !tag.is_ascii() {
        return Err(MarcError::InvalidField(format!(
            "tag {tag:?} is not ASCII"
        )));
    }
    if length > MAX_FIELD_LEN {
        return Err(MarcError::SizeOverflow {
            size: length,
            limit: MAX_FIELD_LEN,
        });
    }
    if start > MAX_RECORD_LEN {
        return Err(MarcError::SizeOverflow {
            size: start,
            limit: MAX_RECORD_LEN,
        });
    }
    directory.extend_from_slice(tag.as_bytes());
    directory.extend_from_slice(format!("{length:04}{start:05}").as_bytes());
    Ok(())
}

fn push_ascii(out: &mut Vec<u8>, tag: &str, c: char, what: &str) -> Result<()> {
    if !c.is_ascii() {
        return Err(MarcError::InvalidField(format!(
            "{what} {c:?} in field {tag} is not ASCII"
        )));
    }
    out.push(c as u8);
    Ok(())
}

fn push_value(out: &mut Vec<u8>, tag: &str, value: &str) -> Result<()> {
    if value
        .bytes()
        .any(|b| matches!(b, RECORD_TERMINATOR | FIELD_TERMINATOR | SUBFIELD_DELIMITER))
    {
        return Err(MarcError::InvalidField(format!(
            "value in field {tag} contains a structural control byte"
        )));
    }
    out.extend_from_slice(value.as_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leader::Leader;
    use crate::reader::MarcReader;
    use crate::record::DataField;
    use std::io::Cursor;

    fn make_test_leader() -> Leader {
        Leader::from_partial("01234nam a2299999 a 4500")
    }

    fn sample_record() -> Record {
        let mut record = Record::with_leader(make_test_leader());
        record.add_control_field("001", "0010463").unwrap();
        record.add_data_field(
            DataField::new("245", '1', '0')
                .unwrap()
                .with_subfield('a', "I begynnelsen skapte Gud")
                .with_subfield('b', "dikt og salmer"),
        );
        record
    }

    #[test]
    fn test_write_simple_record() {
        let bytes = encode_record(&sample_record()).unwrap();

        assert_eq!(&bytes[5..12], b"nam a22");
        assert_eq!(bytes.last(), Some(&RECORD_TERMINATOR));
        assert_eq!(&bytes[24..36], b"001000800000");
        assert_eq!(&bytes[36..48], b"245004500008");
        assert_eq!(bytes[48], FIELD_TERMINATOR);
    }

    #[test]
    fn test_lengths_rewritten_in_leader() {
        let bytes = encode_record(&sample_record()).unwrap();
        let leader = Leader::from_bytes(&bytes[..LEADER_LEN]).unwrap();

        assert_eq!(leader.record_length(), Some(bytes.len()));
        assert_eq!(leader.base_address(), Some(49));
    }

    #[test]
    fn test_default_leader_when_absent() {
        let mut record = sample_record();
        record.clear_leader();
        let bytes = encode_record(&record).unwrap();

        assert_eq!(&bytes[5..12], b"    a22");
        assert_eq!(&bytes[17..24], b"   4500");
    }

    #[test]
    fn test_write_and_read_roundtrip() {
        let original = sample_record();
        let mut writer = MarcWriter::new(Vec::new());
        writer.write_record(&original).unwrap();
        let bytes = writer.into_inner().unwrap();

        let mut reader = MarcReader::new(Cursor::new(bytes));
        let decoded = reader.read_record().unwrap().unwrap();
        assert!(decoded.equals_ignoring_leader(&original));
        assert_eq!(decoded.leader().unwrap().record_type(), 'a');
        assert!(reader.read_record().unwrap().is_none());
    }

    #[test]
    fn test_write_multiple_fields_same_tag() {
        let mut record = Record::new();
        for subject in ["Andaktsbøker", "Salmer"] {
            record.add_data_field(
                DataField::new("655", ' ', ' ')
                    .unwrap()
                    .with_subfield('a', subject),
            );
        }
        let mut writer = MarcWriter::new(Vec::new());
        writer.write_record(&record).unwrap();
        let bytes = writer.into_inner().unwrap();

        let decoded = MarcReader::new(Cursor::new(bytes))
            .read_record()
            .unwrap()
            .unwrap();
        let values: Vec<_> = decoded
            .data_fields_by_tag("655")
            .filter_map(|f| f.subfield('a'))
            .collect();
        assert_eq!(values, ["Andaktsbøker", "Salmer"]);
    }

    #[test]
    fn test_record_size_overflow_writes_nothing() {
        let mut record = Record::new();
        for _ in 0..20 {
            record.add_data_field(
                DataField::new("500", ' ', ' ')
                    .unwrap()
                    .with_subfield('a', "x".repeat(5_000)),
            );
        }
        let mut writer = MarcWriter::new(Vec::new());

        assert!(matches!(
            writer.write_record(&record),
            Err(MarcError::SizeOverflow { limit: MAX_RECORD_LEN, .. })
        ));
        assert_eq!(writer.records_written(), 0);
        assert!(writer.into_inner().unwrap().is_empty());
    }

    #[test]
    fn test_field_size_overflow() {
        let mut record = Record::new();
        record.add_data_field(
            DataField::new("500", ' ', ' ')
                .unwrap()
                .with_subfield('a', "x".repeat(MAX_FIELD_LEN)),
        );
        assert!(matches!(
            encode_record(&record),
            Err(MarcError::SizeOverflow { limit: MAX_FIELD_LEN, .. })
        ));
    }

    #[test]
    fn test_non_ascii_indicator_rejected() {
        let mut record = Record::new();
        record.add_data_field(DataField::new("245", 'é', '0').unwrap().with_subfield('a', "T"));
        assert!(matches!(
            encode_record(&record),
            Err(MarcError::InvalidField(_))
        ));
    }

    #[test]
    fn test_structural_byte_in_value_rejected() {
        let mut record = Record::new();
        record.add_control_field("001", "a\u{1e}b").unwrap();
        assert!(matches!(
            encode_record(&record),
            Err(MarcError::InvalidField(_))
        ));
    }

    #[test]
    fn test_writer_usable_after_failed_record() {
        let mut bad = Record::new();
        bad.add_control_field("001", "a\u{1d}").unwrap();

        let mut writer = MarcWriter::new(Vec::new());
        assert!(writer.write_record(&bad).is_err());
        writer.write_record(&sample_record()).unwrap();
        assert_eq!(writer.records_written(), 1);

        let bytes = writer.into_inner().unwrap();
        let decoded = MarcReader::new(Cursor::new(bytes)).read_record().unwrap();
        assert!(decoded.is_some());
    }

    #[test]
    fn test_format_writer_batch() {
        let records = vec![sample_record(), sample_record(), sample_record()];
        let mut writer = MarcWriter::new(Vec::new());
        FormatWriter::write_batch(&mut writer, &records).unwrap();
        FormatWriter::flush(&mut writer).unwrap();
        assert_eq!(FormatWriter::records_written(&writer), Some(3));

        let bytes = writer.into_inner().unwrap();
        let mut reader = MarcReader::new(Cursor::new(bytes));
        let mut count = 0;
        while reader.read_record().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 3);
    }
}
