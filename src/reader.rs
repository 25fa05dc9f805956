//! Reading MARC records from binary streams.
//!
//! This module provides [`MarcReader`] for reading ISO 2709 formatted MARC records
//! from any source that implements [`std::io::Read`].
//!
//! # Examples
//!
//! ```no_run
//! use marc_codec::MarcReader;
//! use std::fs::File;
//!
//! let file = File::open("records.mrc")?;
//! let mut reader = MarcReader::new(file);
//!
//! while let Some(record) = reader.read_record()? {
//!     println!("{} data fields", record.data_fields().len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::error::{MarcError, Result};
use crate::formats::FormatReader;
use crate::leader::{Leader, LEADER_LEN};
use crate::record::{is_control_tag, DataField, Record};
use std::io::{BufRead, BufReader, Read};

/// Ends every record.
pub const RECORD_TERMINATOR: u8 = 0x1D;
/// Ends every field, and the directory.
pub const FIELD_TERMINATOR: u8 = 0x1E;
/// Precedes every subfield code.
pub const SUBFIELD_DELIMITER: u8 = 0x1F;

/// Directory entry: tag(3) + length(4) + start(5).
pub(crate) const DIRECTORY_ENTRY_LEN: usize = 12;

/// Reader for ISO 2709 binary MARC format.
///
/// `MarcReader` reads one record at a time, up to each record terminator.
/// A malformed record is reported as an error and skipped, so the next call
/// continues with the following record.
///
/// # Examples
///
/// ```
/// use marc_codec::MarcReader;
/// use std::io::Cursor;
///
/// let mut reader = MarcReader::new(Cursor::new(Vec::new()));
///
/// match reader.read_record() {
///     Ok(Some(record)) => println!("{} fields", record.data_fields().len()),
///     Ok(None) => println!("End of file"),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
#[derive(Debug)]
pub struct MarcReader<R: Read> {
    reader: BufReader<R>,
    buffer: Vec<u8>,
    records_read: usize,
}

impl<R: Read> MarcReader<R> {
    /// Create a new MARC reader.
    ///
    /// # Arguments
    ///
    /// * `reader` - Any source implementing [`std::io::Read`]
    pub fn new(reader: R) -> Self {
        MarcReader {
            reader: BufReader::new(reader),
            buffer: Vec::new(),
            records_read: 0,
        }
    }

    /// Read a single MARC record.
    ///
    /// Returns `Ok(Some(record))` if a record was successfully read, `Ok(None)` if
    /// the stream ended cleanly, or `Err` if the record is malformed.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The stream ends before a record terminator ([`MarcError::Truncated`])
    /// - The leader length disagrees with the record ([`MarcError::LengthMismatch`])
    /// - A leader or directory number is not decimal ([`MarcError::NonNumericField`])
    /// - A directory entry points outside the record ([`MarcError::OutOfBounds`])
    /// - An I/O error occurs
    pub fn read_record(&mut self) -> Result<Option<Record>> {
        self.buffer.clear();
        let n = self.reader.read_until(RECORD_TERMINATOR, &mut self.buffer)?;
        if n == 0 {
            return Ok(None);
        }

        let record = parse_record(&self.buffer)?;
        self.records_read += 1;
        log::trace!(
            "decoded binary record #{} ({} bytes)",
            self.records_read,
            self.buffer.len()
        );
        Ok(Some(record))
    }
}

impl<R: Read + std::fmt::Debug> FormatReader for MarcReader<R> {
    fn read_record(&mut self) -> Result<Option<Record>> {
        MarcReader::read_record(self)
    }

    fn records_read(&self) -> Option<usize> {
        Some(self.records_read)
    }
}

/// Decode one complete binary record, record terminator included.
///
/// # Errors
///
/// Same conditions as [`MarcReader::read_record`].
pub fn parse_record(bytes: &[u8]) -> Result<Record> {
    if bytes.last() != Some(&RECORD_TERMINATOR) {
        return Err(MarcError::Truncated(format!(
            "no record terminator after {} bytes",
            bytes.len()
        )));
    }
    if bytes.len() - 1 < LEADER_LEN {
        return Err(MarcError::Truncated(format!(
            "{} bytes precede the record terminator; a leader needs {LEADER_LEN}",
            bytes.len() - 1
        )));
    }

    let declared = parse_number(&bytes[0..5], "leader record length")?;
    if declared != bytes.len() {
        return Err(MarcError::LengthMismatch {
            declared,
            actual: bytes.len(),
        });
    }

    let base = parse_number(&bytes[12..17], "leader base address of data")?;
    // Record terminator sits at the last byte; data ends just before it.
    let data_end = bytes.len() - 1;
    if base <= LEADER_LEN || base > data_end {
        return Err(MarcError::OutOfBounds(format!(
            "base address {base} outside {}..={data_end}",
            LEADER_LEN + 1
        )));
    }

    let mut record = Record::with_leader(Leader::from_bytes(&bytes[..LEADER_LEN])?);

    // Directory runs from the end of the leader up to its terminator at base - 1.
    let directory_end = base - 1;
    let mut pos = LEADER_LEN;
    while pos < directory_end {
        if pos + DIRECTORY_ENTRY_LEN > directory_end {
            return Err(MarcError::OutOfBounds(format!(
                "directory entry at offset {pos} runs past the directory end at {directory_end}"
            )));
        }
        let entry = &bytes[pos..pos + DIRECTORY_ENTRY_LEN];
        let tag = String::from_utf8_lossy(&entry[0..3]).into_owned();
        let length = parse_number(&entry[3..7], "directory field length")?;
        let start = parse_number(&entry[7..12], "directory field start")?;

        let field_start = base + start;
        let field_end = field_start + length;
        if length == 0 || field_end > data_end {
            return Err(MarcError::OutOfBounds(format!(
                "field {tag} spans bytes {field_start}..{field_end}, data ends at {data_end}"
            )));
        }
        // Last byte of the span is the field terminator.
        if bytes[field_end - 1] != FIELD_TERMINATOR {
            return Err(MarcError::OutOfBounds(format!(
                "field {tag} span {field_start}..{field_end} does not end at a field terminator"
            )));
        }
        let content = &bytes[field_start..field_end - 1];

        if is_control_tag(&tag) {
            record.add_control_field(&tag, String::from_utf8_lossy(content))?;
        } else {
            record.add_data_field(parse_data_field(tag, content)?);
        }
        pos += DIRECTORY_ENTRY_LEN;
    }

    Ok(record)
}

/// Parse indicators and subfields of a data field (terminator excluded).
fn parse_data_field(tag: String, content: &[u8]) -> Result<DataField> {
    if content.len() < 2 {
        return Err(MarcError::OutOfBounds(format!(
            "data field {tag} holds {} bytes, too short for two indicators",
            content.len()
        )));
    }

    let mut field = DataField::new(tag, content[0] as char, content[1] as char)?;

    // Fragments of one byte or less carry no value and are dropped, which
    // also discards the empty fragment before the first delimiter.
    for fragment in content[2..].split(|&b| b == SUBFIELD_DELIMITER) {
        if fragment.len() <= 1 {
            continue;
        }
        let text = String::from_utf8_lossy(fragment);
        let mut chars = text.chars();
        if let Some(code) = chars.next() {
            field.add_subfield(code, chars.as_str());
        }
    }

    Ok(field)
}

/// Parse a fixed-width ASCII decimal number.
fn parse_number(bytes: &[u8], what: &'static str) -> Result<usize> {
    let mut result = 0usize;
    for &byte in bytes {
        if !byte.is_ascii_digit() {
            return Err(MarcError::NonNumericField {
                what,
                found: String::from_utf8_lossy(bytes).into_owned(),
            });
        }
        result = result * 10 + usize::from(byte - b'0');
    }
    Ok(result)
}
