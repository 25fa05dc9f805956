//! Reading line-mode MARC records.
//!
//! [`LineMarcReader`] assembles records from the [`Token`] stream produced by
//! [`LineLexer`](crate::lexer::LineLexer).
//!
//! # Examples
//!
//! ```
//! use marc_codec::LineMarcReader;
//!
//! let input = "*0010010463\n*24510$aI begynnelsen skapte Gud\n^\n";
//! let mut reader = LineMarcReader::new(input.as_bytes());
//!
//! let record = reader.read_record()?.expect("one record");
//! assert_eq!(record.control_field("001").map(|f| f.value()), Some("0010463"));
//! assert!(reader.read_record()?.is_none());
//! # Ok::<(), marc_codec::MarcError>(())
//! ```

use crate::error::{MarcError, Result};
use crate::formats::FormatReader;
use crate::leader::Leader;
use crate::lexer::{LineLexer, Token};
use crate::record::{indicator_from_str, DataField, Record};
use std::io::{BufReader, Read};

/// Tag whose value holds the leader in line-mode files.
pub const LEADER_TAG: &str = "000";

/// Reader for line-mode MARC.
///
/// A malformed record is reported as [`MarcError::LexError`] (or
/// [`MarcError::InvalidField`]); the rest of that record is discarded so the
/// next call starts with the following record.
#[derive(Debug)]
pub struct LineMarcReader<R: Read> {
    lexer: LineLexer<BufReader<R>>,
    records_read: usize,
}

impl<R: Read> LineMarcReader<R> {
    /// Create a new line-mode reader.
    pub fn new(reader: R) -> Self {
        LineMarcReader {
            lexer: LineLexer::new(BufReader::new(reader)),
            records_read: 0,
        }
    }

    /// Read the next record.
    ///
    /// The final `^` of a stream is optional: a record still open when the
    /// input ends is returned as is.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::LexError`] for malformed lines or tokens in the
    /// wrong place, [`MarcError::InvalidField`] for a tag the record model
    /// rejects, or an I/O error.
    pub fn read_record(&mut self) -> Result<Option<Record>> {
        match self.parse_record() {
            Ok(Some(record)) => {
                self.records_read += 1;
                log::trace!(
                    "decoded line record #{} ({} control, {} data fields)",
                    self.records_read,
                    record.control_fields().len(),
                    record.data_fields().len()
                );
                Ok(Some(record))
            }
            Ok(None) => Ok(None),
            Err(MarcError::Io(e)) => Err(MarcError::Io(e)),
            Err(e) => {
                log::warn!("skipping rest of malformed line record: {e}");
                self.lexer.skip_record();
                Err(e)
            }
        }
    }

    fn parse_record(&mut self) -> Result<Option<Record>> {
        let mut record = Record::new();
        let mut current: Option<DataField> = None;
        let mut pending = false;

        loop {
            match self.lexer.next_token()? {
                Token::CtrlTag(tag) => {
                    if current.is_some() {
                        return Err(self.lex_error("control field after data fields", tag));
                    }
                    let value = self.expect_value()?;
                    if tag == LEADER_TAG {
                        record.set_leader(Leader::from_partial(&value));
                    } else {
                        record.add_control_field(&tag, value)?;
                    }
                    pending = true;
                }
                Token::Tag(text) => {
                    if let Some(field) = current.take() {
                        record.add_data_field(field);
                    }
                    // Tag is three ASCII digits; the indicators follow.
                    let (tag, indicators) = text.split_at(3);
                    let mut chars = indicators.chars();
                    let ind1 = indicator_from_str(chars.as_str());
                    chars.next();
                    let ind2 = indicator_from_str(chars.as_str());
                    current = Some(DataField::new(tag, ind1, ind2)?);
                    pending = true;
                }
                Token::SubFieldCode(code) => {
                    let Some(field) = current.as_mut() else {
                        return Err(self.lex_error("subfield outside a data field", code));
                    };
                    let code = indicator_from_str(&code);
                    let value = self.expect_value()?;
                    field.add_subfield(code, value);
                }
                Token::Value(text) => {
                    return Err(self.lex_error("value without a tag", text));
                }
                Token::Terminator => {
                    if pending {
                        break;
                    }
                    let (line, _) = self.lexer.position();
                    log::debug!("skipping empty record terminator at line {line}");
                }
                Token::EndOfStream => {
                    if pending {
                        break;
                    }
                    return Ok(None);
                }
                Token::Error {
                    message,
                    text,
                    line,
                    column,
                } => {
                    return Err(MarcError::LexError {
                        line,
                        column,
                        text,
                        message,
                    });
                }
            }
        }

        if let Some(field) = current {
            record.add_data_field(field);
        }
        Ok(Some(record))
    }

    /// The value token that must follow a control tag or subfield code.
    fn expect_value(&mut self) -> Result<String> {
        match self.lexer.next_token()? {
            Token::Value(value) => Ok(value),
            Token::Error {
                message,
                text,
                line,
                column,
            } => Err(MarcError::LexError {
                line,
                column,
                text,
                message,
            }),
            other => Err(self.lex_error("expected a value", format!("{other:?}"))),
        }
    }

    fn lex_error(&self, message: &str, text: String) -> MarcError {
        let (line, column) = self.lexer.position();
        MarcError::LexError {
            line,
            column,
            text,
            message: message.to_string(),
        }
    }
}

impl<R: Read + std::fmt::Debug> FormatReader for LineMarcReader<R> {
    fn read_record(&mut self) -> Result<Option<Record>> {
        LineMarcReader::read_record(self)
    }

    fn records_read(&self) -> Option<usize> {
        Some(self.records_read)
    }
}
