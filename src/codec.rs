//! Format-independent entry points.
//!
//! [`Decoder`] and [`Encoder`] pick the codec for a [`Format`] once, at
//! construction, and then expose the same record-at-a-time interface for all
//! three formats.
//!
//! # Examples
//!
//! Convert line-mode MARC to MARCXML:
//!
//! ```
//! use marc_codec::{Decoder, Encoder, Format};
//!
//! # fn main() -> marc_codec::Result<()> {
//! let input = "*0010010463\n*24510$aI begynnelsen skapte Gud\n^\n";
//!
//! let mut decoder = Decoder::new(input.as_bytes(), Format::LineMarc)?;
//! let mut encoder = Encoder::new(Vec::new(), Format::MarcXml)?;
//! while let Some(record) = decoder.decode()? {
//!     encoder.encode(&record)?;
//! }
//! let xml = String::from_utf8(encoder.into_inner()?).unwrap();
//! assert!(xml.contains(r#"<controlfield tag="001">0010463</controlfield>"#));
//! # Ok(())
//! # }
//! ```

use crate::error::{MarcError, Result};
use crate::formats::{detect_stream, Format, FormatReader, FormatWriter};
use crate::line_reader::LineMarcReader;
use crate::line_writer::LineMarcWriter;
use crate::marcxml::{MarcxmlReader, MarcxmlWriter};
use crate::reader::MarcReader;
use crate::record::Record;
use crate::writer::MarcWriter;
use std::io::{BufReader, Read, Write};

/// Streaming decoder for any supported format.
#[derive(Debug)]
pub enum Decoder<R: Read> {
    /// ISO 2709 binary
    Marc(MarcReader<R>),
    /// Line-mode MARC
    LineMarc(LineMarcReader<R>),
    /// MARCXML
    MarcXml(MarcxmlReader<R>),
}

impl<R: Read> Decoder<R> {
    /// Create a decoder for `format`.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::FormatUnknown`] for [`Format::Unknown`].
    pub fn new(reader: R, format: Format) -> Result<Self> {
        let decoder = match format {
            Format::Marc => Decoder::Marc(MarcReader::new(reader)),
            Format::LineMarc => Decoder::LineMarc(LineMarcReader::new(reader)),
            Format::MarcXml => Decoder::MarcXml(MarcxmlReader::new(reader)),
            Format::Unknown => return Err(MarcError::FormatUnknown),
        };
        log::debug!("decoding {format}");
        Ok(decoder)
    }

    /// Create a decoder for whatever format the stream starts with.
    ///
    /// ```
    /// use marc_codec::{Decoder, Format};
    ///
    /// let decoder = Decoder::detect(&b"\n<collection/>"[..]).unwrap();
    /// assert_eq!(decoder.format(), Format::MarcXml);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::FormatUnknown`] if the prefix is not recognized,
    /// or an I/O error.
    pub fn detect(reader: R) -> Result<Decoder<BufReader<R>>> {
        let mut reader = BufReader::new(reader);
        let format = detect_stream(&mut reader)?;
        Decoder::new(reader, format)
    }

    /// Decode the next record, or `Ok(None)` at the end of the stream.
    ///
    /// # Errors
    ///
    /// Returns the error of the underlying codec; the failure is scoped to one
    /// record.
    pub fn decode(&mut self) -> Result<Option<Record>> {
        match self {
            Decoder::Marc(reader) => reader.read_record(),
            Decoder::LineMarc(reader) => reader.read_record(),
            Decoder::MarcXml(reader) => reader.read_record(),
        }
    }

    /// Decode every remaining record. Memory grows with the whole collection.
    ///
    /// # Errors
    ///
    /// Returns the first decode error.
    pub fn decode_all(&mut self) -> Result<Vec<Record>> {
        self.records().collect()
    }

    /// Iterate over the remaining records.
    pub fn records(&mut self) -> impl Iterator<Item = Result<Record>> + '_ {
        std::iter::from_fn(move || self.decode().transpose())
    }

    /// Format this decoder reads.
    #[must_use]
    pub fn format(&self) -> Format {
        match self {
            Decoder::Marc(_) => Format::Marc,
            Decoder::LineMarc(_) => Format::LineMarc,
            Decoder::MarcXml(_) => Format::MarcXml,
        }
    }
}

impl<R: Read + std::fmt::Debug> FormatReader for Decoder<R> {
    fn read_record(&mut self) -> Result<Option<Record>> {
        self.decode()
    }

    fn records_read(&self) -> Option<usize> {
        match self {
            Decoder::Marc(reader) => FormatReader::records_read(reader),
            Decoder::LineMarc(reader) => FormatReader::records_read(reader),
            Decoder::MarcXml(reader) => FormatReader::records_read(reader),
        }
    }
}

/// Encoder for any supported format.
#[derive(Debug)]
pub enum Encoder<W: Write> {
    /// ISO 2709 binary
    Marc(MarcWriter<W>),
    /// Line-mode MARC
    LineMarc(LineMarcWriter<W>),
    /// MARCXML
    MarcXml(MarcxmlWriter<W>),
}

impl<W: Write> Encoder<W> {
    /// Create an encoder for `format`.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::FormatUnknown`] for [`Format::Unknown`].
    pub fn new(writer: W, format: Format) -> Result<Self> {
        let encoder = match format {
            Format::Marc => Encoder::Marc(MarcWriter::new(writer)),
            Format::LineMarc => Encoder::LineMarc(LineMarcWriter::new(writer)),
            Format::MarcXml => Encoder::MarcXml(MarcxmlWriter::new(writer)),
            Format::Unknown => return Err(MarcError::FormatUnknown),
        };
        log::debug!("encoding {format}");
        Ok(encoder)
    }

    /// Encode one record. A record that cannot be encoded writes nothing.
    ///
    /// # Errors
    ///
    /// Returns the error of the underlying codec.
    pub fn encode(&mut self, record: &Record) -> Result<()> {
        match self {
            Encoder::Marc(writer) => writer.write_record(record),
            Encoder::LineMarc(writer) => writer.write_record(record),
            Encoder::MarcXml(writer) => writer.write_record(record),
        }
    }

    /// Flush buffered output.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination cannot be flushed.
    pub fn flush(&mut self) -> Result<()> {
        match self {
            Encoder::Marc(writer) => writer.flush(),
            Encoder::LineMarc(writer) => writer.flush(),
            Encoder::MarcXml(writer) => writer.flush(),
        }
    }

    /// Format this encoder writes.
    #[must_use]
    pub fn format(&self) -> Format {
        match self {
            Encoder::Marc(_) => Format::Marc,
            Encoder::LineMarc(_) => Format::LineMarc,
            Encoder::MarcXml(_) => Format::MarcXml,
        }
    }

    /// Flush and return the underlying destination.
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush fails.
    pub fn into_inner(self) -> Result<W> {
        match self {
            Encoder::Marc(writer) => writer.into_inner(),
            Encoder::LineMarc(writer) => writer.into_inner(),
            Encoder::MarcXml(writer) => writer.into_inner(),
        }
    }
}

impl<W: Write + std::fmt::Debug> FormatWriter for Encoder<W> {
    fn write_record(&mut self, record: &Record) -> Result<()> {
        self.encode(record)
    }

    fn flush(&mut self) -> Result<()> {
        Encoder::flush(self)
    }

    fn records_written(&self) -> Option<usize> {
        match self {
            Encoder::Marc(writer) => Some(writer.records_written()),
            Encoder::LineMarc(writer) => Some(writer.records_written()),
            Encoder::MarcXml(writer) => Some(writer.records_written()),
        }
    }
}
