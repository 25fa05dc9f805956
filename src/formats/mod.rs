//! Format identification and the reader/writer traits shared by every codec.
//!
//! # Supported Formats
//!
//! | Format | Reader | Writer | Description |
//! |--------|--------|--------|-------------|
//! | [`Format::Marc`] | [`MarcReader`](crate::MarcReader) | [`MarcWriter`](crate::MarcWriter) | ISO 2709 binary interchange format |
//! | [`Format::LineMarc`] | [`LineMarcReader`](crate::LineMarcReader) | [`LineMarcWriter`](crate::LineMarcWriter) | Line-mode text MARC (NORMARC) |
//! | [`Format::MarcXml`] | [`MarcxmlReader`](crate::MarcxmlReader) | [`MarcxmlWriter`](crate::MarcxmlWriter) | MARCXML / MarcXchange |
//!
//! # Detection
//!
//! ```
//! use marc_codec::formats::{detect, Format};
//!
//! assert_eq!(detect(b"  \n<collection>"), Format::MarcXml);
//! assert_eq!(detect(b"*001123"), Format::LineMarc);
//! assert_eq!(detect(b"00714cam  2200205 a 4500"), Format::Marc);
//! assert_eq!(detect(b"{}"), Format::Unknown);
//! ```

mod traits;

pub use traits::{FormatReader, FormatReaderExt, FormatWriter, RecordIterator};

use crate::error::{MarcError, Result};
use std::io::BufRead;
use std::str::FromStr;

/// Number of leading bytes [`detect`] needs to classify a stream.
pub const SNIFF_LEN: usize = 64;

/// Serialization formats a record can be decoded from or encoded to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Could not be classified
    Unknown,
    /// ISO 2709 binary MARC (`.mrc`, `.marc`)
    Marc,
    /// Line-mode MARC such as NORMARC
    LineMarc,
    /// MARCXML / MarcXchange (ISO 25577)
    MarcXml,
}

/// Classify a sample of input by its first non-whitespace byte.
///
/// `<` means MARCXML, `*` means Line-MARC and an ASCII digit (the start of the
/// leader's record length) means binary MARC. Empty or all-whitespace samples
/// are [`Format::Unknown`]. Only the first [`SNIFF_LEN`] bytes matter in
/// practice; the caller keeps control of stream positioning.
#[must_use]
pub fn detect(sample: &[u8]) -> Format {
    match sample.iter().find(|&&b| !is_whitespace(b)) {
        Some(b'<') => Format::MarcXml,
        Some(b'*') => Format::LineMarc,
        Some(b) if b.is_ascii_digit() => Format::Marc,
        _ => Format::Unknown,
    }
}

/// Classify a buffered stream, leaving its content in place.
///
/// The bytes inspected stay in the reader's buffer, so the same reader can be
/// handed straight to a [`Decoder`](crate::Decoder). A buffer fill holding
/// only whitespace is consumed and the reader refilled, so short reads from
/// pipes or sockets still reach the first significant byte.
///
/// # Errors
///
/// Returns [`MarcError::FormatUnknown`] if the prefix is not recognized or
/// the stream holds only whitespace, or an I/O error from filling the buffer.
pub fn detect_stream<R: BufRead>(reader: &mut R) -> Result<Format> {
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Err(MarcError::FormatUnknown);
        }
        if buf.iter().all(|&b| is_whitespace(b)) {
            let skipped = buf.len();
            reader.consume(skipped);
            continue;
        }
        let end = buf.len().min(SNIFF_LEN);
        return match detect(&buf[..end]) {
            Format::Unknown => Err(MarcError::FormatUnknown),
            format => Ok(format),
        };
    }
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b'\t' | b'\n' | b'\x0c' | b'\r' | b' ')
}

impl Format {
    /// Detect format from file extension.
    ///
    /// Returns `None` if the extension is not recognized.
    ///
    /// ```
    /// use marc_codec::formats::Format;
    ///
    /// assert_eq!(Format::from_extension("mrc"), Some(Format::Marc));
    /// assert_eq!(Format::from_extension("XML"), Some(Format::MarcXml));
    /// assert_eq!(Format::from_extension("unknown"), None);
    /// ```
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mrc" | "marc" | "iso2709" => Some(Self::Marc),
            "lmarc" | "line" | "txt" => Some(Self::LineMarc),
            "xml" => Some(Self::MarcXml),
            _ => None,
        }
    }

    /// Get the canonical file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Unknown => "",
            Self::Marc => "mrc",
            Self::LineMarc => "lmarc",
            Self::MarcXml => "xml",
        }
    }

    /// Get the human-readable name for this format.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown MARC format",
            Self::Marc => "Standard MARC (ISO2709)",
            Self::LineMarc => "Line-MARC",
            Self::MarcXml => "MarcXchange (ISO25577)",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Format {
    type Err = MarcError;

    /// Parse the short (`m`, `l`, `x`) or long (`marc`, `linemarc`, `marcxml`)
    /// format names used on command lines.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "m" | "marc" | "iso2709" => Ok(Self::Marc),
            "l" | "line" | "linemarc" | "line-marc" | "normarc" => Ok(Self::LineMarc),
            "x" | "xml" | "marcxml" | "marcxchange" => Ok(Self::MarcXml),
            _ => Err(MarcError::FormatUnknown),
        }
    }
}
