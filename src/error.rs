//! Error types for MARC decoding and encoding.
//!
//! This module provides the [`MarcError`] type shared by every codec and the
//! [`Result`] convenience type. Decode errors describe the single record that
//! failed; whether to skip it or abort the stream is left to the caller.

use thiserror::Error;

/// Error type for all MARC codec operations.
#[derive(Error, Debug)]
pub enum MarcError {
    /// The input could not be classified as MARC, Line-MARC or MARCXML.
    #[error("Unknown MARC format")]
    FormatUnknown,

    /// A binary record ended before its leader or terminator.
    #[error("Truncated record: {0}")]
    Truncated(String),

    /// The record length in the leader disagrees with the bytes read.
    #[error("Leader reports size {declared}; actual size is {actual}")]
    LengthMismatch {
        /// Length declared in leader positions 0-4
        declared: usize,
        /// Number of bytes actually read, terminator included
        actual: usize,
    },

    /// A leader or directory number contains a non-digit.
    #[error("{what} is not numeric: {found:?}")]
    NonNumericField {
        /// Which number was being parsed
        what: &'static str,
        /// The offending text
        found: String,
    },

    /// A directory entry points outside the record.
    #[error("Out of bounds: {0}")]
    OutOfBounds(String),

    /// The line-mode lexer or decoder rejected its input.
    #[error("{message} at line {line}, column {column}: {text:?}")]
    LexError {
        /// 1-based line number
        line: usize,
        /// 1-based column number
        column: usize,
        /// Offending text
        text: String,
        /// What went wrong
        message: String,
    },

    /// An encoded binary record would not fit the 5-digit length fields.
    #[error("Record size {size} exceeds the ISO 2709 limit of {limit}")]
    SizeOverflow {
        /// Computed size in bytes
        size: usize,
        /// Largest size the length field can express
        limit: usize,
    },

    /// Malformed MARCXML markup or missing required attributes.
    #[error("XML error: {0}")]
    XmlStructural(String),

    /// A tag, indicator, subfield code or value breaks a record invariant.
    #[error("Invalid field: {0}")]
    InvalidField(String),

    /// IO error from the underlying source/destination.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<quick_xml::Error> for MarcError {
    fn from(err: quick_xml::Error) -> Self {
        match err {
            quick_xml::Error::Io(io) => MarcError::Io(std::io::Error::new(io.kind(), io.to_string())),
            other => MarcError::XmlStructural(other.to_string()),
        }
    }
}

/// Convenience type alias for [`std::result::Result`] with [`MarcError`].
pub type Result<T> = std::result::Result<T, MarcError>;
