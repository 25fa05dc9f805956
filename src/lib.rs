#![warn(missing_docs)]

//! # marc-codec: MARC format conversion
//!
//! Read and write MARC bibliographic records in three serializations:
//!
//! - **ISO 2709** binary MARC ([`MarcReader`], [`MarcWriter`])
//! - **Line-mode MARC** such as NORMARC ([`LineMarcReader`], [`LineMarcWriter`])
//! - **MARCXML** / MarcXchange ([`MarcxmlReader`], [`MarcxmlWriter`])
//!
//! All of them decode into the same [`Record`] type, so converting is a matter
//! of pairing a reader with a writer. [`formats::detect`] classifies input by
//! its first byte, and [`equality`] compares records regardless of field and
//! subfield order, which is how conversions are checked.
//!
//! ## Quick Start
//!
//! ### Detecting and decoding
//!
//! ```
//! use marc_codec::Decoder;
//!
//! # fn main() -> marc_codec::Result<()> {
//! let input = "*000     c\n*0010010463\n*100 0$aKarlén, Barbro$d1954-\n^\n";
//! let mut decoder = Decoder::detect(input.as_bytes())?;
//!
//! while let Some(record) = decoder.decode()? {
//!     let author = record.data_fields_by_tag("100").next().and_then(|f| f.subfield('a'));
//!     assert_eq!(author, Some("Karlén, Barbro"));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Building and encoding
//!
//! ```
//! use marc_codec::{DataField, Encoder, Format, Record};
//!
//! # fn main() -> marc_codec::Result<()> {
//! let mut record = Record::new();
//! record.add_control_field("001", "12345")?;
//! record.add_data_field(
//!     DataField::new("245", '1', '0')?
//!         .with_subfield('a', "Test Title")
//!         .with_subfield('c', "Author"),
//! );
//!
//! let mut encoder = Encoder::new(Vec::new(), Format::Marc)?;
//! encoder.encode(&record)?;
//! let bytes = encoder.into_inner()?;
//! assert_eq!(&bytes[..5], format!("{:05}", bytes.len()).as_bytes());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`record`]: Core MARC record structures (`Record`, `ControlField`, `DataField`, `Subfield`)
//! - [`leader`]: MARC record leader (24-byte header)
//! - [`reader`] / [`writer`]: ISO 2709 binary codec
//! - [`lexer`]: Tokenizer for line-mode MARC
//! - [`line_reader`] / [`line_writer`]: Line-mode codec
//! - [`marcxml`]: MARCXML codec
//! - [`formats`]: Format detection and the reader/writer traits
//! - [`codec`]: Format-independent `Decoder` and `Encoder`
//! - [`equality`]: Order-independent record comparison
//! - [`error`]: Error types and result type
//!
//! ## Logging
//!
//! The crate reports through the [`log`] facade and installs no logger:
//! `trace` per record decoded or encoded, `debug` for skipped empty
//! line-mode terminators, `warn` when the line-mode reader discards the rest
//! of a malformed record.

pub mod codec;
pub mod equality;
pub mod error;
pub mod formats;
pub mod leader;
pub mod lexer;
pub mod line_reader;
pub mod line_writer;
pub mod marcxml;
pub mod reader;
pub mod record;
pub mod writer;

pub use codec::{Decoder, Encoder};
pub use error::{MarcError, Result};
pub use formats::{detect, Format, FormatReader, FormatReaderExt, FormatWriter};
pub use leader::Leader;
pub use line_reader::LineMarcReader;
pub use line_writer::LineMarcWriter;
pub use marcxml::{MarcxmlReader, MarcxmlWriter};
pub use reader::MarcReader;
pub use record::{ControlField, DataField, Record, RecordBuilder, Subfield};
pub use writer::MarcWriter;
