//! Reader and writer traits implemented by every codec.
//!
//! The traits give one streaming interface over the binary, line-mode and XML
//! serializations, so conversion code never needs to know which format it is
//! handling.
//!
//! # Example
//!
//! ```
//! use marc_codec::formats::{FormatReader, FormatWriter};
//!
//! fn convert<R: FormatReader, W: FormatWriter>(
//!     reader: &mut R,
//!     writer: &mut W,
//! ) -> marc_codec::Result<usize> {
//!     let mut count = 0;
//!     while let Some(record) = reader.read_record()? {
//!         writer.write_record(&record)?;
//!         count += 1;
//!     }
//!     writer.flush()?;
//!     Ok(count)
//! }
//! ```

use crate::error::Result;
use crate::record::Record;

/// Trait for readers that produce MARC records from a source.
///
/// Use [`read_record`](Self::read_record) to stream one record at a time, or
/// [`read_all`](Self::read_all) to collect everything.
///
/// Implementations return `Ok(None)` when the source is exhausted and keep
/// field and subfield order exactly as found in the source.
pub trait FormatReader: std::fmt::Debug {
    /// Read the next record from the source.
    ///
    /// Returns:
    /// - `Ok(Some(record))` if a record was read successfully
    /// - `Ok(None)` if the end of the source was reached
    /// - `Err(_)` if the record is malformed or I/O fails
    ///
    /// An error describes only the record being read; whether to keep reading
    /// is up to the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the source contains malformed data or I/O fails.
    fn read_record(&mut self) -> Result<Option<Record>>;

    /// Read all remaining records into a vector.
    ///
    /// Memory use grows with the whole collection. For large files, prefer
    /// streaming with [`read_record`](Self::read_record).
    ///
    /// # Errors
    ///
    /// Returns the first error encountered; records read before it are
    /// discarded.
    fn read_all(&mut self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        while let Some(record) = self.read_record()? {
            records.push(record);
        }
        Ok(records)
    }

    /// Returns the number of records read so far, if tracked.
    fn records_read(&self) -> Option<usize> {
        None
    }
}

/// Trait for writers that serialize MARC records to a format.
///
/// Writers buffer their output; call [`flush`](Self::flush) once done (or
/// whenever output must reach the destination). A failed
/// [`write_record`](Self::write_record) leaves previously written records and
/// the writer itself usable.
pub trait FormatWriter: std::fmt::Debug {
    /// Write a single record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be represented in the format or
    /// if writing to the underlying output fails.
    fn write_record(&mut self, record: &Record) -> Result<()>;

    /// Write multiple records, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns an error if any record cannot be written.
    fn write_batch(&mut self, records: &[Record]) -> Result<()> {
        for record in records {
            self.write_record(record)?;
        }
        Ok(())
    }

    /// Flush buffered output to the destination.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying output cannot be flushed.
    fn flush(&mut self) -> Result<()>;

    /// Returns the number of records written so far, if tracked.
    fn records_written(&self) -> Option<usize> {
        None
    }
}

/// Extension trait providing iterator-style access for format readers.
///
/// This trait is automatically implemented for all types implementing [`FormatReader`].
pub trait FormatReaderExt: FormatReader {
    /// Create an iterator over records from this reader.
    ///
    /// The iterator yields `Result<Record>` for each record and ends at the
    /// end of the source.
    fn records(&mut self) -> RecordIterator<'_, Self>
    where
        Self: Sized,
    {
        RecordIterator { reader: self }
    }
}

impl<T: FormatReader> FormatReaderExt for T {}

/// Iterator adapter for [`FormatReader`].
///
/// Created by the [`records`](FormatReaderExt::records) method.
#[derive(Debug)]
pub struct RecordIterator<'a, R: FormatReader> {
    reader: &'a mut R,
}

impl<R: FormatReader> Iterator for RecordIterator<'_, R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.read_record().transpose()
    }
}
