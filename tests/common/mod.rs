//! Common test helpers and utilities shared across test suite.

#![allow(dead_code)]

use marc_codec::{DataField, Decoder, Encoder, Format, Leader, Record};
use std::fs::File;

/// Path of a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> String {
    format!("{}/tests/data/{name}", env!("CARGO_MANIFEST_DIR"))
}

/// Decode every record of a fixture file in the given format.
pub fn read_fixture(name: &str, format: Format) -> Vec<Record> {
    let file = File::open(fixture_path(name)).expect("Could not open test file");
    Decoder::new(file, format)
        .expect("Known format")
        .decode_all()
        .expect("Fixture decodes")
}

/// The single record of the line-mode fixture.
pub fn deichman_record() -> Record {
    let mut records = read_fixture("deichman.lmarc", Format::LineMarc);
    assert_eq!(records.len(), 1);
    records.remove(0)
}

/// Encode records in `format` and return the bytes.
pub fn encode_all(records: &[Record], format: Format) -> Vec<u8> {
    let mut encoder = Encoder::new(Vec::new(), format).expect("Known format");
    for record in records {
        encoder.encode(record).expect("Record encodes");
    }
    encoder.into_inner().expect("Flush succeeds")
}

/// Decode all records from bytes in `format`.
pub fn decode_all(bytes: &[u8], format: Format) -> Vec<Record> {
    Decoder::new(bytes, format)
        .expect("Known format")
        .decode_all()
        .expect("Records decode")
}

/// Creates a simple test record with a basic leader.
pub fn create_test_record() -> Record {
    let mut record = Record::with_leader(Leader::from_partial("00000nam a2200000 a 4500"));
    record.add_control_field("001", "test-001").unwrap();
    record.add_control_field("008", "871001s1968    no            000 0 nob d").unwrap();
    record.add_data_field(
        DataField::new("245", '1', '0')
            .unwrap()
            .with_subfield('a', "Test title")
            .with_subfield('c', "Test author"),
    );
    record.add_data_field(
        DataField::new("650", ' ', '0')
            .unwrap()
            .with_subfield('a', "Hymns"),
    );
    record.add_data_field(
        DataField::new("650", ' ', '0')
            .unwrap()
            .with_subfield('a', "Devotional literature"),
    );
    record
}
