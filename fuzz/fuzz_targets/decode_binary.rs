#![no_main]

use libfuzzer_sys::fuzz_target;
use marc_codec::writer::encode_record;
use marc_codec::{Decoder, Format};

// Any record the binary decoder accepts must encode again and decode to an
// equal record.
fuzz_target!(|data: &[u8]| {
    let Ok(mut decoder) = Decoder::new(data, Format::Marc) else {
        return;
    };
    for _ in 0..64 {
        match decoder.decode() {
            Ok(Some(record)) => {
                if let Ok(bytes) = encode_record(&record) {
                    let again = marc_codec::reader::parse_record(&bytes).expect("re-encoded record decodes");
                    assert!(again.equals_ignoring_leader(&record));
                }
            }
            Ok(None) => break,
            Err(_) => {}
        }
    }
});
