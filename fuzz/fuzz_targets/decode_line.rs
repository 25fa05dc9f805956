#![no_main]

use libfuzzer_sys::fuzz_target;
use marc_codec::{Decoder, Format};

fuzz_target!(|data: &[u8]| {
    let Ok(mut decoder) = Decoder::new(data, Format::LineMarc) else {
        return;
    };
    // Errors resynchronize at the next record, so the stream always ends.
    for _ in 0..1024 {
        if let Ok(None) = decoder.decode() {
            break;
        }
    }
});
