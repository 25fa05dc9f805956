#![no_main]

use libfuzzer_sys::fuzz_target;
use marc_codec::{Decoder, Format};

fuzz_target!(|data: &[u8]| {
    let Ok(mut decoder) = Decoder::new(data, Format::MarcXml) else {
        return;
    };
    for _ in 0..64 {
        match decoder.decode() {
            Ok(Some(_)) => {}
            Ok(None) | Err(_) => break,
        }
    }
});
