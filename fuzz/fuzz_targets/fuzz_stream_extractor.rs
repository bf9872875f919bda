//! Fuzz target: `PacketExtractor::feed`
//!
//! Splits arbitrary bytes into chunks at a fuzzer-chosen stride and
//! checks the buffer never grows past its capacity.
//!
//! cargo fuzz run fuzz_stream_extractor

#![no_main]

use chrono::NaiveDateTime;
use libfuzzer_sys::fuzz_target;
use voltsentry::protocol::stream::{CAPACITY, PacketExtractor};

fuzz_target!(|data: &[u8]| {
    let Some((&stride, rest)) = data.split_first() else {
        return;
    };
    let stride = usize::from(stride).max(1);
    let at = NaiveDateTime::default();

    let mut x = PacketExtractor::new();
    for chunk in rest.chunks(stride) {
        for r in x.feed(chunk, at) {
            assert_eq!(r.raw_bytes().len(), 10);
        }
        assert!(x.pending() <= CAPACITY);
    }

    x.reset();
    assert_eq!(x.pending(), 0);
});
