//! Fuzz target: `PacketDecoder::decode`
//!
//! Drives arbitrary payloads through every format from both sources and
//! asserts that accepted readings are consistent with the bytes they came
//! from.
//!
//! cargo fuzz run fuzz_packet_decoder

#![no_main]

use chrono::NaiveDateTime;
use libfuzzer_sys::fuzz_target;
use voltsentry::protocol::{PacketDecoder, PayloadSource, RawPolicy};

fuzz_target!(|data: &[u8]| {
    let at = NaiveDateTime::default();
    for policy in [RawPolicy::AnyMeasured, RawPolicy::DangerousOnly] {
        let decoder = PacketDecoder::new(policy);
        for source in [PayloadSource::Advertisement, PayloadSource::Session] {
            if let Ok(r) = decoder.decode(data, source, at) {
                assert_eq!(r.raw_bytes(), data);
                // Diagnostics only ever come from the long packet.
                if r.voltage().is_diagnostic() {
                    assert_eq!(data.len(), 10);
                }
                if r.sequence_number() != 0 {
                    assert_eq!(data.len(), 10);
                }
            }
        }
    }
});
