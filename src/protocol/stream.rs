//! Byte-stream packet extractor for serial-style links.
//!
//! A classic serial link delivers arbitrary chunks: half a packet, two
//! packets glued together, line noise in between.  The extractor
//! accumulates bytes and yields every valid long packet:
//!
//! 1. Drop everything before the next 0xAA header.
//! 2. Wait until 10 bytes are buffered.
//! 3. Valid packet → emit and consume 10 bytes.
//!    Invalid → consume the header byte only and resynchronise.
//!
//! The buffer is cleared on overflow.

use chrono::NaiveDateTime;
use heapless::Vec;
use log::warn;

use super::packet::{self, HEADER, LONG_LEN};
use super::Reading;

/// Accumulation capacity.
pub const CAPACITY: usize = 256;

/// Streaming long-packet extractor.
pub struct PacketExtractor {
    buf: Vec<u8, CAPACITY>,
}

impl Default for PacketExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketExtractor {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Feed a chunk received at `at`.  Returns every reading completed by it.
    pub fn feed(&mut self, data: &[u8], at: NaiveDateTime) -> std::vec::Vec<Reading> {
        if self.buf.extend_from_slice(data).is_err() {
            warn!(
                "stream: buffer overflow ({} + {} bytes), clearing",
                self.buf.len(),
                data.len()
            );
            self.buf.clear();
            let tail = &data[data.len().saturating_sub(CAPACITY)..];
            // Cannot fail: tail is at most CAPACITY bytes into an empty buffer.
            let _ = self.buf.extend_from_slice(tail);
        }

        let mut out = std::vec::Vec::new();
        loop {
            match self.buf.iter().position(|&b| b == HEADER) {
                Some(pos) => self.discard(pos),
                None => {
                    self.buf.clear();
                    break;
                }
            }

            if self.buf.len() < LONG_LEN {
                break;
            }

            match packet::decode_long(&self.buf[..LONG_LEN]) {
                Ok((voltage, sequence)) => {
                    out.push(Reading::new(
                        voltage,
                        at,
                        sequence,
                        self.buf[..LONG_LEN].to_vec(),
                    ));
                    self.discard(LONG_LEN);
                }
                Err(_) => self.discard(1),
            }
        }
        out
    }

    /// Bytes currently buffered.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Drop buffered bytes (e.g. after the link reconnects).
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    fn discard(&mut self, n: usize) {
        let n = n.min(self.buf.len());
        let len = self.buf.len();
        self.buf.copy_within(n..len, 0);
        self.buf.truncate(len - n);
    }
}
