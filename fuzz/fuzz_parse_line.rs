//! Fuzz target for the management line parser.
//!
//! Run with: cargo +nightly fuzz run fuzz_parse_line
//!
//! Splits the input into lines and feeds them through one `Parser`, so
//! block accumulation and CLIENT merging see arbitrary interleavings.

#![no_main]

use libfuzzer_sys::fuzz_target;
use ovpnctl_core::Parser;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let mut parser = Parser::new();
    for line in text.lines() {
        if let Some(record) = parser.parse_line(line) {
            assert!(record.complete);
            let _ = record.event_name();
        }
    }
});
