//! Fuzz target for the `status 1` report decoder.
//!
//! Run with: cargo +nightly fuzz run fuzz_parse_status

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = ovpnctl_core::parse_status_report(s);
    }
});
