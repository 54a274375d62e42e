//! Fuzz target for the TOML configuration parser.
//!
//! Run with: cargo +nightly fuzz run fuzz_config_parser
//!
//! Feeds arbitrary text to `AppConfig::parse()` and, for configs that
//! validate, builds the daemon argument list from them.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(config) = ovpnctl_config::AppConfig::parse(s) {
            let args = config.process.build_args(&config.management).finalize();
            assert!(args.iter().any(|a| a == "--management-client"));
        }
    }
});
