#![deny(unsafe_code)]

//! Shared test utilities for the ovpnctl workspace.
//!
//! Provides reusable fixtures, config builders, fake management peers, and
//! tracing helpers so that individual crate tests stay concise and
//! consistent.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! ovpnctl-test-utils = { workspace = true }
//! ```

pub mod config;
pub mod fake_daemon;
pub mod fixtures;
pub mod tracing_setup;
