#![deny(unsafe_code)]

//! Control library for an OpenVPN daemon's management interface.
//!
//! A [`Connector`] owns the socket to the daemon, either dialing it (client
//! mode) or accepting its connections (server mode). [`Parser`] turns the
//! line protocol into [`EventRecord`]s, [`Management`] ties the two together
//! and [`Process`] supervises the daemon binary itself.

/// Automatic answers to authentication and hold requests.
pub mod actions;
/// Management command lines.
pub mod commands;
/// Socket ownership, command queueing and per-session I/O.
pub mod connector;
/// Decoded management events.
pub mod event;
/// Connector plus parser plus client registry.
pub mod management;
/// Line-protocol decoder.
pub mod parser;
/// Daemon process supervisor.
pub mod process;
/// Certificate environments keyed by common name.
pub mod registry;
mod shutdown;
/// `status 1` report decoding.
pub mod status;

pub use actions::{StandardActions, VpnActions};
pub use connector::{CommandOutcome, Connector, ConnectorError, Endpoint, Mode};
pub use event::{ClientSubtype, EventKind, EventRecord};
pub use management::{Management, ManagementError, ManagementOptions};
pub use parser::Parser;
pub use process::{ArgumentSource, Process, ProcessError, ProcessOptions, ProcessState};
pub use registry::ClientRegistry;
pub use status::{Client, StatusError, StatusReport, parse_status, parse_status_report};
